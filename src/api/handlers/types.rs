//! Request/response types for the vault endpoints.

use crate::vault::{format_bytes, FileRecord, Identity, Phase, Screen, SecondFactorMode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Secret-bearing requests do not derive Debug.
#[derive(ToSchema, Deserialize)]
pub struct RegisterRequest {
    pub handle: String,
    pub secret: String,
    /// When present it must equal `secret`.
    #[serde(default)]
    pub confirm_secret: Option<String>,
    pub email: String,
    #[serde(default)]
    pub contact: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    pub identity: Identity,
    pub screen: Screen,
}

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    pub handle: String,
    pub secret: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct SecondFactorRequest {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    /// Only returned when the session is created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub phase: Phase,
    pub screen: Screen,
    pub identity: Option<Identity>,
    pub second_factor: SecondFactorMode,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub media_type: String,
    pub size: u64,
    /// Human readable size, e.g. `128 KB`.
    pub size_label: String,
    pub storage_id: String,
}

impl From<FileRecord> for FileEntry {
    fn from(record: FileRecord) -> Self {
        Self {
            size_label: format_bytes(record.size, 2),
            name: record.name,
            media_type: record.media_type,
            size: record.size,
            storage_id: record.storage_id,
        }
    }
}

/// Multipart upload form: every `files` part becomes one record.
#[derive(ToSchema)]
pub struct UploadForm {
    /// Binary file parts; the part's filename and content type are recorded.
    pub files: Vec<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use serde_json::json;

    #[test]
    fn register_request_optional_fields_default() -> Result<()> {
        let request: RegisterRequest = serde_json::from_value(json!({
            "handle": "op1",
            "secret": "s3cret",
            "email": "a@b.com"
        }))?;
        assert!(request.confirm_secret.is_none());
        assert!(request.contact.is_empty());
        Ok(())
    }

    #[test]
    fn second_factor_request_accepts_empty_body() -> Result<()> {
        let request: SecondFactorRequest = serde_json::from_value(json!({}))?;
        assert!(request.code.is_none());
        Ok(())
    }

    #[test]
    fn file_entry_carries_size_label() {
        let entry = FileEntry::from(FileRecord {
            name: "project_alpha.zip".to_string(),
            media_type: "application/zip".to_string(),
            size: 1024 * 128,
            storage_id: "01j0000000000000000000000".to_string(),
        });
        assert_eq!(entry.size_label, "128 KB");
        assert_eq!(entry.size, 131_072);
    }

    #[test]
    fn session_response_omits_missing_token() -> Result<()> {
        let response = SessionResponse {
            token: None,
            phase: Phase::PendingSecondFactor,
            screen: Screen::SecondFactor,
            identity: None,
            second_factor: SecondFactorMode::OneTimeCode,
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("token").is_none());
        let phase = value
            .get("phase")
            .and_then(serde_json::Value::as_str)
            .context("missing phase")?;
        assert_eq!(phase, "pending_second_factor");
        assert_eq!(
            value.get("second_factor").and_then(serde_json::Value::as_str),
            Some("code")
        );
        Ok(())
    }
}
