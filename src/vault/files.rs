//! Per-identity file registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use ulid::Ulid;
use utoipa::ToSchema;

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// A stored file as listed on the dashboard.
#[derive(ToSchema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Display name as uploaded.
    pub name: String,
    pub media_type: String,
    pub size: u64,
    /// Name the encrypted payload would be stored under.
    pub storage_id: String,
}

/// Raw upload metadata before a storage identifier is assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDescriptor {
    pub name: String,
    pub media_type: String,
    pub size: u64,
}

impl FileDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size,
        }
    }

    fn into_record(self) -> FileRecord {
        FileRecord {
            name: self.name,
            media_type: self.media_type,
            size: self.size,
            storage_id: new_storage_id(),
        }
    }
}

#[derive(Default)]
pub struct FileRegistry {
    files: RwLock<HashMap<String, Vec<FileRecord>>>,
}

impl FileRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Files of `handle` in insertion order, empty if none were ever uploaded.
    pub async fn list_for(&self, handle: &str) -> Vec<FileRecord> {
        self.files
            .read()
            .await
            .get(handle)
            .cloned()
            .unwrap_or_default()
    }

    /// Append one record per descriptor, keeping the submitted order.
    #[instrument(skip(self, descriptors), fields(count = descriptors.len()))]
    pub async fn append(&self, handle: &str, descriptors: Vec<FileDescriptor>) -> Vec<FileRecord> {
        let records: Vec<FileRecord> = descriptors
            .into_iter()
            .map(FileDescriptor::into_record)
            .collect();

        self.files
            .write()
            .await
            .entry(handle.to_string())
            .or_default()
            .extend(records.iter().cloned());

        debug!("files appended");

        records
    }

    /// Remove the record with `storage_id` from the list of `handle` only.
    ///
    /// Returns `None`, leaving every list untouched, when no such record exists.
    #[instrument(skip(self))]
    pub async fn remove(&self, handle: &str, storage_id: &str) -> Option<FileRecord> {
        let mut files = self.files.write().await;
        let list = files.get_mut(handle)?;
        let index = list.iter().position(|f| f.storage_id == storage_id)?;

        debug!("file removed");

        Some(list.remove(index))
    }

    /// Number of files held for `handle`.
    pub async fn count_for(&self, handle: &str) -> usize {
        self.files.read().await.get(handle).map_or(0, Vec::len)
    }
}

// 80 random bits per id: same-name uploads within one millisecond stay distinct.
fn new_storage_id() -> String {
    Ulid::new().to_string().to_lowercase()
}

/// Render a byte count for humans: `0 Bytes`, `2 KB`, `1.5 MB`.
///
/// Trailing zeros of the fraction are dropped.
#[must_use]
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let mut number = format!("{value:.decimals$}");
    if number.contains('.') {
        number = number.trim_end_matches('0').trim_end_matches('.').to_string();
    }

    format!("{number} {}", SIZE_UNITS[unit])
}
