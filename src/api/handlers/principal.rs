//! Session token extraction and the authorization checks used by file routes.

use super::{session_store::SessionEntry, state::AppState};
use crate::vault::Identity;
use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap, StatusCode,
};
use std::sync::Arc;
use tracing::debug;

pub(crate) const SESSION_COOKIE_NAME: &str = "cloudshield_session";

/// Resolve the caller's session, if the request carries a live token.
pub(crate) async fn lookup_session(
    headers: &HeaderMap,
    state: &AppState,
) -> Option<(String, Arc<SessionEntry>)> {
    let token = extract_session_token(headers)?;
    let entry = state.sessions().get(&token).await?;
    Some((token, entry))
}

/// Resolve the caller into a fully authenticated identity, or return 401.
pub(crate) async fn require_authenticated(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Identity, StatusCode> {
    let Some((_, entry)) = lookup_session(headers, state).await else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let controller = entry.controller().lock().await;
    controller
        .authenticated_identity()
        .cloned()
        .ok_or(StatusCode::UNAUTHORIZED)
}

/// Like [`require_authenticated`], but the identity must also own `handle`.
///
/// A mismatch returns 404 so other handles cannot be probed.
pub(crate) async fn require_owner(
    headers: &HeaderMap,
    state: &AppState,
    handle: &str,
) -> Result<Identity, StatusCode> {
    let identity = require_authenticated(headers, state).await?;
    if identity.handle == handle {
        Ok(identity)
    } else {
        debug!(caller = %identity.handle, handle, "file access for another handle");
        Err(StatusCode::NOT_FOUND)
    }
}

/// Bearer token first, then the session cookie.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
            .then(|| val.trim().to_string())
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
