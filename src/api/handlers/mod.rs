//! API handlers and shared utilities for CloudShield.
//!
//! Route handlers live in one module per resource. Shared state, the session
//! token registry and principal extraction sit next to them.

pub mod files;
pub mod health;
pub mod identities;
pub mod root;
pub mod sessions;
pub mod types;

pub(crate) mod principal;
pub(crate) mod session_store;
pub(crate) mod state;

#[cfg(test)]
pub(crate) mod test_support;

use crate::vault::VaultError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{debug, error};
use types::ErrorResponse;

pub(crate) const fn status_for(err: &VaultError) -> StatusCode {
    match err {
        VaultError::DuplicateHandle | VaultError::InvalidTransition { .. } => StatusCode::CONFLICT,
        VaultError::AuthenticationFailed | VaultError::SecondFactorRejected => {
            StatusCode::UNAUTHORIZED
        }
        VaultError::SecondFactorExhausted => StatusCode::TOO_MANY_REQUESTS,
        VaultError::SecretMismatch | VaultError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        VaultError::Credential => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a core error to its status and user-facing message.
pub(crate) fn error_response(err: &VaultError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        error!("vault error: {err}");
    } else {
        debug!("vault error: {err}");
    }
    (status, Json(ErrorResponse::new(err.to_string()))).into_response()
}

pub(crate) fn rejection_response(rejection: &JsonRejection) -> Response {
    debug!("rejected payload: {rejection}");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(rejection.body_text())),
    )
        .into_response()
}
