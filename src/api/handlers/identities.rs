use super::{
    error_response, rejection_response,
    state::AppState,
    types::{ErrorResponse, RegisterRequest, RegisterResponse},
};
use crate::vault::{NewIdentity, View};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, instrument};

#[utoipa::path(
    post,
    path = "/v1/identities",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Identity registered", body = RegisterResponse),
        (status = 400, description = "Invalid input or secrets do not match", body = ErrorResponse),
        (status = 409, description = "Handle already registered", body = ErrorResponse),
    ),
    tag = "identities"
)]
#[instrument(skip(state, payload))]
pub async fn register(
    state: Extension<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(&rejection),
    };

    let candidate = NewIdentity {
        handle: request.handle,
        secret: SecretString::from(request.secret),
        email: request.email.trim().to_string(),
        contact: request.contact,
    };
    let confirm = request.confirm_secret.map(SecretString::from);

    // Registration never authenticates; a throwaway controller only drives the signup view.
    let mut session = state.new_session();
    session.navigate(View::Signup);

    match session.register_identity(candidate, confirm.as_ref()).await {
        Ok(identity) => {
            info!(handle = %identity.handle, "identity registered");
            let response = RegisterResponse {
                identity,
                screen: session.screen(),
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(err) => error_response(&err),
    }
}
