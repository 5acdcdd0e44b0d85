//! Session endpoints: login, second-factor confirmation, lookup and logout.
//!
//! A session is created by a successful credential check and starts in the
//! pending second-factor phase. The raw token goes back in the body and in an
//! `HttpOnly` cookie; only its hash is kept server side.

use super::{
    error_response,
    principal::{extract_session_token, lookup_session, SESSION_COOKIE_NAME},
    rejection_response,
    state::{AppConfig, AppState},
    types::{ErrorResponse, LoginRequest, SecondFactorRequest, SessionResponse},
};
use crate::vault::{SessionController, View};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{
        header::{InvalidHeaderValue, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json, Response},
};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, error, instrument};

#[utoipa::path(
    post,
    path = "/v1/sessions",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, second factor pending", body = SessionResponse),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Authentication failed", body = ErrorResponse),
    ),
    tag = "sessions"
)]
#[instrument(skip(state, payload))]
pub async fn login(
    state: Extension<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(&rejection),
    };

    let mut session = state.new_session();
    session.navigate(View::Login);
    let secret = SecretString::from(request.secret);
    if let Err(err) = session.begin_login(&request.handle, &secret).await {
        return error_response(&err);
    }

    let view = session_view(&session, &state);
    let token = match state.sessions().insert(session).await {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to register session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut headers = HeaderMap::new();
    match session_cookie(state.config(), &token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let response = SessionResponse {
        token: Some(token),
        ..view
    };
    (StatusCode::OK, headers, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/sessions/second-factor",
    request_body = SecondFactorRequest,
    responses(
        (status = 200, description = "Second factor accepted", body = SessionResponse),
        (status = 401, description = "No session or code rejected", body = ErrorResponse),
        (status = 409, description = "No second factor pending", body = ErrorResponse),
        (status = 429, description = "Too many wrong codes, session reset", body = ErrorResponse),
    ),
    tag = "sessions"
)]
#[instrument(skip(headers, state, payload))]
pub async fn confirm_second_factor(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<SecondFactorRequest>>,
) -> Response {
    let Some((_, entry)) = lookup_session(&headers, &state).await else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    let mut session = entry.controller().lock().await;
    match session.confirm_second_factor(request.code.as_deref()) {
        Ok(()) => (StatusCode::OK, Json(session_view(&session, &state))).into_response(),
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    get,
    path = "/v1/sessions",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "sessions"
)]
pub async fn current(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    // Unknown or expired tokens read as "no session".
    let Some((_, entry)) = lookup_session(&headers, &state).await else {
        return StatusCode::NO_CONTENT.into_response();
    };
    let session = entry.controller().lock().await;
    (StatusCode::OK, Json(session_view(&session, &state))).into_response()
}

#[utoipa::path(
    delete,
    path = "/v1/sessions",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "sessions"
)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    if let Some(token) = extract_session_token(&headers) {
        if let Some(entry) = state.sessions().remove(&token).await {
            entry.controller().lock().await.end_session();
        } else {
            debug!("logout without a live session");
        }
    }

    // The cookie is cleared even when no session was found.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

fn session_view(session: &SessionController, state: &AppState) -> SessionResponse {
    SessionResponse {
        token: None,
        phase: session.phase(),
        screen: session.screen(),
        identity: session.identity().cloned(),
        second_factor: state.second_factor_mode(),
    }
}

/// `HttpOnly` cookie carrying the session token, `Secure` behind https.
fn session_cookie(
    config: &AppConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AppConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}
