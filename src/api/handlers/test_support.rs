//! Router fixtures shared by the handler tests.

use super::state::{AppConfig, AppState};
use crate::vault::{test_hash_params, CodeSender, IdentityStore, LogCodeSender};
use anyhow::{ensure, Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub(crate) const MULTIPART_BOUNDARY: &str = "cloudshield-test-boundary";

pub(crate) struct TestApp {
    pub(crate) state: Arc<AppState>,
    router: Router,
}

impl TestApp {
    pub(crate) async fn new() -> Result<Self> {
        Self::with_config(AppConfig::default()).await
    }

    pub(crate) async fn with_config(config: AppConfig) -> Result<Self> {
        Self::build(config, Arc::new(LogCodeSender)).await
    }

    pub(crate) async fn build(config: AppConfig, sender: Arc<dyn CodeSender>) -> Result<Self> {
        let identities = IdentityStore::with_params(test_hash_params())?;
        let state = Arc::new(AppState::new(config, identities, sender).await?);
        let router = crate::api::app(state.clone())?;
        Ok(Self { state, router })
    }

    pub(crate) fn router(&self) -> Router {
        self.router.clone()
    }

    pub(crate) async fn register(&self, handle: &str, secret: &str) -> Result<()> {
        let response = self
            .router()
            .oneshot(json_request(
                "POST",
                "/v1/identities",
                None,
                &json!({
                    "handle": handle,
                    "secret": secret,
                    "email": format!("{handle}@cloudshield.io"),
                    "contact": "555"
                }),
            )?)
            .await?;
        ensure!(
            response.status() == StatusCode::CREATED,
            "register returned {}",
            response.status()
        );
        Ok(())
    }

    /// Log in and return the session token; the session is left pending.
    pub(crate) async fn login(&self, handle: &str, secret: &str) -> Result<String> {
        let response = self
            .router()
            .oneshot(json_request(
                "POST",
                "/v1/sessions",
                None,
                &json!({"handle": handle, "secret": secret}),
            )?)
            .await?;
        ensure!(
            response.status() == StatusCode::OK,
            "login returned {}",
            response.status()
        );
        let body = body_json(response).await?;
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("login response without token")
    }

    /// Register, log in and confirm the placeholder second factor.
    pub(crate) async fn authenticate(&self, handle: &str, secret: &str) -> Result<String> {
        self.register(handle, secret).await?;
        let token = self.login(handle, secret).await?;
        let response = self
            .router()
            .oneshot(json_request(
                "POST",
                "/v1/sessions/second-factor",
                Some(&token),
                &json!({}),
            )?)
            .await?;
        ensure!(
            response.status() == StatusCode::OK,
            "second factor returned {}",
            response.status()
        );
        Ok(token)
    }
}

pub(crate) fn request(method: &str, uri: &str, token: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    Ok(builder.body(Body::empty())?)
}

pub(crate) fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: &Value,
) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    Ok(builder.body(Body::from(body.to_string()))?)
}

/// Multipart body with one `files` part per `(name, media type, content)`.
pub(crate) fn multipart_request(
    uri: &str,
    token: Option<&str>,
    files: &[(&str, &str, &[u8])],
) -> Result<Request<Body>> {
    let mut body = Vec::new();
    for (name, media_type, content) in files {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: {media_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder().method("POST").uri(uri).header(
        CONTENT_TYPE,
        format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
    );
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    Ok(builder.body(Body::from(body))?)
}

pub(crate) async fn body_json(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
