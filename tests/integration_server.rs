//! End-to-end tests for the CloudShield HTTP service.
//!
//! Each test binds the real router on an ephemeral loopback port and talks to
//! it over HTTP with `reqwest`, so the request-id, CORS and body-limit layers
//! are part of every exchange.

use anyhow::{anyhow, Context, Result};
use cloudshield::{
    api::{self, AppConfig, AppState},
    vault::{CodeSender, HashParams, Identity, IdentityStore, LogCodeSender, SecondFactorMode},
};
use reqwest::{
    multipart::{Form, Part},
    Client, StatusCode,
};
use serde_json::{json, Value};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;

struct TestServer {
    addr: SocketAddr,
    client: Client,
}

impl TestServer {
    async fn start(config: AppConfig, sender: Arc<dyn CodeSender>) -> Result<Self> {
        // Minimum Argon2 cost keeps the suite fast.
        let params = HashParams::new(
            HashParams::MIN_M_COST,
            HashParams::MIN_T_COST,
            HashParams::MIN_P_COST,
            None,
        )
        .map_err(|err| anyhow!("invalid hash params: {err}"))?;
        let identities = IdentityStore::with_params(params)?;
        let state = AppState::new(config, identities, sender).await?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(api::serve(
            listener,
            Arc::new(state),
            std::future::pending(),
        ));

        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "-tests"))
            .build()?;

        Ok(Self { addr, client })
    }

    async fn placeholder() -> Result<Self> {
        Self::start(
            AppConfig::new("http://localhost:5173".to_string()),
            Arc::new(LogCodeSender),
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn register(&self, handle: &str, secret: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.url("/v1/identities"))
            .json(&json!({
                "handle": handle,
                "secret": secret,
                "confirm_secret": secret,
                "email": format!("{handle}@cloudshield.io"),
                "contact": "555-0101"
            }))
            .send()
            .await?;
        Ok(response)
    }

    async fn login(&self, handle: &str, secret: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.url("/v1/sessions"))
            .json(&json!({ "handle": handle, "secret": secret }))
            .send()
            .await?;
        Ok(response)
    }

    async fn confirm(&self, token: &str, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.url("/v1/sessions/second-factor"))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        Ok(response)
    }

    async fn list(&self, handle: &str, token: &str) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(self.url(&format!("/v1/identities/{handle}/files")))
            .bearer_auth(token)
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(response.json().await?)
    }
}

fn token_of(body: &Value) -> Result<String> {
    body["token"]
        .as_str()
        .map(str::to_string)
        .context("missing session token")
}

#[tokio::test]
async fn operator_lifecycle() -> Result<()> {
    let server = TestServer::placeholder().await?;

    let response = server.register("op1", "s3cret").await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await?;
    assert_eq!(body["identity"]["handle"], "op1");
    assert!(body["identity"].get("secret").is_none());

    let response = server.register("op1", "other").await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = server.login("op1", "wrong").await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server.login("op1", "s3cret").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["phase"], "pending_second_factor");
    assert_eq!(body["screen"], "second_factor");
    let token = token_of(&body)?;

    // No file access before the second factor.
    let response = server
        .client
        .get(server.url("/v1/identities/op1/files"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server.confirm(&token, &json!({})).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["phase"], "authenticated");
    assert_eq!(body["screen"], "dashboard");

    assert!(server.list("op1", &token).await?.is_empty());

    let form = Form::new()
        .part(
            "files",
            Part::bytes(b"quarterly numbers".to_vec())
                .file_name("report.txt")
                .mime_str("text/plain")?,
        )
        .part(
            "files",
            Part::bytes(vec![0u8; 2048])
                .file_name("scan.bin")
                .mime_str("application/octet-stream")?,
        );
    let response = server
        .client
        .post(server.url("/v1/identities/op1/files"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Vec<Value> = response.json().await?;
    assert_eq!(created.len(), 2);
    assert_eq!(created[0]["name"], "report.txt");
    assert_eq!(created[0]["size"], 17);
    assert_eq!(created[1]["size_label"], "2 KB");

    let listed = server.list("op1", &token).await?;
    assert_eq!(listed.len(), 2);
    let first = listed[0]["storage_id"]
        .as_str()
        .context("missing storage id")?
        .to_string();

    let response = server
        .client
        .delete(server.url(&format!("/v1/identities/op1/files/{first}")))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let listed = server.list("op1", &token).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["name"], "scan.bin");

    let response = server
        .client
        .delete(server.url("/v1/sessions"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = server
        .client
        .get(server.url("/v1/sessions"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn files_of_other_identities_are_not_found() -> Result<()> {
    let server = TestServer::placeholder().await?;
    server.register("op1", "s3cret").await?;
    server.register("op2", "hunter2").await?;

    let body: Value = server.login("op1", "s3cret").await?.json().await?;
    let token = token_of(&body)?;
    server.confirm(&token, &json!({})).await?;

    let response = server
        .client
        .get(server.url("/v1/identities/op2/files"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server
        .client
        .get(server.url("/v1/identities/nobody/files"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn health_and_request_id() -> Result<()> {
    let server = TestServer::placeholder().await?;
    let response = server.client.get(server.url("/health")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    let request_id = response
        .headers()
        .get("x-request-id")
        .context("missing x-request-id")?
        .to_str()?
        .to_string();
    assert_eq!(request_id.len(), 26);

    let body: Value = response.json().await?;
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    Ok(())
}

#[derive(Default)]
struct Outbox {
    codes: Mutex<Vec<(String, String)>>,
}

impl Outbox {
    fn last_for(&self, handle: &str) -> Option<String> {
        self.codes.lock().ok().and_then(|codes| {
            codes
                .iter()
                .rev()
                .find(|(to, _)| to == handle)
                .map(|(_, code)| code.clone())
        })
    }
}

impl CodeSender for Outbox {
    fn send(&self, identity: &Identity, code: &str) {
        if let Ok(mut codes) = self.codes.lock() {
            codes.push((identity.handle.clone(), code.to_string()));
        }
    }
}

#[tokio::test]
async fn one_time_code_second_factor() -> Result<()> {
    let outbox = Arc::new(Outbox::default());
    let config = AppConfig::new("http://localhost:5173".to_string())
        .with_second_factor(SecondFactorMode::OneTimeCode);
    let server = TestServer::start(config, outbox.clone()).await?;

    server.register("op1", "s3cret").await?;
    let body: Value = server.login("op1", "s3cret").await?.json().await?;
    assert_eq!(body["second_factor"], "code");
    let token = token_of(&body)?;
    let code = outbox.last_for("op1").context("no code delivered")?;

    let response = server.confirm(&token, &json!({})).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let wrong = if code == "000000" { "111111" } else { "000000" };
    let response = server.confirm(&token, &json!({ "code": wrong })).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server.confirm(&token, &json!({ "code": code })).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["phase"], "authenticated");
    Ok(())
}
