use axum::response::IntoResponse;

pub async fn root() -> impl IntoResponse {
    format!(
        "{} {}: secure file vault\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{request, TestApp};
    use anyhow::Result;
    use axum::{body::to_bytes, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn root_greets() -> Result<()> {
        let test = TestApp::new().await?;
        let response = test.router().oneshot(request("GET", "/", None)?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let text = String::from_utf8(bytes.to_vec())?;
        assert!(text.starts_with(env!("CARGO_PKG_NAME")));
        Ok(())
    }
}
