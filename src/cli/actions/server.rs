use crate::{
    api::{self, AppConfig, AppState},
    vault::{IdentityStore, LogCodeSender, SecondFactorMode},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub frontend_base_url: String,
    pub session_ttl_seconds: u64,
    pub second_factor: SecondFactorMode,
    pub max_upload_bytes: usize,
    pub seed_demo: bool,
}

impl Args {
    fn app_config(&self) -> AppConfig {
        AppConfig::new(self.frontend_base_url.clone())
            .with_session_ttl_seconds(self.session_ttl_seconds)
            .with_second_factor(self.second_factor)
            .with_max_upload_bytes(self.max_upload_bytes)
            .with_seed_demo(self.seed_demo)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the state cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let identities = IdentityStore::new().context("Failed to initialize identity store")?;
    let state = AppState::new(args.app_config(), identities, Arc::new(LogCodeSender)).await?;

    api::new(args.port, state).await
}
