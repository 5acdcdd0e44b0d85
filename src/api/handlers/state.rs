//! Shared server state and configuration.

use super::session_store::SessionStore;
use crate::vault::{
    self, second_factor, CodeSender, FileRegistry, IdentityStore, SecondFactor,
    SecondFactorMode, SessionController,
};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tracing::info;

const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:5173";
const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    frontend_base_url: String,
    session_ttl_seconds: u64,
    second_factor: SecondFactorMode,
    max_upload_bytes: usize,
    seed_demo: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTEND_BASE_URL.to_string())
    }
}

impl AppConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            second_factor: SecondFactorMode::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            seed_demo: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_second_factor(mut self, mode: SecondFactorMode) -> Self {
        self.second_factor = mode;
        self
    }

    #[must_use]
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_seed_demo(mut self, seed: bool) -> Self {
        self.seed_demo = seed;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn second_factor(&self) -> SecondFactorMode {
        self.second_factor
    }

    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    #[must_use]
    pub fn seed_demo(&self) -> bool {
        self.seed_demo
    }

    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

pub struct AppState {
    config: AppConfig,
    identities: Arc<IdentityStore>,
    files: Arc<FileRegistry>,
    second_factor: Arc<dyn SecondFactor>,
    sessions: SessionStore,
}

impl AppState {
    /// Assemble the server state, seeding the demo operator when configured.
    ///
    /// # Errors
    /// Returns an error if seeding the demo operator fails.
    pub async fn new(
        config: AppConfig,
        identities: IdentityStore,
        code_sender: Arc<dyn CodeSender>,
    ) -> Result<Self> {
        let identities = Arc::new(identities);
        let files = Arc::new(FileRegistry::new());

        if config.seed_demo() {
            vault::seed_demo(&identities, &files)
                .await
                .context("Failed to seed demo operator")?;
        }

        let second_factor = second_factor::for_mode(config.second_factor(), code_sender);
        let sessions = SessionStore::new(Duration::from_secs(config.session_ttl_seconds()));

        info!("Second factor mode: {}", second_factor.mode());

        Ok(Self {
            config,
            identities,
            files,
            second_factor,
            sessions,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn identities(&self) -> &IdentityStore {
        &self.identities
    }

    #[must_use]
    pub fn files(&self) -> &FileRegistry {
        &self.files
    }

    pub(crate) fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub(crate) fn second_factor_mode(&self) -> SecondFactorMode {
        self.second_factor.mode()
    }

    /// A fresh controller bound to this server's stores.
    pub(crate) fn new_session(&self) -> SessionController {
        SessionController::new(self.identities.clone(), self.second_factor.clone())
    }
}
