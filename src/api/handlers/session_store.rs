//! Bearer-token registry for live session controllers.
//!
//! Raw tokens are only handed to the client; the map is keyed by their SHA-256.

use crate::vault::SessionController;
use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

pub(crate) struct SessionEntry {
    controller: Mutex<SessionController>,
    created_at: Instant,
}

impl SessionEntry {
    pub(crate) fn controller(&self) -> &Mutex<SessionController> {
        &self.controller
    }
}

pub(crate) struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<Vec<u8>, Arc<SessionEntry>>>,
}

impl SessionStore {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register `controller` and return the raw token that resolves to it.
    pub(crate) async fn insert(&self, controller: SessionController) -> Result<String> {
        let token = generate_session_token()?;
        let entry = Arc::new(SessionEntry {
            controller: Mutex::new(controller),
            created_at: Instant::now(),
        });

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        sessions.insert(hash_session_token(&token), entry);

        debug!("session registered, {} live", sessions.len());

        Ok(token)
    }

    /// Resolve a raw token; expired sessions resolve to `None`.
    pub(crate) async fn get(&self, token: &str) -> Option<Arc<SessionEntry>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&hash_session_token(token))
            .filter(|entry| entry.created_at.elapsed() < self.ttl)
            .cloned()
    }

    pub(crate) async fn remove(&self, token: &str) -> Option<Arc<SessionEntry>> {
        self.sessions
            .write()
            .await
            .remove(&hash_session_token(token))
    }

    pub(crate) async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// 32 random bytes, base64url without padding.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
