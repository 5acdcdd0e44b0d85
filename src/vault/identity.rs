//! In-memory identity registry keyed by handle.
//!
//! Secrets never stay in the clear: the store keeps an Argon2 PHC string per
//! identity and hands out [`Identity`] values, which carry no secret at all.

use super::error::{Result, VaultError};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};
use ulid::Ulid;
use utoipa::ToSchema;

/// Self-declared classification shown on the dashboard.
#[derive(ToSchema, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Male,
    Female,
    Other,
    #[default]
    Unspecified,
}

/// A registered operator as seen by everything outside the store.
#[derive(ToSchema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub handle: String,
    pub email: String,
    pub contact: String,
    pub classification: Classification,
}

/// Signup candidate. The secret is only held until it is hashed.
#[derive(Clone, Debug)]
pub struct NewIdentity {
    pub handle: String,
    pub secret: SecretString,
    pub email: String,
    pub contact: String,
}

impl NewIdentity {
    /// Reject candidates that could never log in or be contacted.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidInput`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.handle.trim().is_empty() {
            return Err(VaultError::invalid("handle", "must not be empty"));
        }
        if self.handle.trim() != self.handle {
            return Err(VaultError::invalid(
                "handle",
                "must not start or end with whitespace",
            ));
        }
        if self.secret.expose_secret().is_empty() {
            return Err(VaultError::invalid("secret", "must not be empty"));
        }
        if !valid_email(&self.email) {
            return Err(VaultError::invalid("email", "malformed address"));
        }
        Ok(())
    }
}

static EMAIL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Lightweight email sanity check.
pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email))
}

struct StoredIdentity {
    identity: Identity,
    secret_hash: String,
}

pub struct IdentityStore {
    identities: RwLock<HashMap<String, StoredIdentity>>,
    hasher: Argon2<'static>,
    // Verified against when the handle is unknown so both failure paths cost the same.
    decoy_hash: String,
}

impl IdentityStore {
    /// Build an empty store with the default Argon2id cost.
    ///
    /// # Errors
    /// Returns an error if the decoy hash cannot be computed.
    pub fn new() -> Result<Self> {
        Self::with_params(Params::default())
    }

    /// Build an empty store hashing secrets with the given Argon2id cost.
    ///
    /// # Errors
    /// Returns an error if the decoy hash cannot be computed.
    pub fn with_params(params: Params) -> Result<Self> {
        let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let decoy_hash = hash_secret(&hasher, Ulid::new().to_string().as_bytes())?;

        Ok(Self {
            identities: RwLock::new(HashMap::new()),
            hasher,
            decoy_hash,
        })
    }

    /// Register a new identity.
    ///
    /// The duplicate check and the insert run under one write lock, so two
    /// concurrent signups for the same handle cannot both succeed.
    ///
    /// # Errors
    /// Returns [`VaultError::DuplicateHandle`] if the handle is taken (exact,
    /// case-sensitive match).
    #[instrument(skip(self, candidate), fields(handle = %candidate.handle))]
    pub async fn create(&self, candidate: NewIdentity) -> Result<Identity> {
        let NewIdentity {
            handle,
            secret,
            email,
            contact,
        } = candidate;

        let hasher = self.hasher.clone();
        let secret_hash =
            run_blocking(move || hash_secret(&hasher, secret.expose_secret().as_bytes())).await?;

        let mut identities = self.identities.write().await;
        if identities.contains_key(&handle) {
            debug!("handle already registered");
            return Err(VaultError::DuplicateHandle);
        }

        let identity = Identity {
            handle: handle.clone(),
            email,
            contact,
            classification: Classification::default(),
        };
        identities.insert(
            handle,
            StoredIdentity {
                identity: identity.clone(),
                secret_hash,
            },
        );

        debug!("identity registered");

        Ok(identity)
    }

    /// Check a handle and secret pair.
    ///
    /// # Errors
    /// Returns [`VaultError::AuthenticationFailed`] when the handle is unknown or
    /// the secret does not match; the caller cannot tell the two apart.
    #[instrument(skip(self, secret))]
    pub async fn verify(&self, handle: &str, secret: &SecretString) -> Result<Identity> {
        // Release the read guard before hashing.
        let (identity, hash) = {
            let identities = self.identities.read().await;
            match identities.get(handle) {
                Some(stored) => (Some(stored.identity.clone()), stored.secret_hash.clone()),
                None => (None, self.decoy_hash.clone()),
            }
        };

        let hasher = self.hasher.clone();
        let secret = SecretString::from(secret.expose_secret().to_owned());
        let matched = run_blocking(move || {
            Ok(verify_secret(
                &hasher,
                &hash,
                secret.expose_secret().as_bytes(),
            ))
        })
        .await?;

        match identity {
            Some(identity) if matched => Ok(identity),
            _ => {
                debug!("credential check failed");
                Err(VaultError::AuthenticationFailed)
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn get(&self, handle: &str) -> Option<Identity> {
        self.identities
            .read()
            .await
            .get(handle)
            .map(|stored| stored.identity.clone())
    }

    pub async fn contains(&self, handle: &str) -> bool {
        self.identities.read().await.contains_key(handle)
    }

    pub async fn len(&self) -> usize {
        self.identities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.identities.read().await.is_empty()
    }
}

// Argon2 is CPU bound; keep it off the async workers.
async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|e| {
        error!("Credential task failed: {e}");
        VaultError::Credential
    })?
}

fn hash_secret(hasher: &Argon2<'static>, secret: &[u8]) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    hasher
        .hash_password(secret, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash secret: {e}");
            VaultError::Credential
        })
}

fn verify_secret(hasher: &Argon2<'static>, hash: &str, secret: &[u8]) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| hasher.verify_password(secret, &parsed).is_ok())
}
