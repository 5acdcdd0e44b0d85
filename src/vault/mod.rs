//! Vault core: identity store, per-identity file registry and the session
//! controller that ties them together.

pub mod error;
pub mod files;
pub mod identity;
pub mod second_factor;
pub mod session;

pub use argon2::Params as HashParams;
pub use error::{Result, VaultError};
pub use files::{format_bytes, FileDescriptor, FileRecord, FileRegistry};
pub use identity::{Classification, Identity, IdentityStore, NewIdentity};
pub use second_factor::{
    CodeSender, LogCodeSender, OneTimeCode, PlaceholderSecondFactor, SecondFactor,
    SecondFactorMode, MAX_CODE_ATTEMPTS,
};
pub use session::{Phase, Screen, SessionController, View};

use secrecy::SecretString;
use tracing::info;

pub const DEMO_HANDLE: &str = "cyber_ninja";
pub const DEMO_SECRET: &str = "password123";
pub const DEMO_EMAIL: &str = "ninja@cloudshield.io";
pub const DEMO_CONTACT: &str = "555-0100";

/// Register the demo operator with its two sample files.
///
/// # Errors
/// Returns [`VaultError::DuplicateHandle`] if the demo operator already exists.
pub async fn seed_demo(identities: &IdentityStore, files: &FileRegistry) -> Result<Identity> {
    let identity = identities
        .create(NewIdentity {
            handle: DEMO_HANDLE.to_string(),
            secret: SecretString::from(DEMO_SECRET.to_string()),
            email: DEMO_EMAIL.to_string(),
            contact: DEMO_CONTACT.to_string(),
        })
        .await?;

    files
        .append(
            DEMO_HANDLE,
            vec![
                FileDescriptor::new("project_alpha.zip", "application/zip", 1024 * 128),
                FileDescriptor::new("secure_notes.txt", "text/plain", 1024 * 2),
            ],
        )
        .await;

    info!("Seeded demo operator {}", DEMO_HANDLE);

    Ok(identity)
}

/// Cheapest Argon2 cost accepted by the hasher, for tests only.
#[cfg(test)]
pub(crate) fn test_hash_params() -> HashParams {
    HashParams::new(
        HashParams::MIN_M_COST,
        HashParams::MIN_T_COST,
        HashParams::MIN_P_COST,
        None,
    )
    .unwrap_or_default()
}
