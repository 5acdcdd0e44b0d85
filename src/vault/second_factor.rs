//! Second-factor challenges issued after a successful credential check.
//!
//! Two verifiers exist:
//!
//! - [`PlaceholderSecondFactor`] accepts any code. It is a **no-op placeholder**
//!   kept for demo parity and provides no security at all; every confirmation
//!   is logged as a warning.
//! - [`OneTimeCode`] issues a random six digit code per login, hands it to a
//!   [`CodeSender`] and only accepts that code until it expires.

use super::{
    error::{Result, VaultError},
    identity::Identity,
};
use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fmt,
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

pub const DEFAULT_CODE_TTL_SECONDS: u64 = 5 * 60;

/// Rejected answers a single challenge tolerates before it is discarded.
pub const MAX_CODE_ATTEMPTS: u32 = 5;

#[derive(ToSchema, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondFactorMode {
    #[default]
    Placeholder,
    #[serde(rename = "code")]
    OneTimeCode,
}

impl SecondFactorMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Placeholder => "placeholder",
            Self::OneTimeCode => "code",
        }
    }
}

impl fmt::Display for SecondFactorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecondFactorMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "placeholder" => Ok(Self::Placeholder),
            "code" | "one-time-code" => Ok(Self::OneTimeCode),
            _ => Err(format!("invalid second factor mode: {value}")),
        }
    }
}

/// Delivery channel for one-time codes.
pub trait CodeSender: Send + Sync {
    fn send(&self, identity: &Identity, code: &str);
}

/// Writes codes to the log instead of delivering them.
#[derive(Clone, Debug)]
pub struct LogCodeSender;

impl CodeSender for LogCodeSender {
    fn send(&self, identity: &Identity, code: &str) {
        info!(
            handle = %identity.handle,
            email = %identity.email,
            "second factor code: {code}"
        );
    }
}

/// Outstanding challenge for one pending session.
#[derive(Debug)]
pub struct Challenge {
    code_hash: Option<Vec<u8>>,
    issued_at: Instant,
    failed_attempts: u32,
}

impl Challenge {
    fn without_code() -> Self {
        Self {
            code_hash: None,
            issued_at: Instant::now(),
            failed_attempts: 0,
        }
    }

    fn with_code(code: &str) -> Self {
        Self {
            code_hash: Some(hash_code(code)),
            issued_at: Instant::now(),
            failed_attempts: 0,
        }
    }

    /// Count a rejected answer. Returns `true` once no attempts remain.
    pub(crate) fn record_failure(&mut self) -> bool {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.failed_attempts >= MAX_CODE_ATTEMPTS
    }
}

pub trait SecondFactor: Send + Sync {
    /// Start a challenge for an identity whose credentials were just verified.
    ///
    /// # Errors
    /// Returns an error if the challenge cannot be created.
    fn issue(&self, identity: &Identity) -> Result<Challenge>;

    /// Check the operator's answer to `challenge`.
    ///
    /// # Errors
    /// Returns [`VaultError::SecondFactorRejected`] when the answer is not accepted.
    fn verify(&self, challenge: &Challenge, code: Option<&str>) -> Result<()>;

    fn mode(&self) -> SecondFactorMode;
}

/// No-op placeholder: every confirmation succeeds.
#[derive(Clone, Debug)]
pub struct PlaceholderSecondFactor;

impl SecondFactor for PlaceholderSecondFactor {
    fn issue(&self, _identity: &Identity) -> Result<Challenge> {
        Ok(Challenge::without_code())
    }

    fn verify(&self, _challenge: &Challenge, _code: Option<&str>) -> Result<()> {
        warn!("placeholder second factor accepted without verification");
        Ok(())
    }

    fn mode(&self) -> SecondFactorMode {
        SecondFactorMode::Placeholder
    }
}

pub struct OneTimeCode {
    sender: Arc<dyn CodeSender>,
    ttl: Duration,
}

impl OneTimeCode {
    #[must_use]
    pub fn new(sender: Arc<dyn CodeSender>) -> Self {
        Self {
            sender,
            ttl: Duration::from_secs(DEFAULT_CODE_TTL_SECONDS),
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl SecondFactor for OneTimeCode {
    fn issue(&self, identity: &Identity) -> Result<Challenge> {
        let code = format!("{:06}", OsRng.gen_range(0..1_000_000u32));
        self.sender.send(identity, &code);
        Ok(Challenge::with_code(&code))
    }

    fn verify(&self, challenge: &Challenge, code: Option<&str>) -> Result<()> {
        if challenge.issued_at.elapsed() >= self.ttl {
            debug!("second factor code expired");
            return Err(VaultError::SecondFactorRejected);
        }

        let (Some(expected), Some(code)) = (challenge.code_hash.as_deref(), code) else {
            return Err(VaultError::SecondFactorRejected);
        };

        if hash_code(code.trim()) == expected {
            Ok(())
        } else {
            Err(VaultError::SecondFactorRejected)
        }
    }

    fn mode(&self) -> SecondFactorMode {
        SecondFactorMode::OneTimeCode
    }
}

/// Build the verifier for `mode`, delivering codes through `sender`.
#[must_use]
pub fn for_mode(mode: SecondFactorMode, sender: Arc<dyn CodeSender>) -> Arc<dyn SecondFactor> {
    match mode {
        SecondFactorMode::Placeholder => Arc::new(PlaceholderSecondFactor),
        SecondFactorMode::OneTimeCode => Arc::new(OneTimeCode::new(sender)),
    }
}

fn hash_code(code: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hasher.finalize().to_vec()
}
