use super::session::Phase;
use thiserror::Error;

/// Failures surfaced by the identity store, file registry and session controller.
///
/// The `Display` text is the message shown to the operator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Raised on signup when the handle is already registered.
    #[error("An operator with this ID already exists.")]
    DuplicateHandle,
    /// Unknown handle and wrong secret collapse into this one outcome.
    #[error("Authorization failed. Check Operator ID and Master Password.")]
    AuthenticationFailed,
    #[error("Passwords do not match.")]
    SecretMismatch,
    #[error("Operation not allowed while {phase}.")]
    InvalidTransition { phase: Phase },
    #[error("Second factor rejected.")]
    SecondFactorRejected,
    /// The challenge is gone; the operator has to log in again.
    #[error("Too many second factor attempts. Log in again.")]
    SecondFactorExhausted,
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error("Failed to process credentials.")]
    Credential,
}

impl VaultError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = VaultError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            VaultError::DuplicateHandle.to_string(),
            "An operator with this ID already exists."
        );
        assert_eq!(
            VaultError::InvalidTransition {
                phase: Phase::Unauthenticated
            }
            .to_string(),
            "Operation not allowed while unauthenticated."
        );
        assert_eq!(
            VaultError::invalid("email", "malformed address").to_string(),
            "Invalid email: malformed address"
        );
        assert_eq!(
            VaultError::SecondFactorExhausted.to_string(),
            "Too many second factor attempts. Log in again."
        );
    }
}
