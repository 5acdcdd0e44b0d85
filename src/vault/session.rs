//! Session controller: authentication phase, active identity and screen selection.

use super::{
    error::{Result, VaultError},
    identity::{Identity, IdentityStore, NewIdentity},
    second_factor::{Challenge, SecondFactor},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

/// Point in the authentication sequence.
#[derive(ToSchema, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Unauthenticated,
    PendingSecondFactor,
    Authenticated,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::PendingSecondFactor => "pending second factor",
            Self::Authenticated => "authenticated",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Screens reachable by navigation while unauthenticated.
#[derive(ToSchema, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Welcome,
    Login,
    Signup,
}

/// What the client should render.
#[derive(ToSchema, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Welcome,
    Login,
    Signup,
    SecondFactor,
    Dashboard,
}

pub struct SessionController {
    identities: Arc<IdentityStore>,
    second_factor: Arc<dyn SecondFactor>,
    phase: Phase,
    identity: Option<Identity>,
    challenge: Option<Challenge>,
    view: View,
    loading: bool,
    last_error: Option<String>,
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase)
            .field("identity", &self.identity.as_ref().map(|i| &i.handle))
            .field("view", &self.view)
            .field("loading", &self.loading)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    #[must_use]
    pub fn new(identities: Arc<IdentityStore>, second_factor: Arc<dyn SecondFactor>) -> Self {
        Self {
            identities,
            second_factor,
            phase: Phase::Unauthenticated,
            identity: None,
            challenge: None,
            view: View::Welcome,
            loading: false,
            last_error: None,
        }
    }

    /// Check credentials and move to [`Phase::PendingSecondFactor`].
    ///
    /// The loading flag is raised for the duration of the check. The caller is
    /// expected to keep a single attempt in flight per controller.
    ///
    /// # Errors
    /// Returns [`VaultError::AuthenticationFailed`] on a credential mismatch and
    /// [`VaultError::InvalidTransition`] unless the session is unauthenticated.
    #[instrument(skip(self, secret))]
    pub async fn begin_login(&mut self, handle: &str, secret: &SecretString) -> Result<Identity> {
        self.ensure_phase(Phase::Unauthenticated)?;

        self.loading = true;
        self.last_error = None;
        let verified = self.identities.verify(handle, secret).await;
        self.loading = false;

        let identity = verified.map_err(|e| self.record(e))?;
        let challenge = self
            .second_factor
            .issue(&identity)
            .map_err(|e| self.record(e))?;

        self.identity = Some(identity.clone());
        self.challenge = Some(challenge);
        self.phase = Phase::PendingSecondFactor;

        info!("credentials accepted, awaiting second factor");

        Ok(identity)
    }

    /// Answer the outstanding second-factor challenge.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidTransition`] unless a second factor is pending
    /// and [`VaultError::SecondFactorRejected`] when the verifier refuses `code`;
    /// the phase is unchanged in both cases. The refusal that uses up the last
    /// attempt returns [`VaultError::SecondFactorExhausted`] and drops the session
    /// back to [`Phase::Unauthenticated`].
    #[instrument(skip(self, code))]
    pub fn confirm_second_factor(&mut self, code: Option<&str>) -> Result<()> {
        self.ensure_phase(Phase::PendingSecondFactor)?;

        let Some(mut challenge) = self.challenge.take() else {
            return Err(self.record(VaultError::InvalidTransition { phase: self.phase }));
        };

        self.last_error = None;
        if let Err(err) = self.second_factor.verify(&challenge, code) {
            if challenge.record_failure() {
                warn!("second factor attempts exhausted, login reset");
                self.identity = None;
                self.phase = Phase::Unauthenticated;
                self.view = View::Login;
                return Err(self.record(VaultError::SecondFactorExhausted));
            }
            self.challenge = Some(challenge);
            return Err(self.record(err));
        }

        self.phase = Phase::Authenticated;

        info!("second factor confirmed");

        Ok(())
    }

    /// Register a new identity and point the operator at the login screen.
    ///
    /// Registration never authenticates; the phase is left untouched.
    ///
    /// # Errors
    /// Returns [`VaultError::SecretMismatch`] when `confirm_secret` differs,
    /// [`VaultError::InvalidInput`] for malformed candidates and
    /// [`VaultError::DuplicateHandle`] when the handle is taken.
    #[instrument(skip(self, candidate, confirm_secret), fields(handle = %candidate.handle))]
    pub async fn register_identity(
        &mut self,
        candidate: NewIdentity,
        confirm_secret: Option<&SecretString>,
    ) -> Result<Identity> {
        self.last_error = None;

        if let Some(confirm) = confirm_secret {
            if confirm.expose_secret() != candidate.secret.expose_secret() {
                return Err(self.record(VaultError::SecretMismatch));
            }
        }
        candidate.validate().map_err(|e| self.record(e))?;

        self.loading = true;
        let created = self.identities.create(candidate).await;
        self.loading = false;

        let identity = created.map_err(|e| self.record(e))?;
        self.view = View::Login;

        Ok(identity)
    }

    /// Drop the active identity and return to the welcome screen.
    pub fn end_session(&mut self) {
        if let Some(identity) = self.identity.take() {
            debug!(handle = %identity.handle, "session ended");
        }
        self.challenge = None;
        self.phase = Phase::Unauthenticated;
        self.view = View::Welcome;
        self.last_error = None;
    }

    pub fn navigate(&mut self, view: View) {
        self.view = view;
        self.last_error = None;
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        match (self.phase, self.identity.is_some()) {
            (Phase::Authenticated, true) => Screen::Dashboard,
            (Phase::PendingSecondFactor, true) => Screen::SecondFactor,
            _ => match self.view {
                View::Welcome => Screen::Welcome,
                View::Login => Screen::Login,
                View::Signup => Screen::Signup,
            },
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The active identity, only once the session is fully authenticated.
    #[must_use]
    pub fn authenticated_identity(&self) -> Option<&Identity> {
        match self.phase {
            Phase::Authenticated => self.identity.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn ensure_phase(&mut self, expected: Phase) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(self.record(VaultError::InvalidTransition { phase: self.phase }))
        }
    }

    fn record(&mut self, error: VaultError) -> VaultError {
        debug!("session error: {error}");
        self.last_error = Some(error.to_string());
        error
    }
}
