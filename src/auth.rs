use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use tokio::sync::watch;

use crate::error::{PmsError, Result};

/// Session issued by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
}

#[derive(Deserialize)]
struct AccessTokenClaims {
    sub: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Builds a session from a JWT access token by reading its `sub` claim.
    ///
    /// The signature is not checked; the backend verifies tokens on every request.
    pub fn from_access_token(access_token: &str) -> Result<Self> {
        let payload = access_token
            .split('.')
            .nth(1)
            .ok_or_else(|| PmsError::validation("Malformed access token"))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|_| PmsError::validation("Malformed access token payload"))?;
        let claims: AccessTokenClaims = serde_json::from_slice(&bytes)
            .map_err(|_| PmsError::validation("Access token has no subject"))?;

        if claims.sub.trim().is_empty() {
            return Err(PmsError::validation("Access token has no subject"));
        }

        Ok(Self::new(claims.sub, access_token))
    }
}

pub trait IdentityProvider: Send + Sync {
    fn current_session(&self) -> Option<Session>;

    fn current_user_id(&self) -> Result<String> {
        self.current_session()
            .map(|session| session.user_id)
            .ok_or(PmsError::NotAuthenticated)
    }
}

/// Holds the current session and notifies subscribers on every sign-in and sign-out.
pub struct AuthManager {
    session: watch::Sender<Option<Session>>,
}

impl AuthManager {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self { session }
    }

    pub fn with_session(session: Session) -> Self {
        let manager = Self::new();
        manager.sign_in(session);
        manager
    }

    pub fn sign_in(&self, session: Session) {
        tracing::info!(user_id = %session.user_id, "signed in");
        self.session.send_replace(Some(session));
    }

    pub fn sign_in_with_access_token(&self, access_token: &str) -> Result<Session> {
        let session = Session::from_access_token(access_token)?;
        self.sign_in(session.clone());
        Ok(session)
    }

    pub fn sign_out(&self) {
        if self.session.send_replace(None).is_some() {
            tracing::info!("signed out");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }
}

impl Default for AuthManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for AuthManager {
    fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }
}
