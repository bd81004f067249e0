use thiserror::Error;

use crate::constants::ERR_NOT_AUTHENTICATED;

/// Errors surfaced by managers and the remote table boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PmsError {
    /// Rejected locally before any round trip was attempted
    #[error("{0}")]
    Validation(String),

    /// A user-scoped operation was attempted without a session
    #[error("{}", ERR_NOT_AUTHENTICATED)]
    NotAuthenticated,

    /// Failure reported by the transport or the server, message passed through verbatim
    #[error("{0}")]
    Remote(String),
}

impl PmsError {
    pub fn validation(message: impl Into<String>) -> Self {
        PmsError::Validation(message.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        PmsError::Remote(message.into())
    }
}

impl From<reqwest::Error> for PmsError {
    fn from(e: reqwest::Error) -> Self {
        PmsError::Remote(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PmsError>;
