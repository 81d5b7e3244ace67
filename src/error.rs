//! Error types shared by the session and feed layers

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong between the UI and the backend
#[derive(Debug, Error)]
pub enum Error {
    /// Required input was missing or malformed
    #[error("{0}")]
    Validation(String),

    /// The token could not be decoded or carries no usable claims
    #[error("invalid token")]
    InvalidToken,

    /// The backend had no record of the requested resource
    #[error("{0} not found")]
    NotFound(String),

    /// The backend answered with a non-success status
    #[error("request failed with status {status}: {message}")]
    Gateway {
        /// HTTP status code
        status: u16,
        /// Body returned by the server, if any
        message: String,
    },

    /// Transport failure (connect, timeout, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Refreshing the token failed; the session has been terminated
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// An operation needed an authenticated session and there was none
    #[error("not authenticated")]
    Unauthenticated,

    /// The same logical operation is already running
    #[error("{0} already in progress")]
    Busy(&'static str),

    /// The credential store could not be read or written
    #[error("credential storage: {0}")]
    Storage(String),

    /// JSON (de)serialization failure
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Message safe to show to the end user.
    ///
    /// Only validation errors carry their own text; everything else collapses
    /// to a generic alert so server details never reach the screen.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::InvalidToken | Self::Unauthenticated | Self::RefreshFailed(_) => {
                "Your session has ended. Please log in again.".to_string()
            }
            Self::Busy(_) => "Please wait, still working on it.".to_string(),
            _ => "Oops, something went wrong.".to_string(),
        }
    }

    /// Whether this error means the session can no longer be trusted
    pub const fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken | Self::Unauthenticated | Self::RefreshFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_surfaced() {
        let err = Error::Validation("username and password are required".into());
        assert_eq!(err.user_message(), "username and password are required");
    }

    #[test]
    fn test_gateway_detail_is_hidden() {
        let err = Error::Gateway {
            status: 500,
            message: "pq: relation \"posts\" does not exist".into(),
        };
        assert!(!err.user_message().contains("pq"));
        assert!(!err.is_auth_failure());
    }

    #[test]
    fn test_auth_failures() {
        assert!(Error::InvalidToken.is_auth_failure());
        assert!(Error::RefreshFailed("401".into()).is_auth_failure());
        assert!(!Error::NotFound("user".into()).is_auth_failure());
    }
}
