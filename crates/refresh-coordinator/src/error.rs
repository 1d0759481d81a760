//! Error types for coordinated requests

use std::fmt;

use transport::TransportError;

/// Why a refresh exchange did not produce a new access secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFailure {
    /// HTTP status of the refresh response, if the endpoint answered with one.
    pub status: Option<u16>,
    pub reason: String,
    /// The refresh endpoint could not be reached (timeout, connect failure).
    pub unreachable: bool,
}

impl RefreshFailure {
    pub fn new(status: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            unreachable: false,
        }
    }

    /// The exchange never got a response from the refresh endpoint.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            unreachable: true,
            ..Self::new(None, reason)
        }
    }

    /// No refresh secret was stored, so the session cannot be renewed.
    pub fn missing_secret() -> Self {
        Self::new(Some(transport::UNAUTHORIZED), "no refresh secret stored")
    }

    /// The refreshing task went away before reporting a result.
    pub fn interrupted() -> Self {
        Self::new(None, "refresh abandoned before completing")
    }
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {status})", self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

/// Errors from `Coordinator::execute`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request itself failed, including a 401 that could not be recovered.
    #[error(transparent)]
    Request(TransportError),

    /// The session could not be renewed; stored credentials have been cleared.
    #[error("session expired: {0}")]
    SessionExpired(RefreshFailure),

    /// The credential store failed to read or write.
    #[error("credential store error: {0}")]
    Storage(credentials::Error),
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Credentials(e) => Error::Storage(e),
            other => Error::Request(other),
        }
    }
}

impl From<credentials::Error> for Error {
    fn from(err: credentials::Error) -> Self {
        Error::Storage(err)
    }
}

/// Result alias for coordinated requests.
pub type Result<T> = std::result::Result<T, Error>;
