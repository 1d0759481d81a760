//! Transport abstraction for single HTTP exchanges
//!
//! Defines the `Transport` trait the refresh coordinator sends every request
//! through. A transport performs exactly one exchange: it attaches the bearer
//! credential when the request asks for it, and reports the outcome without
//! retrying or interpreting it. `HttpTransport` is the reqwest implementation.

pub mod http;
pub mod request;

pub use http::{DEFAULT_TIMEOUT, HeaderInjection, HttpTransport};
pub use request::{FormPart, MultipartForm, RequestBody, RequestDescriptor};
pub use reqwest::Method;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// HTTP status that marks an expired or rejected access credential.
pub const UNAUTHORIZED: u16 = 401;

/// A 2xx response, body kept as text for the caller to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

/// Why a single exchange did not produce a 2xx response.
///
/// `Clone` so one failure can be reported to every request waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("server responded {status} {status_text}")]
    Status {
        status: u16,
        status_text: String,
        body: Option<String>,
    },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connect, DNS, TLS, or body I/O failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built (bad URL, bad multipart part).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Reading the access secret failed.
    #[error("credential store error: {0}")]
    Credentials(#[from] credentials::Error),
}

impl TransportError {
    /// HTTP status of the response, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server rejected the credential (HTTP 401).
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(UNAUTHORIZED)
    }
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Performs one HTTP exchange for a request descriptor.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Transport>`).
pub trait Transport: Send + Sync {
    /// Send `request` once. Non-2xx responses come back as `TransportError::Status`.
    fn send<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + 'a>>;
}
