//! Response envelope returned by every facade call
//!
//! The backend wraps every payload as `{status, message, data}`. The facade
//! hands callers that shape for every outcome: server successes and errors
//! pass through, and failures without a usable body are synthesized here.

use refresh_coordinator::{Error, RefreshFailure};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;
use transport::{RawResponse, TransportError};

/// Message used when no response (or no status text) is available.
pub const NETWORK_ERROR_MESSAGE: &str = "A network error occurred.";

/// Status reported for transport failures that never reached the server.
pub const NETWORK_ERROR_STATUS: u16 = 500;

/// Uniform `{status, message, data}` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Status and message of an error envelope whose `data` has another shape.
#[derive(Deserialize)]
struct ErrorEnvelope {
    status: u16,
    #[serde(default)]
    message: String,
}

impl<T> ApiResponse<T> {
    pub fn new(status: u16, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status,
            message: message.into(),
            data,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Transport-level failure: timeout, DNS, connection reset.
    pub fn network_error() -> Self {
        Self::new(NETWORK_ERROR_STATUS, NETWORK_ERROR_MESSAGE, None)
    }

    /// The session could not be renewed. Status is the refresh endpoint's;
    /// without one it is 500 when the endpoint was unreachable, else 401.
    pub fn session_expired(failure: &RefreshFailure) -> Self {
        let fallback = if failure.unreachable {
            NETWORK_ERROR_STATUS
        } else {
            transport::UNAUTHORIZED
        };
        Self::new(
            failure.status.unwrap_or(fallback),
            format!("Session expired: {}", failure.reason),
            None,
        )
    }
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Normalize a coordinated outcome. Only credential-store faults are
    /// returned as `Err`.
    pub fn from_outcome(
        outcome: refresh_coordinator::Result<RawResponse>,
    ) -> credentials::Result<Self> {
        match outcome {
            Ok(response) => Ok(Self::from_response(response)),
            Err(Error::Request(err)) => Ok(Self::from_transport_error(err)),
            Err(Error::SessionExpired(failure)) => Ok(Self::session_expired(&failure)),
            Err(Error::Storage(err)) => Err(err),
        }
    }

    /// Decode a 2xx response body.
    pub fn from_response(response: RawResponse) -> Self {
        if response.body.trim().is_empty() {
            return Self::new(response.status, response.status_text, None);
        }
        match serde_json::from_str(&response.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(status = response.status, error = %e, "response body is not an envelope");
                Self::new(
                    response.status,
                    format!("malformed response body: {e}"),
                    None,
                )
            }
        }
    }

    /// A structured error body from the server passes through. Its `data`
    /// is kept only when it decodes as `T`; the server's status and message
    /// are kept either way. Anything else is synthesized from the status.
    pub fn from_transport_error(err: TransportError) -> Self {
        match err {
            TransportError::Status {
                status,
                status_text,
                body,
            } => {
                if let Some(body) = body.as_deref() {
                    if let Ok(envelope) = serde_json::from_str::<Self>(body) {
                        return envelope;
                    }
                    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
                        return Self::new(envelope.status, envelope.message, None);
                    }
                }
                let message = if status_text.is_empty() {
                    NETWORK_ERROR_MESSAGE.to_owned()
                } else {
                    status_text
                };
                Self::new(status, message, None)
            }
            other => {
                warn!(error = %other, "request failed before a response was received");
                Self::network_error()
            }
        }
    }
}
