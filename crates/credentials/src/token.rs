//! Refresh exchange payloads
//!
//! The refresh endpoint takes `{"refreshToken": "..."}` and answers with the
//! backend's usual envelope:
//!
//! ```json
//! {"status": 200, "message": "OK", "data": {"accessToken": "...", "refreshToken": "..."}}
//! ```
//!
//! `refreshToken` in the reply is optional; when present the backend has
//! rotated the refresh secret and the new one must replace the stored one.

use common::Secret;
use serde::Deserialize;

use crate::constants::REFRESH_SUCCESS_STATUS;
use crate::error::{Error, Result};

/// Body of the refresh exchange.
#[derive(Debug, Clone)]
pub struct RefreshRequest {
    refresh_token: Secret<String>,
}

impl RefreshRequest {
    pub fn new(refresh_token: Secret<String>) -> Self {
        Self { refresh_token }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "refreshToken": self.refresh_token.expose() })
    }
}

/// Secrets issued by a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access: Secret<String>,
    /// Present only when the backend rotated the refresh secret.
    pub refresh: Option<Secret<String>>,
}

#[derive(Deserialize)]
struct RefreshEnvelope {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    data: Option<TokenData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenData {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Validate a refresh endpoint reply.
///
/// Anything other than HTTP 200 carrying an envelope with a non-empty
/// `data.accessToken` (and an envelope status of 200, when present) is a
/// failed exchange.
pub fn parse_refresh_response(status: u16, body: &str) -> Result<RefreshedTokens> {
    if status != REFRESH_SUCCESS_STATUS {
        return Err(Error::TokenExchange(format!(
            "refresh endpoint returned {status}"
        )));
    }

    let envelope: RefreshEnvelope = serde_json::from_str(body)
        .map_err(|e| Error::TokenExchange(format!("invalid refresh response: {e}")))?;

    if let Some(inner) = envelope.status
        && inner != REFRESH_SUCCESS_STATUS
    {
        return Err(Error::TokenExchange(format!(
            "refresh envelope reported status {inner}"
        )));
    }

    let data = envelope
        .data
        .ok_or_else(|| Error::TokenExchange("refresh response has no data".into()))?;

    if data.access_token.is_empty() {
        return Err(Error::TokenExchange(
            "refresh response has an empty access token".into(),
        ));
    }

    Ok(RefreshedTokens {
        access: Secret::new(data.access_token),
        refresh: data
            .refresh_token
            .filter(|token| !token.is_empty())
            .map(Secret::new),
    })
}
