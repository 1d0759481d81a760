//! reqwest-backed transport.
//!
//! Joins the descriptor path onto the configured base URL, injects static
//! headers from config, attaches the bearer credential for authenticated
//! requests, and applies a fixed per-exchange deadline.

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use credentials::CredentialStore;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::request::{RequestBody, RequestDescriptor};
use crate::{RawResponse, Result, Transport, TransportError};

/// Per-exchange deadline. Long enough for photo uploads on mobile links.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Static header added to every outbound request (name + value pair from config).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderInjection {
    pub name: String,
    pub value: String,
}

/// Transport that performs each exchange with a shared `reqwest::Client`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    headers: HeaderMap,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            timeout: DEFAULT_TIMEOUT,
            headers: HeaderMap::new(),
            credentials,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Add static headers. Invalid names or values are skipped, and the
    /// authorization header is never taken from config.
    pub fn with_headers(mut self, injections: &[HeaderInjection]) -> Self {
        for injection in injections {
            let name = match HeaderName::from_str(&injection.name) {
                Ok(n) => n,
                Err(e) => {
                    warn!(header = %injection.name, error = %e, "skipping invalid header name");
                    continue;
                }
            };
            if name == AUTHORIZATION {
                warn!(header = %injection.name, "refusing to inject authorization header from config");
                continue;
            }
            let value = match HeaderValue::from_str(&injection.value) {
                Ok(v) => v,
                Err(e) => {
                    warn!(header = %injection.name, error = %e, "skipping invalid header value");
                    continue;
                }
            };
            self.headers.insert(name, value);
        }
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute paths pass through untouched; relative ones join the base URL.
    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Whether `url` lies under the base URL. The bearer is only sent there.
    fn is_own_origin(&self, url: &str) -> bool {
        url.strip_prefix(self.base_url.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
    }

    async fn dispatch(&self, request: &RequestDescriptor) -> Result<RawResponse> {
        let url = self.url(request.path());
        let mut builder = self
            .client
            .request(request.method().clone(), &url)
            .headers(self.headers.clone())
            .timeout(self.timeout);

        if let Some(params) = request.query_params() {
            builder = builder.query(params);
        }

        builder = match request.body() {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(form) => builder.multipart(form.to_form()?),
        };

        if request.requires_auth() && !self.is_own_origin(&url) {
            warn!(url = %url, "not sending credential outside the base URL");
        } else if request.requires_auth() {
            match self.credentials.access().await? {
                Some(token) => builder = builder.bearer_auth(token.expose()),
                None => debug!(path = %request.path(), "no access secret stored, sending without credential"),
            }
        }

        debug!(
            method = %request.method(),
            url = %url,
            attempt = request.attempt(),
            "sending request"
        );

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_owned();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if status.is_success() {
            return Ok(RawResponse {
                status: status.as_u16(),
                status_text,
                body,
            });
        }

        debug!(status = status.as_u16(), url = %url, "server returned error status");
        Err(TransportError::Status {
            status: status.as_u16(),
            status_text,
            body: (!body.is_empty()).then_some(body),
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn send<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + 'a>> {
        Box::pin(self.dispatch(request))
    }
}
