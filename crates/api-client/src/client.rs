//! Request facade
//!
//! `ApiClient` is what application code calls. Every verb goes through the
//! refresh coordinator, so expired sessions are renewed transparently, and
//! every outcome comes back as an `ApiResponse` envelope. The only `Err` a
//! caller ever sees is a credential-store fault.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use credentials::CredentialStore;
use refresh_coordinator::Coordinator;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use transport::{HttpTransport, MultipartForm, RequestDescriptor, Transport};

use crate::config::Config;
use crate::envelope::ApiResponse;

/// Upper bound on the connectivity check, independent of the request timeout.
pub const STATUS_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ApiClient {
    coordinator: Arc<Coordinator>,
    status_path: String,
}

impl ApiClient {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self {
            coordinator,
            status_path: "/".to_owned(),
        }
    }

    /// Wire an HTTP transport and coordinator from configuration.
    pub fn from_config(config: &Config, credentials: Arc<dyn CredentialStore>) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(
            HttpTransport::new(config.api.base_url.clone(), Arc::clone(&credentials))
                .with_timeout(config.api.timeout())
                .with_headers(&config.headers),
        );
        let coordinator = Coordinator::new(transport, credentials)
            .with_refresh_path(config.api.refresh_path.clone());
        Self::new(Arc::new(coordinator)).with_status_path(config.api.status_path.clone())
    }

    pub fn with_status_path(mut self, path: impl Into<String>) -> Self {
        self.status_path = path.into();
        self
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Send an arbitrary descriptor and decode the envelope.
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
    ) -> credentials::Result<ApiResponse<T>> {
        debug!(
            method = %request.method(),
            path = request.path(),
            requires_auth = request.requires_auth(),
            "sending request"
        );
        let outcome = self.coordinator.execute(request).await;
        ApiResponse::from_outcome(outcome)
    }

    /// GET with optional query parameters. Pass `requires_auth = false` for
    /// public endpoints; no bearer is sent and a 401 is never refreshed.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<Value>,
        requires_auth: bool,
    ) -> credentials::Result<ApiResponse<T>> {
        let request = with_query(RequestDescriptor::get(path), params).with_auth(requires_auth);
        self.send(request).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        requires_auth: bool,
    ) -> credentials::Result<ApiResponse<T>> {
        let request = with_body(RequestDescriptor::post(path), body).with_auth(requires_auth);
        self.send(request).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        requires_auth: bool,
    ) -> credentials::Result<ApiResponse<T>> {
        let request = with_body(RequestDescriptor::put(path), body).with_auth(requires_auth);
        self.send(request).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        requires_auth: bool,
    ) -> credentials::Result<ApiResponse<T>> {
        let request = with_body(RequestDescriptor::patch(path), body).with_auth(requires_auth);
        self.send(request).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<Value>,
        requires_auth: bool,
    ) -> credentials::Result<ApiResponse<T>> {
        let request = with_query(RequestDescriptor::delete(path), params).with_auth(requires_auth);
        self.send(request).await
    }

    /// POST a multipart form. The form is kept as data so a post-refresh
    /// replay sends the same parts.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: MultipartForm,
        requires_auth: bool,
    ) -> credentials::Result<ApiResponse<T>> {
        let request = RequestDescriptor::post(path)
            .multipart(form)
            .with_auth(requires_auth);
        self.send(request).await
    }

    /// Store a freshly issued pair (after the application's login call).
    pub async fn login(
        &self,
        access: Secret<String>,
        refresh: Secret<String>,
    ) -> credentials::Result<()> {
        let store = self.coordinator.credentials();
        store.set_access(access).await?;
        store.set_refresh(refresh).await?;
        info!("session stored");
        Ok(())
    }

    pub async fn logout(&self) -> credentials::Result<()> {
        self.coordinator.credentials().clear().await?;
        info!("session cleared");
        Ok(())
    }

    /// Whether both secrets are present. Says nothing about server-side validity.
    pub async fn is_logged_in(&self) -> credentials::Result<bool> {
        credentials::has_session(self.coordinator.credentials().as_ref()).await
    }

    /// Unauthenticated check of the status endpoint. True only on HTTP 200
    /// within `STATUS_CHECK_TIMEOUT`.
    pub async fn check_network(&self) -> bool {
        let request = RequestDescriptor::get(self.status_path.as_str()).without_auth();
        let check = self.coordinator.transport().send(&request);
        match tokio::time::timeout(STATUS_CHECK_TIMEOUT, check).await {
            Ok(Ok(response)) => response.status == 200,
            Ok(Err(e)) => {
                warn!(error = %e, "network check failed");
                false
            }
            Err(_) => {
                warn!(timeout = ?STATUS_CHECK_TIMEOUT, "network check timed out");
                false
            }
        }
    }
}

fn with_query(request: RequestDescriptor, params: Option<Value>) -> RequestDescriptor {
    match params {
        Some(params) => request.query(params),
        None => request,
    }
}

fn with_body(request: RequestDescriptor, body: Option<Value>) -> RequestDescriptor {
    match body {
        Some(body) => request.json(body),
        None => request,
    }
}
