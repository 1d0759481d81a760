//! In-process credential store

use std::future::Future;
use std::pin::Pin;

use common::Secret;
use tokio::sync::Mutex;

use crate::credentials::{CredentialPair, CredentialStore};
use crate::error::Result;

/// Credential store that lives only as long as the process.
///
/// Used by tests and by embedders that persist credentials elsewhere.
#[derive(Default)]
pub struct MemoryCredentialStore {
    state: Mutex<CredentialPair>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            state: Mutex::new(pair),
        }
    }

    pub async fn snapshot(&self) -> CredentialPair {
        self.state.lock().await.clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access(&self) -> Pin<Box<dyn Future<Output = Result<Option<Secret<String>>>> + Send + '_>> {
        Box::pin(async move { Ok(self.state.lock().await.access.clone().map(Secret::new)) })
    }

    fn set_access(
        &self,
        secret: Secret<String>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.state.lock().await.access = Some(secret.expose().clone());
            Ok(())
        })
    }

    fn refresh(&self) -> Pin<Box<dyn Future<Output = Result<Option<Secret<String>>>> + Send + '_>> {
        Box::pin(async move { Ok(self.state.lock().await.refresh.clone().map(Secret::new)) })
    }

    fn set_refresh(
        &self,
        secret: Secret<String>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.state.lock().await.refresh = Some(secret.expose().clone());
            Ok(())
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            *self.state.lock().await = CredentialPair::default();
            Ok(())
        })
    }
}
