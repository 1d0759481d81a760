//! Credential store contract and the file-backed implementation
//!
//! The store owns the access/refresh pair. "Not found" is always `Ok(None)`;
//! an `Err` means the backing storage itself failed and must reach the caller.
//!
//! `FileCredentialStore` keeps the pair in a JSON file. All writes use atomic
//! temp-file + rename so a crash never leaves a half-written file, and a tokio
//! Mutex serializes writers (refresh coordinator, login, logout).

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Access/refresh secrets as persisted on disk.
///
/// A pair with an access secret but no refresh secret is tolerated; the
/// coordinator treats it as "cannot refresh".
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Some(access.into()),
            refresh: Some(refresh.into()),
        }
    }

    /// True when both secrets are present.
    pub fn is_complete(&self) -> bool {
        self.access.is_some() && self.refresh.is_some()
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &self.access.as_ref().map(|_| "[REDACTED]"))
            .field("refresh", &self.refresh.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Durable holder of the access and refresh secrets.
///
/// Uses `Pin<Box<dyn Future>>` return types so the store can be shared as
/// `Arc<dyn CredentialStore>` between the transport and the coordinator.
pub trait CredentialStore: Send + Sync {
    /// Current access secret, or `None` when logged out.
    fn access(&self) -> Pin<Box<dyn Future<Output = Result<Option<Secret<String>>>> + Send + '_>>;

    fn set_access(
        &self,
        secret: Secret<String>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Current refresh secret, or `None` when it was never issued or was cleared.
    fn refresh(&self) -> Pin<Box<dyn Future<Output = Result<Option<Secret<String>>>> + Send + '_>>;

    fn set_refresh(
        &self,
        secret: Secret<String>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Remove both secrets. Clearing an empty store succeeds.
    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Whether the store holds both an access and a refresh secret.
pub async fn has_session(store: &dyn CredentialStore) -> Result<bool> {
    let access = store.access().await?;
    let refresh = store.refresh().await?;
    Ok(access.is_some() && refresh.is_some())
}

/// Credential pair persisted as a JSON file.
pub struct FileCredentialStore {
    path: PathBuf,
    state: Mutex<CredentialPair>,
}

impl FileCredentialStore {
    /// Load the pair from `path`.
    ///
    /// A missing file is a cold start: the store begins logged out and writes
    /// `{}` so later loads take the normal path.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let pair: CredentialPair = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(
                path = %path.display(),
                has_access = pair.access.is_some(),
                has_refresh = pair.refresh.is_some(),
                "loaded credentials"
            );
            pair
        } else {
            info!(path = %path.display(), "credential file not found, starting logged out");
            let pair = CredentialPair::default();
            write_atomic(&path, &pair).await?;
            pair
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clone of the in-memory pair.
    pub async fn snapshot(&self) -> CredentialPair {
        self.state.lock().await.clone()
    }

    /// Apply `change` and persist. Memory is only updated once the write succeeds.
    async fn update(&self, change: impl FnOnce(&mut CredentialPair)) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        change(&mut next);
        if next == *state {
            return Ok(());
        }
        write_atomic(&self.path, &next).await?;
        *state = next;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn access(&self) -> Pin<Box<dyn Future<Output = Result<Option<Secret<String>>>> + Send + '_>> {
        Box::pin(async move { Ok(self.state.lock().await.access.clone().map(Secret::new)) })
    }

    fn set_access(
        &self,
        secret: Secret<String>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.update(|pair| pair.access = Some(secret.expose().clone()))
                .await?;
            debug!("stored access secret");
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
            self.update(|pair| pair.refresh = Some(secret.expose().clone()))
                .await?;
            debug!("stored refresh secret");
            Ok(())
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.update(|pair| *pair = CredentialPair::default()).await?;
            info!(path = %self.path.display(), "cleared credentials");
            Ok(())
        })
    }
}

/// Write the pair to `path` atomically with owner-only permissions.
async fn write_atomic(path: &Path, pair: &CredentialPair) -> Result<()> {
    let json = serde_json::to_string_pretty(pair)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(crate::constants::CREDENTIAL_FILE_MODE);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store(dir: &tempfile::TempDir) -> FileCredentialStore {
        FileCredentialStore::load(dir.path().join("credentials.json"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn cold_start_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        assert!(!path.exists());
        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        assert!(store.access().await.unwrap().is_none());
        assert!(store.refresh().await.unwrap().is_none());
        assert!(path.exists());

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: CredentialPair = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, CredentialPair::default());
    }

    #[tokio::test]
    async fn stored_pair_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir).await;
        store.set_access(Secret::from("at_1")).await.unwrap();
        store.set_refresh(Secret::from("rt_1")).await.unwrap();

        let reloaded = temp_store(&dir).await;
        assert_eq!(reloaded.access().await.unwrap().unwrap().expose(), "at_1");
        assert_eq!(reloaded.refresh().await.unwrap().unwrap().expose(), "rt_1");
        assert!(has_session(&reloaded).await.unwrap());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir).await;
        store.set_access(Secret::from("at_1")).await.unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.access().await.unwrap().is_none());
        let reloaded = temp_store(&dir).await;
        assert_eq!(reloaded.snapshot().await, CredentialPair::default());
    }

    #[tokio::test]
    async fn partial_pair_is_not_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir).await;
        store.set_access(Secret::from("at_only")).await.unwrap();

        assert!(!has_session(&store).await.unwrap());
        assert!(!store.snapshot().await.is_complete());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let result = FileCredentialStore::load(path).await;
        assert!(matches!(result, Err(Error::CredentialParse(_))));
    }

    #[tokio::test]
    async fn write_failure_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir).await;
        store.set_access(Secret::from("at_1")).await.unwrap();

        // Removing the directory makes the temp-file write fail.
        std::fs::remove_dir_all(dir.path()).unwrap();
        let result = store.set_access(Secret::from("at_2")).await;

        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(store.access().await.unwrap().unwrap().expose(), "at_1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir).await;
        store.set_refresh(Secret::from("rt_1")).await.unwrap();

        let metadata = tokio::fs::metadata(store.path()).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "credential file must be 0600, got {mode:o}");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let pair = CredentialPair::new("at_secret", "rt_secret");
        let debug = format!("{pair:?}");
        assert!(!debug.contains("at_secret"));
        assert!(!debug.contains("rt_secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
