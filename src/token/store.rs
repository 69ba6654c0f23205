//! Pluggable credential storage
//!
//! A store only holds whole [`Credential`] values keyed by [`CredentialKey`].
//! It knows nothing about expiry or refresh; [`TokenManager`](super::TokenManager)
//! decides freshness.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::WechatError;
use crate::transport::BoxFuture;
use crate::types::{Credential, CredentialKey};

/// Storage backend for cached access tokens.
///
/// `set` must replace the entry atomically relative to `get`: a reader sees
/// either the old credential or the new one, never a mix.
pub trait CredentialStore: Send + Sync {
    fn get<'a>(
        &'a self,
        key: &'a CredentialKey,
    ) -> BoxFuture<'a, Result<Option<Credential>, WechatError>>;

    fn set<'a>(
        &'a self,
        key: &'a CredentialKey,
        credential: Credential,
    ) -> BoxFuture<'a, Result<(), WechatError>>;

    fn remove<'a>(&'a self, key: &'a CredentialKey) -> BoxFuture<'a, Result<(), WechatError>>;
}

/// In-process store. The default.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<CredentialKey, Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get<'a>(
        &'a self,
        key: &'a CredentialKey,
    ) -> BoxFuture<'a, Result<Option<Credential>, WechatError>> {
        let credential = self.entries.read().get(key).cloned();
        Box::pin(async move { Ok(credential) })
    }

    fn set<'a>(
        &'a self,
        key: &'a CredentialKey,
        credential: Credential,
    ) -> BoxFuture<'a, Result<(), WechatError>> {
        self.entries.write().insert(key.clone(), credential);
        Box::pin(async { Ok(()) })
    }

    fn remove<'a>(&'a self, key: &'a CredentialKey) -> BoxFuture<'a, Result<(), WechatError>> {
        self.entries.write().remove(key);
        Box::pin(async { Ok(()) })
    }
}

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// JSON file store, shareable between processes on one host.
///
/// The whole map is rewritten through a temp file and renamed into place, so
/// concurrent readers never observe a half-written file. Every write uses its
/// own temp file (`<path>.tmp.<pid>.<seq>`), so several instances may point
/// at one file. Writers within one instance are serialized; separate
/// instances race last-writer-wins, which is harmless for tokens issued by
/// the same app.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<CredentialKey, Credential>, WechatError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                WechatError::Store(format!("corrupt store {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(WechatError::Store(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn save(&self, entries: &BTreeMap<CredentialKey, Credential>) -> Result<(), WechatError> {
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| WechatError::Store(format!("failed to encode store: {e}")))?;

        let tmp = self.temp_path();

        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(WechatError::Store(format!(
                "failed to write {}: {e}",
                tmp.display()
            )));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(WechatError::Store(format!(
                "failed to replace {}: {e}",
                self.path.display()
            )));
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(format!(".tmp.{}.{}", std::process::id(), seq));
        PathBuf::from(tmp)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get<'a>(
        &'a self,
        key: &'a CredentialKey,
    ) -> BoxFuture<'a, Result<Option<Credential>, WechatError>> {
        Box::pin(async move { Ok(self.load().await?.remove(key)) })
    }

    fn set<'a>(
        &'a self,
        key: &'a CredentialKey,
        credential: Credential,
    ) -> BoxFuture<'a, Result<(), WechatError>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            let mut entries = self.load().await?;
            entries.insert(key.clone(), credential);
            self.save(&entries).await
        })
    }

    fn remove<'a>(&'a self, key: &'a CredentialKey) -> BoxFuture<'a, Result<(), WechatError>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            let mut entries = self.load().await?;
            if entries.remove(key).is_some() {
                self.save(&entries).await?;
            }
            Ok(())
        })
    }
}
