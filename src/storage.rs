//! Persistence of the client identity and lock credentials
//!
//! [`FileStore`] keeps the JSON layout used by existing Nuki BLE tooling:
//!
//! ```json
//! {
//!   "appId": 123456,
//!   "appType": 2,
//!   "name": "nukible 123456",
//!   "nukiLocks": {
//!     "<peripheral id>": {
//!       "nukiUuid": "<32 hex>",
//!       "nukiAuthorizationId": 7,
//!       "sharedSecret": "<64 hex>"
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{ClientIdentity, LockCredential};

/// Abstract storage for the client identity and per-lock credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stored client identity
    async fn identity(&self) -> Option<ClientIdentity>;

    /// Replace the client identity
    ///
    /// # Errors
    ///
    /// Returns error if storage fails
    async fn set_identity(&mut self, identity: &ClientIdentity) -> Result<(), StorageError>;

    /// Load the credential for a peripheral
    async fn load(&self, peripheral_id: &str) -> Option<LockCredential>;

    /// Save the credential for a peripheral
    ///
    /// # Errors
    ///
    /// Returns error if storage fails
    async fn save(
        &mut self,
        peripheral_id: &str,
        credential: &LockCredential,
    ) -> Result<(), StorageError>;

    /// Remove the credential for a peripheral
    ///
    /// # Errors
    ///
    /// Returns error if removal fails
    async fn remove(&mut self, peripheral_id: &str) -> Result<(), StorageError>;

    /// Peripheral ids with a stored credential
    async fn list_locks(&self) -> Vec<String>;
}

/// Return the stored identity, generating and saving one if there is none
///
/// # Errors
///
/// Returns error if the new identity cannot be saved
pub async fn load_or_create_identity<S: CredentialStore + ?Sized>(
    store: &mut S,
    name_prefix: &str,
) -> Result<ClientIdentity, StorageError> {
    if let Some(identity) = store.identity().await {
        return Ok(identity);
    }
    let identity = ClientIdentity::generate(name_prefix);
    tracing::info!(app_id = identity.app_id, name = %identity.name, "Generated client identity");
    store.set_identity(&identity).await?;
    Ok(identity)
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreContents {
    #[serde(flatten)]
    identity: Option<ClientIdentity>,
    #[serde(rename = "nukiLocks", default)]
    locks: BTreeMap<String, LockCredential>,
}

/// In-memory credential storage (non-persistent)
#[derive(Debug, Default)]
pub struct MemoryStore {
    contents: StoreContents,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `identity`
    #[must_use]
    pub fn with_identity(identity: ClientIdentity) -> Self {
        Self {
            contents: StoreContents {
                identity: Some(identity),
                locks: BTreeMap::new(),
            },
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn identity(&self) -> Option<ClientIdentity> {
        self.contents.identity.clone()
    }

    async fn set_identity(&mut self, identity: &ClientIdentity) -> Result<(), StorageError> {
        self.contents.identity = Some(identity.clone());
        Ok(())
    }

    async fn load(&self, peripheral_id: &str) -> Option<LockCredential> {
        self.contents.locks.get(peripheral_id).cloned()
    }

    async fn save(
        &mut self,
        peripheral_id: &str,
        credential: &LockCredential,
    ) -> Result<(), StorageError> {
        self.contents
            .locks
            .insert(peripheral_id.to_string(), credential.clone());
        Ok(())
    }

    async fn remove(&mut self, peripheral_id: &str) -> Result<(), StorageError> {
        self.contents.locks.remove(peripheral_id);
        Ok(())
    }

    async fn list_locks(&self) -> Vec<String> {
        self.contents.locks.keys().cloned().collect()
    }
}

/// JSON file storage
pub struct FileStore {
    path: PathBuf,
    cache: StoreContents,
}

impl FileStore {
    /// Open the store at `path`, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or the file cannot be parsed
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let cache = Self::load_all(&path).await?;
        tracing::debug!(path = %path.display(), locks = cache.locks.len(), "Opened credential store");
        Ok(Self { path, cache })
    }

    /// Location of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_all(path: &Path) -> Result<StoreContents, StorageError> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(StoreContents::default());
        }

        let bytes = tokio::fs::read(path).await?;
        if bytes.is_empty() {
            return Ok(StoreContents::default());
        }

        tokio::task::spawn_blocking(move || serde_json::from_slice(&bytes))
            .await
            .map_err(|e| StorageError::Serialization(format!("deserialization task failed: {e}")))?
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn save_all(&self) -> Result<(), StorageError> {
        let cache = self.cache.clone();

        let bytes = tokio::task::spawn_blocking(move || serde_json::to_vec_pretty(&cache))
            .await
            .map_err(|e| StorageError::Serialization(format!("serialization task failed: {e}")))?
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn identity(&self) -> Option<ClientIdentity> {
        self.cache.identity.clone()
    }

    async fn set_identity(&mut self, identity: &ClientIdentity) -> Result<(), StorageError> {
        self.cache.identity = Some(identity.clone());
        self.save_all().await
    }

    async fn load(&self, peripheral_id: &str) -> Option<LockCredential> {
        self.cache.locks.get(peripheral_id).cloned()
    }

    async fn save(
        &mut self,
        peripheral_id: &str,
        credential: &LockCredential,
    ) -> Result<(), StorageError> {
        self.cache
            .locks
            .insert(peripheral_id.to_string(), credential.clone());
        self.save_all().await
    }

    async fn remove(&mut self, peripheral_id: &str) -> Result<(), StorageError> {
        if self.cache.locks.remove(peripheral_id).is_some() {
            self.save_all().await?;
        }
        Ok(())
    }

    async fn list_locks(&self) -> Vec<String> {
        self.cache.locks.keys().cloned().collect()
    }
}
