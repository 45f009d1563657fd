use crate::errors::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Active identity and directory for this process. Threaded explicitly into
/// store calls instead of living in ambient global state. Serialized field
/// names are part of the `config.json` format and must stay stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub sync_dir: Option<PathBuf>,
    #[serde(default)]
    pub password: String,
}

impl StoreConfig {
    /// Loads the config file, treating a missing file as defaults. A fresh
    /// install has no config yet; that is a normal state, not a fault.
    pub async fn load(path: &Path) -> StoreResult<Self> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(error.into()),
        }
    }

    pub async fn save(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serde_json::to_vec_pretty(self)?).await?;
        Ok(())
    }

    pub fn require_sync_dir(&self) -> StoreResult<&Path> {
        self.sync_dir
            .as_deref()
            .ok_or_else(|| StoreError::Configuration("sync directory is not configured".to_string()))
    }

    pub fn require_username(&self) -> StoreResult<&str> {
        if self.username.is_empty() {
            return Err(StoreError::Configuration("username is not configured".to_string()));
        }
        Ok(&self.username)
    }

    pub fn require_password(&self) -> StoreResult<&str> {
        if self.password.is_empty() {
            return Err(StoreError::Configuration("team passphrase is not configured".to_string()));
        }
        Ok(&self.password)
    }
}
