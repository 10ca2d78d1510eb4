//! Typed access to the persisted session keys.

use crate::{KeyValueStore, StorageKeys, StorageResult};
use std::sync::Arc;
use tracing::debug;

/// High-level API over the three session keys.
#[derive(Clone)]
pub struct SessionVault {
    storage: Arc<dyn KeyValueStore>,
}

impl SessionVault {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// The underlying store.
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    pub fn get_access_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::ACCESS_TOKEN)
    }

    pub fn set_access_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::ACCESS_TOKEN, token)
    }

    pub fn get_refresh_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::REFRESH_TOKEN)
    }

    pub fn set_refresh_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::REFRESH_TOKEN, token)
    }

    /// Read the new-user flag. Anything other than `"true"` reads as false,
    /// and an absent key reads as `None`.
    pub fn get_is_new_user(&self) -> StorageResult<Option<bool>> {
        Ok(self
            .storage
            .get(StorageKeys::IS_NEW_USER)?
            .map(|raw| raw.trim() == "true"))
    }

    pub fn set_is_new_user(&self, is_new_user: bool) -> StorageResult<()> {
        self.storage.set(
            StorageKeys::IS_NEW_USER,
            if is_new_user { "true" } else { "false" },
        )
    }

    /// Persist a complete session: both tokens, then the new-user flag.
    pub fn store_session(
        &self,
        access: &str,
        refresh: &str,
        is_new_user: bool,
    ) -> StorageResult<()> {
        self.set_access_token(access)?;
        self.set_refresh_token(refresh)?;
        self.set_is_new_user(is_new_user)?;
        debug!(is_new_user, "Stored session");
        Ok(())
    }

    /// Remove every session key.
    pub fn clear_session(&self) -> StorageResult<()> {
        self.storage.delete_many(&StorageKeys::SESSION)?;
        debug!("Cleared stored session");
        Ok(())
    }
}
