use std::sync::Arc;

use tracing::info;

use super::{Lifecycle, StorageResult};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StoragesStatus {
    #[default]
    Created,
    Initialized,
    Finalized,
}

/// Initializes registered collections one at a time and flushes them on shutdown.
pub struct StorageManager {
    status: StoragesStatus,
    storages: Vec<Arc<dyn Lifecycle>>,
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageManager {
    pub fn new() -> Self {
        Self {
            status: StoragesStatus::Created,
            storages: Vec::new(),
        }
    }

    pub fn status(&self) -> StoragesStatus {
        self.status
    }

    pub fn register<T>(&mut self, storage: Arc<T>)
    where
        T: Lifecycle + 'static,
    {
        let storage: Arc<dyn Lifecycle> = storage;
        self.storages.push(storage);
    }

    pub fn len(&self) -> usize {
        self.storages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storages.is_empty()
    }

    pub async fn initialize_all(&mut self) -> StorageResult<()> {
        if self.status == StoragesStatus::Initialized {
            return Ok(());
        }

        for storage in &self.storages {
            storage.initialize().await?;
        }

        info!(count = self.storages.len(), "storages initialized");
        self.status = StoragesStatus::Initialized;
        Ok(())
    }

    pub async fn finalize_all(&mut self) -> StorageResult<()> {
        for storage in &self.storages {
            storage.finalize().await?;
        }
        self.status = StoragesStatus::Finalized;
        Ok(())
    }
}
