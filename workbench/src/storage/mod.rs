use anyhow::Result;
use async_trait::async_trait;

pub mod collection;
pub mod io;
pub mod manager;

pub use collection::{JsonCollection, JsonCollectionConfig, Record};
pub use manager::{StorageManager, StoragesStatus};

pub type StorageResult<T> = Result<T>;

#[async_trait]
pub trait Lifecycle: Send + Sync {
    async fn initialize(&self) -> StorageResult<()>;

    /// Flush dirty state to disk.
    async fn finalize(&self) -> StorageResult<()>;
}
