use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::debug;

use super::Lifecycle;
use super::io::{ensure_parent_dir, load_snapshot, persist_snapshot};

/// Bound for anything kept in a [`JsonCollection`].
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Record for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

#[derive(Clone, Debug)]
pub struct JsonCollectionConfig {
    pub working_dir: PathBuf,
    pub namespace: String,
    pub workspace: Option<String>,
}

/// Id-keyed records held in memory and flushed to one JSON file.
pub struct JsonCollection<T: Record> {
    final_namespace: String,
    file_path: PathBuf,
    data: Arc<RwLock<HashMap<String, T>>>,
    dirty: AtomicBool,
}

impl<T: Record> JsonCollection<T> {
    pub fn new(config: JsonCollectionConfig) -> Self {
        let JsonCollectionConfig {
            working_dir,
            namespace,
            workspace,
        } = config;

        let (workspace_prefix, workspace_dir) = match workspace.as_deref() {
            Some(ws) if !ws.is_empty() => (ws.to_string(), working_dir.join(ws)),
            _ => ("_".to_string(), working_dir),
        };

        let final_namespace = format!("{workspace_prefix}_{namespace}");
        let file_path = workspace_dir.join(format!("collection_{namespace}.json"));

        Self {
            final_namespace,
            file_path,
            data: Arc::new(RwLock::new(HashMap::new())),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.final_namespace
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub async fn upsert(&self, records: HashMap<String, T>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut guard = self.data.write().await;
        guard.extend(records);
        drop(guard);
        self.mark_dirty();
        Ok(())
    }

    pub async fn insert(&self, id: &str, record: T) -> Result<()> {
        self.data.write().await.insert(id.to_string(), record);
        self.mark_dirty();
        Ok(())
    }

    /// Applies `f` to the record in place and returns the updated copy.
    pub async fn modify<F>(&self, id: &str, f: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        let mut guard = self.data.write().await;
        let Some(record) = guard.get_mut(id) else {
            return Ok(None);
        };
        f(record)?;
        let updated = record.clone();
        drop(guard);
        self.mark_dirty();
        Ok(Some(updated))
    }

    /// Applies `f` to every record, keeping the ones it returns `true` for.
    pub async fn retain_mut<F>(&self, mut f: F) -> Result<usize>
    where
        F: FnMut(&str, &mut T) -> bool,
    {
        let mut guard = self.data.write().await;
        let before = guard.len();
        guard.retain(|id, record| f(id.as_str(), record));
        let removed = before - guard.len();
        drop(guard);
        self.mark_dirty();
        Ok(removed)
    }

    pub async fn delete(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut guard = self.data.write().await;
        let removed = ids.iter().filter(|id| guard.remove(*id).is_some()).count();
        drop(guard);
        if removed > 0 {
            self.mark_dirty();
        }
        Ok(removed)
    }

    pub async fn drop_all(&self) -> Result<()> {
        {
            let mut guard = self.data.write().await;
            if guard.is_empty() {
                return Ok(());
            }
            guard.clear();
        }
        self.mark_dirty();
        self.sync_if_dirty().await
    }

    pub async fn get_all(&self) -> Result<HashMap<String, T>> {
        Ok(self.data.read().await.clone())
    }

    pub async fn values_where<F>(&self, predicate: F) -> Result<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        let guard = self.data.read().await;
        Ok(guard.values().filter(|v| predicate(v)).cloned().collect())
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<T>> {
        Ok(self.data.read().await.get(id).cloned())
    }

    pub async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Option<T>>> {
        let guard = self.data.read().await;
        Ok(ids.iter().map(|id| guard.get(id).cloned()).collect())
    }

    /// Returns the subset of `keys` not yet stored.
    pub async fn filter_keys(&self, keys: &HashSet<String>) -> Result<HashSet<String>> {
        let guard = self.data.read().await;
        Ok(keys
            .iter()
            .filter(|key| !guard.contains_key(*key))
            .cloned()
            .collect())
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn sync_if_dirty(&self) -> Result<()> {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let snapshot = {
            let guard = self.data.read().await;
            guard.clone()
        };

        debug!(namespace = %self.final_namespace, records = snapshot.len(), "flushing collection");
        persist_snapshot(&self.file_path, &snapshot)
            .await
            .with_context(|| format!("failed to write collection {}", self.final_namespace))
    }
}

#[async_trait]
impl<T: Record> Lifecycle for JsonCollection<T> {
    async fn initialize(&self) -> Result<()> {
        ensure_parent_dir(&self.file_path).await?;
        let data: HashMap<String, T> = load_snapshot(&self.file_path)
            .await
            .with_context(|| format!("failed to load collection {}", self.final_namespace))?;
        *self.data.write().await = data;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        self.sync_if_dirty().await
    }
}
