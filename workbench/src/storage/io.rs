use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::StorageResult;

pub async fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    Ok(())
}

/// Reads a snapshot. Missing and zero-length files both yield the default.
pub async fn load_snapshot<T>(path: &Path) -> StorageResult<T>
where
    T: DeserializeOwned + Default,
{
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    if bytes.is_empty() {
        return Ok(T::default());
    }

    serde_json::from_slice::<T>(&bytes)
        .with_context(|| format!("corrupt snapshot at {}", path.display()))
}

/// Writes next to the target, fsyncs, then renames over it.
pub async fn persist_snapshot<T>(path: &Path, value: &T) -> StorageResult<()>
where
    T: Serialize,
{
    ensure_parent_dir(path).await?;

    let staging = staging_path(path);
    let json = serde_json::to_vec_pretty(value)?;

    let mut file = fs::File::create(&staging).await?;
    file.write_all(&json).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&staging, path)
        .await
        .with_context(|| format!("failed to move snapshot into {}", path.display()))?;
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| format!("{}.tmp", name.to_string_lossy()))
        .unwrap_or_else(|| "snapshot.json.tmp".to_string());
    path.with_file_name(name)
}
