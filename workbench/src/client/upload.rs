use std::path::Path;

use anyhow::{Context, Result, anyhow};
use base64::{Engine, engine::general_purpose::STANDARD};
use tokio::fs;

use crate::model::UploadPayload;

/// Reads a local file into the `{ filename, base64_file }` upload shape.
pub async fn encode_upload(path: &Path) -> Result<UploadPayload> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?
        .to_string();
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("failed to read file {}", path.display()))?;

    Ok(UploadPayload {
        filename,
        base64_file: STANDARD.encode(bytes),
    })
}
