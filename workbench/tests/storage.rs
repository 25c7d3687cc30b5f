use std::{collections::HashMap, collections::HashSet, sync::Arc};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use workbench::storage::{
    JsonCollection, JsonCollectionConfig, Lifecycle, StorageManager, StoragesStatus,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Note {
    text: String,
    pinned: bool,
}

fn note(text: &str) -> Note {
    Note {
        text: text.to_string(),
        pinned: false,
    }
}

fn temp_working_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

fn config(dir: &TempDir, namespace: &str, workspace: Option<&str>) -> JsonCollectionConfig {
    JsonCollectionConfig {
        working_dir: dir.path().into(),
        namespace: namespace.to_string(),
        workspace: workspace.map(str::to_string),
    }
}

#[tokio::test]
async fn collection_roundtrip_delete_and_reload() -> anyhow::Result<()> {
    let dir = temp_working_dir();
    let config = config(&dir, "notes", None);

    let storage: JsonCollection<Note> = JsonCollection::new(config.clone());
    storage.initialize().await?;

    let mut records = HashMap::new();
    records.insert("note-1".to_string(), note("first"));
    records.insert("note-2".to_string(), note("second"));
    storage.upsert(records).await?;
    storage.sync_if_dirty().await?;

    assert_eq!(storage.get_by_id("note-1").await?, Some(note("first")));

    let mut keys = HashSet::new();
    keys.insert("note-1".to_string());
    keys.insert("missing".to_string());
    let unseen = storage.filter_keys(&keys).await?;
    assert!(unseen.contains("missing"));
    assert!(!unseen.contains("note-1"));

    let reopened: JsonCollection<Note> = JsonCollection::new(config.clone());
    reopened.initialize().await?;
    let all = reopened.get_all().await?;
    assert_eq!(all.len(), 2);
    assert!(all.contains_key("note-2"));

    assert_eq!(reopened.delete(&["note-1".to_string()]).await?, 1);
    reopened.sync_if_dirty().await?;
    assert!(reopened.get_by_id("note-1").await?.is_none());

    reopened.drop_all().await?;
    assert!(reopened.get_all().await?.is_empty());

    let after_drop: JsonCollection<Note> = JsonCollection::new(config);
    after_drop.initialize().await?;
    assert_eq!(after_drop.len().await, 0);

    Ok(())
}

#[tokio::test]
async fn workspace_gets_its_own_directory() -> anyhow::Result<()> {
    let dir = temp_working_dir();
    let storage: JsonCollection<Note> =
        JsonCollection::new(config(&dir, "notes", Some("team-a")));
    assert_eq!(storage.namespace(), "team-a_notes");

    storage.initialize().await?;
    storage.insert("note-1", note("scoped")).await?;
    storage.sync_if_dirty().await?;

    let file = dir.path().join("team-a").join("collection_notes.json");
    let contents = tokio::fs::read_to_string(&file).await?;
    assert!(contents.contains("scoped"));

    let shared: JsonCollection<Note> = JsonCollection::new(config(&dir, "notes", None));
    assert_eq!(shared.namespace(), "__notes");
    shared.initialize().await?;
    assert_eq!(shared.len().await, 0);

    Ok(())
}

#[tokio::test]
async fn empty_file_loads_as_empty_collection() -> anyhow::Result<()> {
    let dir = temp_working_dir();
    tokio::fs::write(dir.path().join("collection_notes.json"), "").await?;

    let storage: JsonCollection<Note> = JsonCollection::new(config(&dir, "notes", None));
    storage.initialize().await?;
    assert!(storage.get_all().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn modify_and_retain_mut_update_in_place() -> anyhow::Result<()> {
    let dir = temp_working_dir();
    let storage: JsonCollection<Note> = JsonCollection::new(config(&dir, "notes", None));
    storage.initialize().await?;
    storage.insert("note-1", note("keep")).await?;
    storage.insert("note-2", note("drop")).await?;

    let updated = storage
        .modify("note-1", |n| {
            n.pinned = true;
            Ok(())
        })
        .await?;
    assert_eq!(updated.map(|n| n.pinned), Some(true));
    assert!(storage.modify("missing", |_| Ok(())).await?.is_none());

    let failed = storage
        .modify("note-2", |_| anyhow::bail!("refused"))
        .await;
    assert!(failed.is_err());

    let removed = storage.retain_mut(|_, n| n.text != "drop").await?;
    assert_eq!(removed, 1);

    let pinned = storage.values_where(|n| n.pinned).await?;
    assert_eq!(pinned.len(), 1);
    Ok(())
}

#[tokio::test]
async fn manager_initializes_and_flushes_on_finalize() -> anyhow::Result<()> {
    let dir = temp_working_dir();
    let notes: Arc<JsonCollection<Note>> =
        Arc::new(JsonCollection::new(config(&dir, "notes", None)));
    let tags: Arc<JsonCollection<String>> =
        Arc::new(JsonCollection::new(config(&dir, "tags", None)));

    let mut manager = StorageManager::new();
    manager.register(notes.clone());
    manager.register(tags.clone());
    assert_eq!(manager.len(), 2);
    assert_eq!(manager.status(), StoragesStatus::Created);

    manager.initialize_all().await?;
    assert_eq!(manager.status(), StoragesStatus::Initialized);

    notes.insert("note-1", note("flushed on shutdown")).await?;
    tags.insert("tag-1", "rust".to_string()).await?;
    manager.finalize_all().await?;
    assert_eq!(manager.status(), StoragesStatus::Finalized);

    let reloaded: JsonCollection<String> = JsonCollection::new(config(&dir, "tags", None));
    reloaded.initialize().await?;
    assert_eq!(reloaded.get_by_id("tag-1").await?, Some("rust".to_string()));

    Ok(())
}
