use std::{path::Path, sync::Arc};

use anyhow::Result;

use crate::{
    model::{
        Annotation, Column, Corpus, CorpusAction, CorpusQuery, Datacell, Document, Extract,
        ImportJob, LabelSet, Relation,
    },
    storage::{JsonCollection, JsonCollectionConfig, Record, StorageManager},
};

#[derive(Clone)]
pub struct Storages {
    pub corpuses: Arc<JsonCollection<Corpus>>,
    pub label_sets: Arc<JsonCollection<LabelSet>>,
    pub documents: Arc<JsonCollection<Document>>,
    pub document_texts: Arc<JsonCollection<String>>,
    pub annotations: Arc<JsonCollection<Annotation>>,
    pub relations: Arc<JsonCollection<Relation>>,
    pub extracts: Arc<JsonCollection<Extract>>,
    pub columns: Arc<JsonCollection<Column>>,
    pub datacells: Arc<JsonCollection<Datacell>>,
    pub corpus_actions: Arc<JsonCollection<CorpusAction>>,
    pub corpus_queries: Arc<JsonCollection<CorpusQuery>>,
    pub import_jobs: Arc<JsonCollection<ImportJob>>,
}

fn collection<T: Record>(
    working_dir: &Path,
    workspace: &Option<String>,
    namespace: &str,
) -> Arc<JsonCollection<T>> {
    Arc::new(JsonCollection::new(JsonCollectionConfig {
        working_dir: working_dir.to_path_buf(),
        namespace: namespace.into(),
        workspace: workspace.clone(),
    }))
}

impl Storages {
    pub fn new(working_dir: &Path, workspace: Option<String>) -> Self {
        Self {
            corpuses: collection(working_dir, &workspace, "corpuses"),
            label_sets: collection(working_dir, &workspace, "label_sets"),
            documents: collection(working_dir, &workspace, "documents"),
            document_texts: collection(working_dir, &workspace, "document_texts"),
            annotations: collection(working_dir, &workspace, "annotations"),
            relations: collection(working_dir, &workspace, "relations"),
            extracts: collection(working_dir, &workspace, "extracts"),
            columns: collection(working_dir, &workspace, "columns"),
            datacells: collection(working_dir, &workspace, "datacells"),
            corpus_actions: collection(working_dir, &workspace, "corpus_actions"),
            corpus_queries: collection(working_dir, &workspace, "corpus_queries"),
            import_jobs: collection(working_dir, &workspace, "import_jobs"),
        }
    }

    pub fn register_all(&self, manager: &mut StorageManager) {
        manager.register(self.corpuses.clone());
        manager.register(self.label_sets.clone());
        manager.register(self.documents.clone());
        manager.register(self.document_texts.clone());
        manager.register(self.annotations.clone());
        manager.register(self.relations.clone());
        manager.register(self.extracts.clone());
        manager.register(self.columns.clone());
        manager.register(self.datacells.clone());
        manager.register(self.corpus_actions.clone());
        manager.register(self.corpus_queries.clone());
        manager.register(self.import_jobs.clone());
    }

    pub async fn persist_all(&self) -> Result<()> {
        self.corpuses.sync_if_dirty().await?;
        self.label_sets.sync_if_dirty().await?;
        self.documents.sync_if_dirty().await?;
        self.document_texts.sync_if_dirty().await?;
        self.annotations.sync_if_dirty().await?;
        self.relations.sync_if_dirty().await?;
        self.extracts.sync_if_dirty().await?;
        self.columns.sync_if_dirty().await?;
        self.datacells.sync_if_dirty().await?;
        self.corpus_actions.sync_if_dirty().await?;
        self.corpus_queries.sync_if_dirty().await?;
        self.import_jobs.sync_if_dirty().await?;
        Ok(())
    }
}
