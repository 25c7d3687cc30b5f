use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::{ServiceError, Storages, local::CREATOR_PERMISSIONS};
use crate::model::{
    Annotation, Corpus, CorpusExport, ImportJob, ImportStatus, Relation, UploadPayload,
    compute_mdhash_id, generate_id,
};

const SUPPORTED_EXTENSIONS: &[&str] = &["json"];

pub const INTERRUPTED_IMPORT: &str = "server restarted before the import finished";

/// Runs corpus imports in the background and records their progress as [`ImportJob`]s.
#[derive(Clone)]
pub struct ImportRunner {
    storages: Arc<Storages>,
    processing_lock: Arc<Mutex<()>>,
}

pub fn sanitize_filename(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("filename cannot be empty"));
    }
    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return Err(anyhow!("invalid filename"));
    }
    Ok(trimmed.to_string())
}

pub fn is_supported_file(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

impl ImportRunner {
    pub fn new(storages: Arc<Storages>) -> Self {
        Self {
            storages,
            processing_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Fails jobs a previous run left pending or processing. Their upload bytes
    /// only lived in that process, so they can never finish.
    pub async fn recover_interrupted(&self) -> Result<usize> {
        let now = Utc::now();
        let mut recovered = Vec::new();
        self.storages
            .import_jobs
            .retain_mut(|id, job| {
                if matches!(job.status, ImportStatus::Pending | ImportStatus::Processing) {
                    job.status = ImportStatus::Failed;
                    job.error_msg = Some(INTERRUPTED_IMPORT.to_string());
                    job.updated_at = now;
                    recovered.push(id.to_string());
                }
                true
            })
            .await?;
        self.storages.import_jobs.sync_if_dirty().await?;

        for job_id in &recovered {
            warn!(job_id = %job_id, "import interrupted by restart, marked failed");
        }
        Ok(recovered.len())
    }

    /// Validates the upload, records a pending job and hands the bundle to a background task.
    pub async fn start(&self, upload: UploadPayload, actor: &str) -> Result<ImportJob> {
        let filename = sanitize_filename(&upload.filename)
            .map_err(|err| ServiceError::Invalid(err.to_string()))?;
        if !is_supported_file(&filename) {
            return Err(ServiceError::Invalid(format!("unsupported file type: {filename}")).into());
        }
        let bytes = STANDARD
            .decode(upload.base64_file.trim())
            .map_err(|err| ServiceError::Invalid(format!("upload is not valid base64: {err}")))?;

        let now = Utc::now();
        let job = ImportJob {
            id: generate_id("import"),
            filename,
            status: ImportStatus::Pending,
            corpus_id: None,
            error_msg: None,
            created_at: now,
            updated_at: now,
        };
        self.storages.import_jobs.insert(&job.id, job.clone()).await?;
        self.storages.import_jobs.sync_if_dirty().await?;
        info!(job_id = %job.id, filename = %job.filename, bytes = bytes.len(), "import enqueued");

        let runner = self.clone();
        let job_id = job.id.clone();
        let actor = actor.to_string();
        tokio::spawn(async move {
            runner.process(&job_id, &bytes, &actor).await;
        });

        Ok(job)
    }

    /// Imports one bundle; the outcome lands on the job record, never on the caller.
    pub async fn process(&self, job_id: &str, bytes: &[u8], actor: &str) {
        let _guard = self.processing_lock.lock().await;

        if let Err(err) = self.mark(job_id, ImportStatus::Processing, None, None).await {
            error!(error = %err, job_id = %job_id, "failed to mark import as processing");
            return;
        }

        match self.import_bundle(bytes, actor).await {
            Ok(corpus_id) => {
                info!(job_id = %job_id, corpus_id = %corpus_id, "import processed");
                if let Err(err) = self
                    .mark(job_id, ImportStatus::Processed, Some(corpus_id), None)
                    .await
                {
                    error!(error = %err, job_id = %job_id, "failed to mark import as processed");
                }
            }
            Err(err) => {
                error!(error = %err, job_id = %job_id, "failed to import corpus");
                for (depth, cause) in err.chain().skip(1).enumerate() {
                    error!(
                        job_id = %job_id,
                        cause_depth = depth + 1,
                        cause = %cause,
                        "caused by"
                    );
                }
                if let Err(status_err) = self
                    .mark(job_id, ImportStatus::Failed, None, Some(format!("{err:#}")))
                    .await
                {
                    error!(error = %status_err, job_id = %job_id, "failed to mark import as failed");
                }
            }
        }
    }

    async fn mark(
        &self,
        job_id: &str,
        status: ImportStatus,
        corpus_id: Option<String>,
        error_msg: Option<String>,
    ) -> Result<()> {
        self.storages
            .import_jobs
            .modify(job_id, |job| {
                job.status = status;
                if corpus_id.is_some() {
                    job.corpus_id = corpus_id;
                }
                job.error_msg = error_msg;
                job.updated_at = Utc::now();
                Ok(())
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("import job", job_id))?;
        self.storages.import_jobs.sync_if_dirty().await
    }

    async fn import_bundle(&self, bytes: &[u8], actor: &str) -> Result<String> {
        let bundle: CorpusExport =
            serde_json::from_slice(bytes).context("upload is not a corpus export")?;
        let CorpusExport {
            corpus: corpus_input,
            label_set,
            documents,
            annotations,
            relations,
        } = bundle;

        if corpus_input.title.trim().is_empty() {
            return Err(anyhow!("exported corpus has no title"));
        }

        let label_set_id = match label_set {
            Some(mut label_set) => {
                if label_set.id.is_empty() {
                    label_set.id = generate_id("labelset");
                }
                let id = label_set.id.clone();
                self.storages.label_sets.insert(&id, label_set).await?;
                Some(id)
            }
            None => corpus_input.label_set.clone(),
        };

        let now = Utc::now();

        // bundle document id -> stored document id
        let mut doc_ids: HashMap<String, String> = HashMap::new();
        let mut member_ids: Vec<String> = Vec::new();
        let mut pending = HashMap::new();
        let mut texts = HashMap::new();

        for exported in documents {
            let stored_id = if exported.content.is_empty() {
                generate_id("doc")
            } else {
                compute_mdhash_id(&exported.content, "doc-")
            };
            doc_ids.insert(exported.id.clone(), stored_id.clone());
            if member_ids.contains(&stored_id) {
                continue;
            }
            member_ids.push(stored_id.clone());
            texts.insert(stored_id.clone(), exported.content.clone());
            pending.insert(stored_id.clone(), exported.into_document(stored_id, now));
        }

        let candidates: HashSet<String> = pending.keys().cloned().collect();
        let new_ids = self.storages.documents.filter_keys(&candidates).await?;
        if new_ids.len() < candidates.len() {
            warn!(
                reused = candidates.len() - new_ids.len(),
                "bundle documents already stored, reusing them"
            );
        }
        pending.retain(|id, _| new_ids.contains(id));
        texts.retain(|id, _| new_ids.contains(id));
        self.storages.documents.upsert(pending).await?;
        self.storages.document_texts.upsert(texts).await?;

        let corpus = Corpus {
            id: generate_id("corpus"),
            title: corpus_input.title.trim().to_string(),
            description: corpus_input.description,
            label_set: label_set_id,
            creator: actor.to_string(),
            is_public: corpus_input.is_public,
            my_permissions: CREATOR_PERMISSIONS.to_vec(),
            document_ids: member_ids,
            created: now,
            modified: now,
            backend_lock: false,
            error: false,
        };

        // bundle annotation id -> stored annotation id
        let mut annotation_ids: HashMap<String, String> = HashMap::new();
        let mut annotation_payload: HashMap<String, Annotation> = HashMap::new();
        for annotation in annotations {
            let Some(document_id) = doc_ids.get(&annotation.document_id) else {
                warn!(annotation_id = %annotation.id, "annotation references unknown document");
                continue;
            };
            if annotation.structural && !new_ids.contains(document_id) {
                continue;
            }
            let id = generate_id("annotation");
            annotation_ids.insert(annotation.id.clone(), id.clone());
            annotation_payload.insert(
                id.clone(),
                Annotation {
                    id,
                    document_id: document_id.clone(),
                    corpus_id: (!annotation.structural).then(|| corpus.id.clone()),
                    ..annotation
                },
            );
        }

        let mut relation_payload: HashMap<String, Relation> = HashMap::new();
        for relation in relations {
            let Some(document_id) = doc_ids.get(&relation.document_id) else {
                warn!(relation_id = %relation.id, "relation references unknown document");
                continue;
            };
            let remap = |ids: &[String]| -> Vec<String> {
                ids.iter()
                    .filter_map(|id| annotation_ids.get(id).cloned())
                    .collect()
            };
            let remapped = Relation {
                id: generate_id("relation"),
                document_id: document_id.clone(),
                corpus_id: Some(corpus.id.clone()),
                source_ids: remap(&relation.source_ids),
                target_ids: remap(&relation.target_ids),
                ..relation
            };
            if remapped.is_empty() {
                warn!(relation_id = %relation.id, "relation has no importable members");
                continue;
            }
            relation_payload.insert(remapped.id.clone(), remapped);
        }

        let corpus_id = corpus.id.clone();
        info!(
            corpus_id = %corpus_id,
            documents = corpus.document_ids.len(),
            annotations = annotation_payload.len(),
            relations = relation_payload.len(),
            "writing imported corpus"
        );
        self.storages.annotations.upsert(annotation_payload).await?;
        self.storages.relations.upsert(relation_payload).await?;
        self.storages.corpuses.insert(&corpus_id, corpus).await?;
        self.storages
            .persist_all()
            .await
            .context("failed to persist imported corpus")?;

        Ok(corpus_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_rules() {
        assert!(sanitize_filename("  ").is_err());
        assert!(sanitize_filename("../corpus.json").is_err());
        assert_eq!(sanitize_filename(" corpus.json ").unwrap(), "corpus.json");
        assert!(is_supported_file("corpus.JSON"));
        assert!(!is_supported_file("corpus.zip"));
        assert!(!is_supported_file("corpus"));
    }
}
