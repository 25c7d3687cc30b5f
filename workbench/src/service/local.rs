use std::{collections::HashSet, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    AnalysisFilter, AnnotationQuery, CorpusActionInput, CorpusMutations, CorpusQueries,
    DocumentFilter, ImportRunner, ServiceError, Storages,
};
use crate::model::{
    Annotation, Column, Corpus, CorpusAction, CorpusInput, CorpusPatch, CorpusQuery, CorpusStats,
    Datacell, Document, Extract, ImportJob, LabelSet, Permission, Relation, UploadPayload,
    generate_id,
};

/// Full permission list granted to a corpus creator.
pub const CREATOR_PERMISSIONS: [Permission; 6] = [
    Permission::Create,
    Permission::Read,
    Permission::Update,
    Permission::Remove,
    Permission::Publish,
    Permission::Permission,
];

/// Query and mutation interface over the JSON collections.
#[derive(Clone)]
pub struct LocalCorpusService {
    storages: Arc<Storages>,
    importer: ImportRunner,
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn normalized_term(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

impl LocalCorpusService {
    pub fn new(storages: Arc<Storages>) -> Self {
        let importer = ImportRunner::new(storages.clone());
        Self { storages, importer }
    }

    pub fn storages(&self) -> &Arc<Storages> {
        &self.storages
    }

    pub fn importer(&self) -> &ImportRunner {
        &self.importer
    }

    async fn require_corpus(&self, id: &str) -> Result<Corpus> {
        self.storages
            .corpuses
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("corpus", id).into())
    }

    async fn require_extract(&self, id: &str) -> Result<Extract> {
        self.storages
            .extracts
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("extract", id).into())
    }

    /// Cells are reviewable only once their extract finished without error.
    async fn reviewable_cell(&self, cell_id: &str) -> Result<Datacell> {
        let cell = self
            .storages
            .datacells
            .get_by_id(cell_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("datacell", cell_id))?;
        let extract = self.require_extract(&cell.extract_id).await?;
        if !extract.finished_cleanly() {
            return Err(ServiceError::Invalid(format!(
                "extract {} has not finished cleanly",
                extract.id
            ))
            .into());
        }
        Ok(cell)
    }

    async fn update_cell<F>(&self, cell_id: &str, f: F) -> Result<Datacell>
    where
        F: FnOnce(&mut Datacell) + Send,
    {
        self.reviewable_cell(cell_id).await?;
        let updated = self
            .storages
            .datacells
            .modify(cell_id, |cell| {
                f(cell);
                Ok(())
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("datacell", cell_id))?;
        self.storages.datacells.sync_if_dirty().await?;
        Ok(updated)
    }

    /// Strips annotation ids from every relation; relations left empty are deleted.
    async fn detach_from_relations(&self, annotation_ids: &[String]) -> Result<usize> {
        let mut dropped = 0usize;
        self.storages
            .relations
            .retain_mut(|_, relation| {
                relation.strip(annotation_ids);
                if relation.is_empty() {
                    dropped += 1;
                    false
                } else {
                    true
                }
            })
            .await?;
        Ok(dropped)
    }
}

#[async_trait]
impl CorpusQueries for LocalCorpusService {
    async fn corpuses(&self, text: Option<&str>) -> Result<Vec<Corpus>> {
        let term = normalized_term(text);
        let mut corpuses = self
            .storages
            .corpuses
            .values_where(|corpus| match &term {
                Some(term) => contains_ci(&corpus.title, term) || contains_ci(&corpus.description, term),
                None => true,
            })
            .await?;
        corpuses.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        Ok(corpuses)
    }

    async fn corpus(&self, id: &str) -> Result<Corpus> {
        self.require_corpus(id).await
    }

    async fn corpus_stats(&self, id: &str) -> Result<CorpusStats> {
        let corpus = self.require_corpus(id).await?;
        let in_corpus = |corpus_id: &Option<String>| corpus_id.as_deref() == Some(id);

        let total_annotations = self
            .storages
            .annotations
            .values_where(|a| in_corpus(&a.corpus_id))
            .await?
            .len();
        let total_relations = self
            .storages
            .relations
            .values_where(|r| in_corpus(&r.corpus_id))
            .await?
            .len();
        let total_extracts = self
            .storages
            .extracts
            .values_where(|e| in_corpus(&e.corpus_id))
            .await?
            .len();

        Ok(CorpusStats {
            total_docs: corpus.document_ids.len(),
            total_annotations,
            total_relations,
            total_extracts,
        })
    }

    async fn label_set(&self, id: &str) -> Result<LabelSet> {
        self.storages
            .label_sets
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("label set", id).into())
    }

    async fn documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
        let members: Option<HashSet<String>> = match &filter.corpus_id {
            Some(corpus_id) => {
                let corpus = self.require_corpus(corpus_id).await?;
                Some(corpus.document_ids.into_iter().collect())
            }
            None => None,
        };

        let mut with_label: Option<HashSet<String>> = None;
        if let Some(label_id) = &filter.label_id {
            let docs = self
                .storages
                .annotations
                .values_where(|a| {
                    a.label.id == *label_id
                        && filter
                            .corpus_id
                            .as_ref()
                            .is_none_or(|corpus_id| a.corpus_id.as_ref() == Some(corpus_id))
                })
                .await?
                .into_iter()
                .map(|a| a.document_id)
                .collect();
            with_label = Some(docs);
        }

        let mut with_annotation: Option<HashSet<String>> = None;
        if let Some(annotation_id) = &filter.annotation_id {
            let docs = self
                .storages
                .annotations
                .get_by_id(annotation_id)
                .await?
                .map(|a| a.document_id)
                .into_iter()
                .collect();
            with_annotation = Some(docs);
        }

        let term = normalized_term(filter.text.as_deref());
        let in_set = |set: &Option<HashSet<String>>, id: &str| {
            set.as_ref().is_none_or(|set| set.contains(id))
        };

        let mut documents = self
            .storages
            .documents
            .values_where(|doc| {
                in_set(&members, &doc.id)
                    && in_set(&with_label, &doc.id)
                    && in_set(&with_annotation, &doc.id)
                    && term.as_ref().is_none_or(|term| {
                        contains_ci(&doc.title, term) || contains_ci(&doc.description, term)
                    })
            })
            .await?;
        documents.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        debug!(count = documents.len(), "documents listed");
        Ok(documents)
    }

    async fn annotations(&self, query: &AnnotationQuery) -> Result<Vec<Annotation>> {
        let mut annotations = self
            .storages
            .annotations
            .values_where(|a| {
                a.document_id == query.document_id
                    && (a.structural
                        || query
                            .corpus_id
                            .as_ref()
                            .is_none_or(|corpus_id| a.corpus_id.as_ref() == Some(corpus_id)))
                    && query.analysis.matches(a.analysis_id.as_deref())
                    && query.structural.is_none_or(|structural| a.structural == structural)
            })
            .await?;
        annotations.sort_by(|a, b| a.page.cmp(&b.page).then_with(|| a.id.cmp(&b.id)));
        Ok(annotations)
    }

    async fn relations(
        &self,
        document_id: &str,
        corpus_id: Option<&str>,
        analysis: &AnalysisFilter,
    ) -> Result<Vec<Relation>> {
        let mut relations = self
            .storages
            .relations
            .values_where(|r| {
                r.document_id == document_id
                    && corpus_id.is_none_or(|corpus_id| r.corpus_id.as_deref() == Some(corpus_id))
                    && analysis.matches(r.analysis_id.as_deref())
            })
            .await?;
        relations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(relations)
    }

    async fn search_annotations(
        &self,
        document_id: &str,
        corpus_id: Option<&str>,
        term: &str,
    ) -> Result<Vec<Annotation>> {
        let Some(term) = normalized_term(Some(term)) else {
            return Ok(Vec::new());
        };
        let mut hits = self
            .annotations(&AnnotationQuery::for_document(document_id, corpus_id))
            .await?;
        hits.retain(|a| contains_ci(&a.raw_text, &term));
        Ok(hits)
    }

    async fn extract(&self, id: &str) -> Result<Extract> {
        self.require_extract(id).await
    }

    async fn extract_columns(&self, extract_id: &str) -> Result<Vec<Column>> {
        let extract = self.require_extract(extract_id).await?;
        let columns = self.storages.columns.get_by_ids(&extract.column_ids).await?;
        Ok(columns.into_iter().flatten().collect())
    }

    async fn extract_cells(&self, extract_id: &str) -> Result<Vec<Datacell>> {
        self.require_extract(extract_id).await?;
        let mut cells = self
            .storages
            .datacells
            .values_where(|cell| cell.extract_id == extract_id)
            .await?;
        cells.sort_by(|a, b| {
            a.document_id
                .cmp(&b.document_id)
                .then_with(|| a.column_id.cmp(&b.column_id))
        });
        Ok(cells)
    }

    async fn corpus_actions(&self, corpus_id: &str) -> Result<Vec<CorpusAction>> {
        let mut actions = self
            .storages
            .corpus_actions
            .values_where(|action| action.corpus_id == corpus_id)
            .await?;
        actions.sort_by(|a, b| a.created.cmp(&b.created));
        Ok(actions)
    }

    async fn import_job(&self, id: &str) -> Result<ImportJob> {
        self.storages
            .import_jobs
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("import job", id).into())
    }

    async fn corpus_queries(&self, corpus_id: &str) -> Result<Vec<CorpusQuery>> {
        self.require_corpus(corpus_id).await?;
        let mut queries = self
            .storages
            .corpus_queries
            .values_where(|query| query.corpus_id == corpus_id)
            .await?;
        queries.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        Ok(queries)
    }

    async fn corpus_query(&self, id: &str) -> Result<CorpusQuery> {
        self.storages
            .corpus_queries
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("corpus query", id).into())
    }

    async fn corpus_query_sources(&self, id: &str) -> Result<Vec<Annotation>> {
        let query = self.corpus_query(id).await?;
        let sources = self.storages.annotations.get_by_ids(&query.source_ids).await?;
        let found: Vec<Annotation> = sources.into_iter().flatten().collect();
        if found.len() < query.source_ids.len() {
            debug!(
                query_id = %id,
                missing = query.source_ids.len() - found.len(),
                "query cites deleted annotations"
            );
        }
        Ok(found)
    }
}

#[async_trait]
impl CorpusMutations for LocalCorpusService {
    async fn create_corpus(&self, input: CorpusInput, actor: &str) -> Result<Corpus> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(ServiceError::Invalid("corpus title cannot be empty".into()).into());
        }
        if let Some(label_set) = &input.label_set {
            self.label_set(label_set).await?;
        }

        let now = Utc::now();
        let corpus = Corpus {
            id: generate_id("corpus"),
            title: title.to_string(),
            description: input.description,
            label_set: input.label_set,
            creator: actor.to_string(),
            is_public: input.is_public,
            my_permissions: CREATOR_PERMISSIONS.to_vec(),
            document_ids: Vec::new(),
            created: now,
            modified: now,
            backend_lock: false,
            error: false,
        };

        self.storages.corpuses.insert(&corpus.id, corpus.clone()).await?;
        self.storages.corpuses.sync_if_dirty().await?;
        info!(corpus_id = %corpus.id, title = %corpus.title, "corpus created");
        Ok(corpus)
    }

    async fn update_corpus(&self, id: &str, patch: CorpusPatch) -> Result<Corpus> {
        if let Some(label_set) = &patch.label_set {
            self.label_set(label_set).await?;
        }

        let updated = self
            .storages
            .corpuses
            .modify(id, |corpus| {
                if let Some(title) = patch.title {
                    let title = title.trim();
                    if title.is_empty() {
                        return Err(
                            ServiceError::Invalid("corpus title cannot be empty".into()).into()
                        );
                    }
                    corpus.title = title.to_string();
                }
                if let Some(description) = patch.description {
                    corpus.description = description;
                }
                if let Some(label_set) = patch.label_set {
                    corpus.label_set = Some(label_set);
                }
                if let Some(is_public) = patch.is_public {
                    corpus.is_public = is_public;
                }
                corpus.touch();
                Ok(())
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("corpus", id))?;

        self.storages.corpuses.sync_if_dirty().await?;
        info!(corpus_id = %id, "corpus updated");
        Ok(updated)
    }

    async fn delete_corpus(&self, id: &str) -> Result<()> {
        let removed = self.storages.corpuses.delete(&[id.to_string()]).await?;
        if removed == 0 {
            return Err(ServiceError::not_found("corpus", id).into());
        }

        let owned = |corpus_id: &Option<String>| corpus_id.as_deref() == Some(id);
        let annotations = self
            .storages
            .annotations
            .retain_mut(|_, a| !owned(&a.corpus_id))
            .await?;
        let relations = self
            .storages
            .relations
            .retain_mut(|_, r| !owned(&r.corpus_id))
            .await?;
        self.storages
            .corpus_actions
            .retain_mut(|_, action| action.corpus_id != id)
            .await?;
        let queries = self
            .storages
            .corpus_queries
            .retain_mut(|_, query| query.corpus_id != id)
            .await?;

        self.storages.persist_all().await?;
        info!(corpus_id = %id, annotations, relations, queries, "corpus deleted");
        Ok(())
    }

    async fn remove_documents_from_corpus(
        &self,
        corpus_id: &str,
        document_ids: &[String],
    ) -> Result<Corpus> {
        let updated = self
            .storages
            .corpuses
            .modify(corpus_id, |corpus| {
                corpus.document_ids.retain(|id| !document_ids.contains(id));
                corpus.touch();
                Ok(())
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("corpus", corpus_id))?;

        self.storages.corpuses.sync_if_dirty().await?;
        info!(corpus_id = %corpus_id, removed = document_ids.len(), "documents removed from corpus");
        Ok(updated)
    }

    async fn start_corpus_import(&self, upload: UploadPayload, actor: &str) -> Result<ImportJob> {
        self.importer.start(upload, actor).await
    }

    async fn edit_datacell(&self, cell_id: &str, corrected: Value) -> Result<Datacell> {
        let cell = self
            .update_cell(cell_id, move |cell| cell.corrected_data = Some(corrected))
            .await?;
        info!(cell_id = %cell_id, "datacell corrected");
        Ok(cell)
    }

    async fn approve_datacell(&self, cell_id: &str, actor: &str) -> Result<Datacell> {
        let actor = actor.to_string();
        let cell = self
            .update_cell(cell_id, move |cell| {
                cell.approved_by = Some(actor);
                cell.rejected_by = None;
            })
            .await?;
        info!(cell_id = %cell_id, "datacell approved");
        Ok(cell)
    }

    async fn reject_datacell(&self, cell_id: &str, actor: &str) -> Result<Datacell> {
        let actor = actor.to_string();
        let cell = self
            .update_cell(cell_id, move |cell| {
                cell.rejected_by = Some(actor);
                cell.approved_by = None;
            })
            .await?;
        info!(cell_id = %cell_id, "datacell rejected");
        Ok(cell)
    }

    async fn delete_annotation(&self, id: &str) -> Result<()> {
        let ids = [id.to_string()];
        let removed = self.storages.annotations.delete(&ids).await?;
        if removed == 0 {
            return Err(ServiceError::not_found("annotation", id).into());
        }

        let dropped = self.detach_from_relations(&ids).await?;
        self.storages
            .persist_all()
            .await
            .context("failed to persist annotation delete")?;
        info!(annotation_id = %id, dropped_relations = dropped, "annotation deleted");
        Ok(())
    }

    async fn delete_relation(&self, id: &str) -> Result<()> {
        let removed = self.storages.relations.delete(&[id.to_string()]).await?;
        if removed == 0 {
            return Err(ServiceError::not_found("relation", id).into());
        }
        self.storages.relations.sync_if_dirty().await?;
        info!(relation_id = %id, "relation deleted");
        Ok(())
    }

    async fn remove_annotations_from_relation(
        &self,
        relation_id: &str,
        annotation_ids: &[String],
    ) -> Result<Option<Relation>> {
        let updated = self
            .storages
            .relations
            .modify(relation_id, |relation| {
                if !relation.strip(annotation_ids) {
                    warn!(relation_id = %relation.id, "none of the annotations were in the relation");
                }
                Ok(())
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("relation", relation_id))?;

        let result = if updated.is_empty() {
            self.storages
                .relations
                .delete(&[relation_id.to_string()])
                .await?;
            info!(relation_id = %relation_id, "relation emptied and deleted");
            None
        } else {
            Some(updated)
        };

        self.storages.relations.sync_if_dirty().await?;
        Ok(result)
    }

    async fn create_corpus_action(&self, input: CorpusActionInput) -> Result<CorpusAction> {
        self.require_corpus(&input.corpus_id).await?;
        let action = CorpusAction::new(
            input.corpus_id,
            input.trigger,
            input.fieldset_id,
            input.analyzer_id,
        )
        .map_err(|err| ServiceError::Invalid(err.to_string()))?;

        self.storages
            .corpus_actions
            .insert(&action.id, action.clone())
            .await?;
        self.storages.corpus_actions.sync_if_dirty().await?;
        info!(action_id = %action.id, corpus_id = %action.corpus_id, "corpus action created");
        Ok(action)
    }

    async fn create_corpus_query(
        &self,
        corpus_id: &str,
        query: &str,
        actor: &str,
    ) -> Result<CorpusQuery> {
        let text = query.trim();
        if text.is_empty() {
            return Err(ServiceError::Invalid("query cannot be empty".into()).into());
        }
        self.require_corpus(corpus_id).await?;

        let query = CorpusQuery::pending(corpus_id, text, actor);
        self.storages
            .corpus_queries
            .insert(&query.id, query.clone())
            .await?;
        self.storages.corpus_queries.sync_if_dirty().await?;
        info!(query_id = %query.id, corpus_id = %corpus_id, "corpus query recorded");
        Ok(query)
    }
}
