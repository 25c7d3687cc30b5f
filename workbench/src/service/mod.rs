use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use ts_rs::TS;

use crate::model::{
    Annotation, Column, Corpus, CorpusAction, CorpusActionTrigger, CorpusInput, CorpusPatch,
    CorpusQuery, CorpusStats, Datacell, Document, Extract, ImportJob, LabelSet, Relation,
    UploadPayload,
};

pub mod import;
pub mod local;
pub mod storages;

pub use import::ImportRunner;
pub use local::LocalCorpusService;
pub use storages::Storages;

/// Analysis parameter meaning "manual annotations only".
pub const MANUAL_ONLY_ANALYSIS: &str = "__none__";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid request: {0}")]
    Invalid(String),
}

impl ServiceError {
    pub fn not_found(kind: &'static str, id: &str) -> Self {
        ServiceError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

#[derive(Default, Clone, Debug, Deserialize, Serialize, TS, PartialEq)]
#[ts(export)]
pub struct DocumentFilter {
    #[serde(default)]
    pub corpus_id: Option<String>,
    #[serde(default)]
    pub label_id: Option<String>,
    /// Documents carrying this (metadata) annotation.
    #[serde(default)]
    pub annotation_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub enum AnalysisFilter {
    #[default]
    Any,
    ManualOnly,
    Analysis(String),
}

impl AnalysisFilter {
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            None | Some("") => AnalysisFilter::Any,
            Some(MANUAL_ONLY_ANALYSIS) => AnalysisFilter::ManualOnly,
            Some(id) => AnalysisFilter::Analysis(id.to_string()),
        }
    }

    pub fn as_param(&self) -> Option<&str> {
        match self {
            AnalysisFilter::Any => None,
            AnalysisFilter::ManualOnly => Some(MANUAL_ONLY_ANALYSIS),
            AnalysisFilter::Analysis(id) => Some(id),
        }
    }

    pub fn matches(&self, analysis_id: Option<&str>) -> bool {
        match self {
            AnalysisFilter::Any => true,
            AnalysisFilter::ManualOnly => analysis_id.is_none(),
            AnalysisFilter::Analysis(id) => analysis_id == Some(id.as_str()),
        }
    }
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct AnnotationQuery {
    pub document_id: String,
    pub corpus_id: Option<String>,
    pub analysis: AnalysisFilter,
    pub structural: Option<bool>,
}

impl AnnotationQuery {
    pub fn for_document(document_id: &str, corpus_id: Option<&str>) -> Self {
        Self {
            document_id: document_id.to_string(),
            corpus_id: corpus_id.map(str::to_string),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, TS, PartialEq)]
#[ts(export)]
pub struct CorpusActionInput {
    pub corpus_id: String,
    pub trigger: CorpusActionTrigger,
    #[serde(default)]
    pub fieldset_id: Option<String>,
    #[serde(default)]
    pub analyzer_id: Option<String>,
}

#[async_trait]
pub trait CorpusQueries: Send + Sync {
    async fn corpuses(&self, text: Option<&str>) -> Result<Vec<Corpus>>;
    async fn corpus(&self, id: &str) -> Result<Corpus>;
    async fn corpus_stats(&self, id: &str) -> Result<CorpusStats>;
    async fn label_set(&self, id: &str) -> Result<LabelSet>;

    async fn documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>>;

    async fn annotations(&self, query: &AnnotationQuery) -> Result<Vec<Annotation>>;
    async fn relations(
        &self,
        document_id: &str,
        corpus_id: Option<&str>,
        analysis: &AnalysisFilter,
    ) -> Result<Vec<Relation>>;
    async fn search_annotations(
        &self,
        document_id: &str,
        corpus_id: Option<&str>,
        term: &str,
    ) -> Result<Vec<Annotation>>;

    async fn extract(&self, id: &str) -> Result<Extract>;
    async fn extract_columns(&self, extract_id: &str) -> Result<Vec<Column>>;
    async fn extract_cells(&self, extract_id: &str) -> Result<Vec<Datacell>>;

    async fn corpus_actions(&self, corpus_id: &str) -> Result<Vec<CorpusAction>>;
    async fn import_job(&self, id: &str) -> Result<ImportJob>;

    /// Queries asked of a corpus, oldest first.
    async fn corpus_queries(&self, corpus_id: &str) -> Result<Vec<CorpusQuery>>;
    async fn corpus_query(&self, id: &str) -> Result<CorpusQuery>;
    /// Annotations a query's response cites, skipping ones deleted since.
    async fn corpus_query_sources(&self, id: &str) -> Result<Vec<Annotation>>;
}

#[async_trait]
pub trait CorpusMutations: Send + Sync {
    async fn create_corpus(&self, input: CorpusInput, actor: &str) -> Result<Corpus>;
    async fn update_corpus(&self, id: &str, patch: CorpusPatch) -> Result<Corpus>;
    async fn delete_corpus(&self, id: &str) -> Result<()>;
    async fn remove_documents_from_corpus(
        &self,
        corpus_id: &str,
        document_ids: &[String],
    ) -> Result<Corpus>;
    async fn start_corpus_import(&self, upload: UploadPayload, actor: &str) -> Result<ImportJob>;

    async fn edit_datacell(&self, cell_id: &str, corrected: Value) -> Result<Datacell>;
    async fn approve_datacell(&self, cell_id: &str, actor: &str) -> Result<Datacell>;
    async fn reject_datacell(&self, cell_id: &str, actor: &str) -> Result<Datacell>;

    async fn delete_annotation(&self, id: &str) -> Result<()>;
    async fn delete_relation(&self, id: &str) -> Result<()>;
    /// Returns the relation, or `None` when it lost its last member and was deleted.
    async fn remove_annotations_from_relation(
        &self,
        relation_id: &str,
        annotation_ids: &[String],
    ) -> Result<Option<Relation>>;

    async fn create_corpus_action(&self, input: CorpusActionInput) -> Result<CorpusAction>;
    /// Records a question against a corpus; it starts out pending.
    async fn create_corpus_query(
        &self,
        corpus_id: &str,
        query: &str,
        actor: &str,
    ) -> Result<CorpusQuery>;
}

/// Everything a workbench needs from the data side.
pub trait CorpusBackend: CorpusQueries + CorpusMutations {}

impl<T> CorpusBackend for T where T: CorpusQueries + CorpusMutations {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_param_round_trip() {
        assert_eq!(AnalysisFilter::from_param(None), AnalysisFilter::Any);
        assert_eq!(
            AnalysisFilter::from_param(Some("__none__")),
            AnalysisFilter::ManualOnly
        );
        let filter = AnalysisFilter::from_param(Some("analysis-1"));
        assert_eq!(filter.as_param(), Some("analysis-1"));
        assert!(filter.matches(Some("analysis-1")));
        assert!(!filter.matches(None));
        assert!(AnalysisFilter::ManualOnly.matches(None));
    }
}
