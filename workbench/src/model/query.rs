use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A question asked of a whole corpus. The answer and the annotations it
/// cites are filled in by whatever worker picks the query up.
#[derive(Clone, Debug, Deserialize, TS, Serialize, PartialEq)]
#[ts(export)]
pub struct CorpusQuery {
    pub id: String,
    pub corpus_id: String,
    pub query: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub response: Option<String>,
    /// Annotations the response cites.
    #[serde(default)]
    pub source_ids: Vec<String>,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stacktrace: Option<String>,
}

impl CorpusQuery {
    pub fn pending(corpus_id: &str, query: &str, creator: &str) -> Self {
        Self {
            id: super::generate_id("query"),
            corpus_id: corpus_id.to_string(),
            query: query.to_string(),
            creator: creator.to_string(),
            response: None,
            source_ids: Vec::new(),
            created: Utc::now(),
            started: None,
            completed: None,
            failed: None,
            stacktrace: None,
        }
    }

    /// Waiting for a worker or being answered.
    pub fn is_loading(&self) -> bool {
        self.completed.is_none() && self.failed.is_none()
    }
}
