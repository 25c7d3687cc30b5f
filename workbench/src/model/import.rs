use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{Annotation, CorpusInput, Document, LabelSet, Relation};

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, TS, Eq, PartialEq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ImportStatus {
    #[default]
    Pending,
    Processing,
    Processed,
    Failed,
}

#[derive(Clone, Debug, Deserialize, TS, Serialize, PartialEq)]
#[ts(export)]
pub struct ImportJob {
    pub id: String,
    pub filename: String,
    pub status: ImportStatus,
    #[serde(default)]
    pub corpus_id: Option<String>,
    #[serde(default)]
    pub error_msg: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A file as submitted by the browser: name plus base64 body.
#[derive(Default, Clone, Debug, Deserialize, TS, Serialize)]
#[ts(export)]
pub struct UploadPayload {
    pub filename: String,
    pub base64_file: String,
}

/// Serialized corpus bundle accepted by the import job.
#[derive(Default, Clone, Debug, Deserialize, Serialize)]
pub struct CorpusExport {
    pub corpus: CorpusInput,
    #[serde(default)]
    pub label_set: Option<LabelSet>,
    #[serde(default)]
    pub documents: Vec<ExportedDocument>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

/// Documents in a bundle carry their text so ids can be derived from content.
#[derive(Default, Clone, Debug, Deserialize, Serialize)]
pub struct ExportedDocument {
    /// Id the bundle's annotations and relations refer to.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub page_count: u32,
}

impl ExportedDocument {
    pub fn into_document(self, id: String, created: DateTime<Utc>) -> Document {
        Document {
            id,
            title: self.title,
            description: self.description,
            metadata: self.metadata,
            page_count: self.page_count,
            created,
        }
    }
}
