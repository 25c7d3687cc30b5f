use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::{
    model::{CorpusInput, UploadPayload},
    state::WorkbenchState,
};

#[derive(Clone, Debug, Deserialize, TS, Serialize)]
#[ts(export)]
pub struct CreateCorpusRequest {
    pub actor: String,
    pub corpus: CorpusInput,
}

#[derive(Clone, Debug, Deserialize, TS, Serialize)]
#[ts(export)]
pub struct StartImportRequest {
    pub actor: String,
    pub upload: UploadPayload,
}

#[derive(Clone, Debug, Deserialize, TS, Serialize)]
#[ts(export)]
pub struct AskCorpusRequest {
    pub actor: String,
    pub query: String,
}

#[derive(Clone, Debug, Deserialize, TS, Serialize)]
#[ts(export)]
pub struct DocumentIdsRequest {
    pub document_ids: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, TS, Serialize)]
#[ts(export)]
pub struct AnnotationIdsRequest {
    pub annotation_ids: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, TS, Serialize)]
#[ts(export)]
pub struct ActorRequest {
    pub actor: String,
}

#[derive(Clone, Debug, Deserialize, TS, Serialize)]
#[ts(export)]
pub struct EditCellRequest {
    pub corrected_data: Value,
}

#[derive(Default, Clone, Debug, Deserialize, Serialize)]
pub struct CorpusListParams {
    #[serde(default)]
    pub text: Option<String>,
}

/// Query string for annotation listings; `analysis=__none__` selects manual annotations.
#[derive(Default, Clone, Debug, Deserialize, Serialize)]
pub struct AnnotationParams {
    #[serde(default)]
    pub corpus_id: Option<String>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub structural: Option<bool>,
}

#[derive(Default, Clone, Debug, Deserialize, Serialize)]
pub struct SearchParams {
    #[serde(default)]
    pub corpus_id: Option<String>,
    pub term: String,
}

#[derive(Clone, Debug, Deserialize, TS, Serialize)]
#[ts(export)]
pub struct OpenSessionRequest {
    pub viewer: String,
}

#[derive(Clone, Debug, Serialize, TS)]
#[ts(export)]
pub struct SessionResponse {
    pub session_id: String,
    pub state: WorkbenchState,
}

#[derive(Clone, Debug, Serialize, TS)]
#[ts(export)]
pub struct ScrollResponse {
    pub annotation_ids: Vec<String>,
}
