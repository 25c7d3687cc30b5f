use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

#[derive(Default, Clone, Debug, Deserialize, TS, Serialize, PartialEq)]
#[ts(export)]
pub struct Extract {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub corpus_id: Option<String>,
    #[serde(default)]
    pub column_ids: Vec<String>,
    #[serde(default)]
    pub document_ids: Vec<String>,
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Extract {
    pub fn is_running(&self) -> bool {
        self.started.is_some() && self.finished.is_none() && self.error.is_none()
    }

    /// Cells can only be reviewed once the whole job is done and clean.
    pub fn finished_cleanly(&self) -> bool {
        self.finished.is_some() && self.error.is_none()
    }
}

#[derive(Default, Clone, Debug, Deserialize, TS, Serialize, PartialEq)]
#[ts(export)]
pub struct Column {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub output_type: String,
    #[serde(default)]
    pub is_list: bool,
}

#[derive(Default, Clone, Debug, Deserialize, TS, Serialize, PartialEq)]
#[ts(export)]
pub struct Datacell {
    pub id: String,
    pub extract_id: String,
    pub document_id: String,
    pub column_id: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub corrected_data: Option<Value>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub rejected_by: Option<String>,
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stacktrace: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn column_list_flag_uses_short_name() {
        let column: Column = serde_json::from_value(json!({
            "id": "col-1",
            "name": "Parties",
            "is_list": true
        }))
        .unwrap();
        assert!(column.is_list);

        let value = serde_json::to_value(&column).unwrap();
        assert_eq!(value["is_list"], json!(true));
        assert!(value.get("extract_is_list").is_none());
    }
}
