use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum LabelType {
    #[default]
    TokenLabel,
    SpanLabel,
    DocTypeLabel,
    RelationshipLabel,
    MetadataLabel,
}

#[derive(Default, Clone, Debug, Deserialize, TS, Serialize, PartialEq)]
#[ts(export)]
pub struct AnnotationLabel {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub label_type: LabelType,
}

#[derive(Default, Clone, Debug, Deserialize, TS, Serialize, PartialEq)]
#[ts(export)]
pub struct LabelSet {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub labels: Vec<AnnotationLabel>,
}

#[derive(Default, Clone, Debug, Deserialize, TS, Serialize, PartialEq)]
#[ts(export)]
pub struct LabelRef {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

impl From<&AnnotationLabel> for LabelRef {
    fn from(label: &AnnotationLabel) -> Self {
        Self {
            id: label.id.clone(),
            text: label.text.clone(),
        }
    }
}

#[derive(Default, Clone, Debug, Deserialize, TS, Serialize, PartialEq)]
#[ts(export)]
pub struct Annotation {
    pub id: String,
    pub document_id: String,
    /// Structural annotations belong to the document, not to a corpus.
    #[serde(default)]
    pub corpus_id: Option<String>,
    #[serde(default)]
    pub analysis_id: Option<String>,
    pub page: u32,
    pub label: LabelRef,
    #[serde(default)]
    pub structural: bool,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub json: Value,
}

#[derive(Default, Clone, Debug, Deserialize, TS, Serialize, PartialEq)]
#[ts(export)]
pub struct Relation {
    pub id: String,
    pub document_id: String,
    #[serde(default)]
    pub corpus_id: Option<String>,
    #[serde(default)]
    pub analysis_id: Option<String>,
    pub label: LabelRef,
    #[serde(default)]
    pub source_ids: Vec<String>,
    #[serde(default)]
    pub target_ids: Vec<String>,
}

impl Relation {
    /// Source ids followed by target ids. Overlapping ids are kept twice.
    pub fn member_ids(&self) -> Vec<String> {
        self.source_ids
            .iter()
            .chain(self.target_ids.iter())
            .cloned()
            .collect()
    }

    pub fn involves(&self, annotation_id: &str) -> bool {
        self.source_ids.iter().any(|id| id == annotation_id)
            || self.target_ids.iter().any(|id| id == annotation_id)
    }

    pub fn is_empty(&self) -> bool {
        self.source_ids.is_empty() && self.target_ids.is_empty()
    }

    /// Drops every occurrence of the given ids from both ends.
    pub fn strip(&mut self, annotation_ids: &[String]) -> bool {
        let before = self.source_ids.len() + self.target_ids.len();
        self.source_ids.retain(|id| !annotation_ids.contains(id));
        self.target_ids.retain(|id| !annotation_ids.contains(id));
        before != self.source_ids.len() + self.target_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(source: &[&str], target: &[&str]) -> Relation {
        Relation {
            id: "relation-1".into(),
            source_ids: source.iter().map(|s| s.to_string()).collect(),
            target_ids: target.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn member_ids_keep_order_and_duplicates() {
        let rel = relation(&["a", "b"], &["b", "c"]);
        assert_eq!(rel.member_ids(), vec!["a", "b", "b", "c"]);
    }

    #[test]
    fn strip_removes_from_both_ends() {
        let mut rel = relation(&["a", "b"], &["b"]);
        assert!(rel.strip(&["b".to_string()]));
        assert_eq!(rel.member_ids(), vec!["a"]);
        assert!(!rel.strip(&["zzz".to_string()]));
        assert!(rel.strip(&["a".to_string()]));
        assert!(rel.is_empty());
    }
}
