use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Permission {
    Create,
    Read,
    Update,
    Remove,
    Publish,
    Permission,
}

#[derive(Default, Clone, Debug, Deserialize, TS, Serialize, PartialEq)]
#[ts(export)]
pub struct Corpus {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub label_set: Option<String>,
    pub creator: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub my_permissions: Vec<Permission>,
    #[serde(default)]
    pub document_ids: Vec<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub backend_lock: bool,
    #[serde(default)]
    pub error: bool,
}

impl Corpus {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.my_permissions.contains(&permission)
    }

    /// Viewer may add annotations: the corpus has a label set and grants update.
    pub fn can_annotate(&self) -> bool {
        self.label_set.is_some() && self.has_permission(Permission::Update)
    }

    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }
}

#[derive(Default, Clone, Debug, Deserialize, TS, Serialize)]
#[ts(export)]
pub struct CorpusInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub label_set: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Default, Clone, Debug, Deserialize, TS, Serialize)]
#[ts(export)]
pub struct CorpusPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub label_set: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

#[derive(Default, Clone, Debug, Deserialize, TS, Serialize, PartialEq, Eq)]
#[ts(export)]
pub struct CorpusStats {
    pub total_docs: usize,
    pub total_annotations: usize,
    pub total_relations: usize,
    pub total_extracts: usize,
}

#[derive(Default, Clone, Debug, Deserialize, TS, Serialize, PartialEq)]
#[ts(export)]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub page_count: u32,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CorpusActionTrigger {
    AddDocument,
    EditDocument,
}

/// Work to run automatically when a corpus changes. Runs exactly one of a
/// fieldset (extract) or an analyzer.
#[derive(Clone, Debug, Deserialize, TS, Serialize, PartialEq)]
#[ts(export)]
pub struct CorpusAction {
    pub id: String,
    pub corpus_id: String,
    pub trigger: CorpusActionTrigger,
    pub fieldset_id: Option<String>,
    pub analyzer_id: Option<String>,
    pub created: DateTime<Utc>,
}

impl CorpusAction {
    pub fn new(
        corpus_id: String,
        trigger: CorpusActionTrigger,
        fieldset_id: Option<String>,
        analyzer_id: Option<String>,
    ) -> Result<Self> {
        let action = Self {
            id: super::generate_id("action"),
            corpus_id,
            trigger,
            fieldset_id,
            analyzer_id,
            created: Utc::now(),
        };
        action.validate()?;
        Ok(action)
    }

    pub fn validate(&self) -> Result<()> {
        match (&self.fieldset_id, &self.analyzer_id) {
            (Some(_), Some(_)) => bail!("only one of fieldset or analyzer can be set"),
            (None, None) => bail!("either fieldset or analyzer must be set"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_annotate_requires_label_set_and_update() {
        let mut corpus = Corpus {
            my_permissions: vec![Permission::Read, Permission::Update],
            ..Default::default()
        };
        assert!(!corpus.can_annotate());

        corpus.label_set = Some("labelset-1".into());
        assert!(corpus.can_annotate());

        corpus.my_permissions = vec![Permission::Read];
        assert!(!corpus.can_annotate());
    }

    #[test]
    fn corpus_action_needs_exactly_one_target() {
        let both = CorpusAction::new(
            "corpus-1".into(),
            CorpusActionTrigger::AddDocument,
            Some("fieldset-1".into()),
            Some("analyzer-1".into()),
        );
        assert!(both.is_err());

        let neither =
            CorpusAction::new("corpus-1".into(), CorpusActionTrigger::EditDocument, None, None);
        assert!(neither.is_err());

        let ok = CorpusAction::new(
            "corpus-1".into(),
            CorpusActionTrigger::AddDocument,
            None,
            Some("analyzer-1".into()),
        );
        assert!(ok.is_ok());
    }
}
