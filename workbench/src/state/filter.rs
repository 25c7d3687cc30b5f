use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::model::Annotation;

#[derive(Default, Clone, Debug, Deserialize, Serialize, TS, PartialEq)]
#[ts(export)]
pub struct AnnotationFilters {
    pub show_structural: bool,
    /// Label ids to show. Empty means every label.
    pub label_filter: Vec<String>,
}

/// Visible annotations for the list pane, ordered by page.
pub fn filter_annotations(
    all: &[Annotation],
    show_structural: bool,
    label_filter: &[String],
) -> Vec<Annotation> {
    let mut visible: Vec<Annotation> = all
        .iter()
        .filter(|annotation| show_structural || !annotation.structural)
        .filter(|annotation| {
            label_filter.is_empty() || label_filter.iter().any(|id| *id == annotation.label.id)
        })
        .cloned()
        .collect();

    // stable: same-page annotations keep their loaded order
    visible.sort_by_key(|annotation| annotation.page);
    visible
}

impl AnnotationFilters {
    pub fn apply(&self, all: &[Annotation]) -> Vec<Annotation> {
        filter_annotations(all, self.show_structural, &self.label_filter)
    }
}
