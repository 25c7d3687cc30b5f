use std::{collections::HashSet, sync::Arc};

use serde::Serialize;
use ts_rs::TS;

use crate::model::Relation;

#[derive(Default, Clone, Debug, Serialize, TS, PartialEq)]
#[ts(export)]
pub struct Selection {
    pub annotations: Vec<String>,
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    Selected(String),
    Deselected(String),
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty() && self.relations.is_empty()
    }

    pub fn is_selected(&self, annotation_id: &str) -> bool {
        self.annotations.iter().any(|id| id == annotation_id)
    }

    /// Removes `id` when selected, otherwise makes it the only selection.
    pub fn toggle_annotation(&mut self, id: &str) -> SelectionChange {
        if self.is_selected(id) {
            self.annotations.retain(|selected| selected != id);
            SelectionChange::Deselected(id.to_string())
        } else {
            self.annotations = vec![id.to_string()];
            SelectionChange::Selected(id.to_string())
        }
    }

    /// Selecting a relation replaces both sets; toggling it again clears them.
    pub fn toggle_relation(&mut self, relation: &Relation, member_ids: Vec<String>) -> bool {
        if self.relations.iter().any(|r| r.id == relation.id) {
            self.relations.retain(|r| r.id != relation.id);
            self.annotations.clear();
            false
        } else {
            self.relations = vec![relation.clone()];
            self.annotations = member_ids;
            true
        }
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
        self.relations.clear();
    }

    /// Reconciles the selection with freshly loaded data.
    ///
    /// Selected relations are swapped for their reloaded copies and, while one
    /// is still selected, the annotation selection is exactly its members.
    /// When every selected relation is gone the selection is cleared.
    /// Otherwise ids that are no longer loaded are dropped.
    pub fn retain_loaded(&mut self, annotation_ids: &HashSet<&str>, relations: &[Relation]) {
        let had_relation = !self.relations.is_empty();
        self.relations = self
            .relations
            .iter()
            .filter_map(|selected| relations.iter().find(|r| r.id == selected.id).cloned())
            .collect();

        if had_relation {
            self.annotations = self.relations.iter().flat_map(Relation::member_ids).collect();
        }
        self.annotations
            .retain(|id| annotation_ids.contains(id.as_str()));
    }
}

pub trait Viewport: Send + Sync {
    fn scroll_into_view(&self, annotation_id: &str);
}

/// Viewport for headless use.
pub struct NoopViewport;

impl Viewport for NoopViewport {
    fn scroll_into_view(&self, _annotation_id: &str) {}
}

/// Annotation ids that currently have a rendered element.
pub struct ElementRefs {
    registered: HashSet<String>,
    viewport: Arc<dyn Viewport>,
}

impl ElementRefs {
    pub fn new(viewport: Arc<dyn Viewport>) -> Self {
        Self {
            registered: HashSet::new(),
            viewport,
        }
    }

    pub fn register(&mut self, annotation_id: &str) {
        self.registered.insert(annotation_id.to_string());
    }

    pub fn unregister(&mut self, annotation_id: &str) {
        self.registered.remove(annotation_id);
    }

    pub fn clear(&mut self) {
        self.registered.clear();
    }

    pub fn is_registered(&self, annotation_id: &str) -> bool {
        self.registered.contains(annotation_id)
    }

    /// Scrolls to `annotation_id` if it has an element. Returns whether it did.
    pub fn scroll_to(&self, annotation_id: &str) -> bool {
        if !self.is_registered(annotation_id) {
            return false;
        }
        self.viewport.scroll_into_view(annotation_id);
        true
    }
}
