use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Pane {
    AnnotatedText,
    Relationships,
    Search,
    Data,
}

/// Everything pane visibility depends on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PaneInputs {
    pub viewing_extract: bool,
    pub has_annotations: bool,
    pub has_relations: bool,
    pub has_search_results: bool,
    pub can_annotate: bool,
}

pub fn derive_panes(inputs: &PaneInputs) -> Vec<Pane> {
    let mut panes = Vec::with_capacity(4);

    if !inputs.viewing_extract && (inputs.has_annotations || inputs.can_annotate) {
        panes.push(Pane::AnnotatedText);
    }
    if !inputs.viewing_extract && (inputs.has_relations || inputs.can_annotate) {
        panes.push(Pane::Relationships);
    }
    if inputs.has_search_results {
        panes.push(Pane::Search);
    }
    if inputs.viewing_extract {
        panes.push(Pane::Data);
    }

    panes
}

#[derive(Debug, Default, Clone, Serialize, TS, PartialEq, Eq)]
#[ts(export)]
pub struct PaneSet {
    pub panes: Vec<Pane>,
    pub active: usize,
}

impl PaneSet {
    pub fn recompute(&mut self, inputs: &PaneInputs) {
        let had_search = self.panes.contains(&Pane::Search);
        self.panes = derive_panes(inputs);

        let search_index = self.panes.iter().position(|pane| *pane == Pane::Search);
        match search_index {
            Some(index) if !had_search => self.active = index,
            _ if self.active >= self.panes.len() => self.active = 0,
            _ => {}
        }
    }

    /// Ignores indexes outside the current pane list.
    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.panes.len() {
            return false;
        }
        self.active = index;
        true
    }

    pub fn active_pane(&self) -> Option<Pane> {
        self.panes.get(self.active).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editable() -> PaneInputs {
        PaneInputs {
            can_annotate: true,
            ..Default::default()
        }
    }

    #[test]
    fn annotator_sees_text_and_relationship_panes() {
        assert_eq!(
            derive_panes(&editable()),
            vec![Pane::AnnotatedText, Pane::Relationships]
        );
    }

    #[test]
    fn read_only_viewer_needs_content() {
        let inputs = PaneInputs {
            has_annotations: true,
            ..Default::default()
        };
        assert_eq!(derive_panes(&inputs), vec![Pane::AnnotatedText]);
        assert!(derive_panes(&PaneInputs::default()).is_empty());
    }

    #[test]
    fn extract_view_shows_only_data() {
        let inputs = PaneInputs {
            viewing_extract: true,
            has_annotations: true,
            has_relations: true,
            can_annotate: true,
            ..Default::default()
        };
        assert_eq!(derive_panes(&inputs), vec![Pane::Data]);
    }

    #[test]
    fn search_results_activate_search_pane() {
        let mut set = PaneSet::default();
        set.recompute(&editable());
        assert_eq!(set.active, 0);

        let with_results = PaneInputs {
            has_search_results: true,
            ..editable()
        };
        set.recompute(&with_results);
        assert_eq!(set.active, 2);
        assert_eq!(set.active_pane(), Some(Pane::Search));

        // still present: user choice sticks
        assert!(set.set_active(1));
        set.recompute(&with_results);
        assert_eq!(set.active, 1);
    }

    #[test]
    fn shrinking_resets_out_of_range_active() {
        let mut set = PaneSet::default();
        set.recompute(&PaneInputs {
            has_search_results: true,
            ..editable()
        });
        assert_eq!(set.active, 2);

        set.recompute(&editable());
        assert_eq!(set.panes.len(), 2);
        assert_eq!(set.active, 0);
    }

    #[test]
    fn set_active_rejects_out_of_range() {
        let mut set = PaneSet::default();
        set.recompute(&editable());
        assert!(!set.set_active(5));
        assert_eq!(set.active, 0);
    }
}
