use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::model::{Column, CorpusQuery, Datacell, Extract};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ProcessingState {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ReviewState {
    Unreviewed,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CorrectionState {
    Uncorrected,
    Corrected,
}

/// The three independent lifecycles of one cell.
#[derive(Debug, Clone, Copy, Serialize, TS, PartialEq, Eq)]
#[ts(export)]
pub struct CellState {
    pub processing: ProcessingState,
    pub review: ReviewState,
    pub correction: CorrectionState,
}

impl ProcessingState {
    /// Failure wins over completion, completion over a start.
    pub fn from_marks<T>(started: &Option<T>, completed: &Option<T>, failed: &Option<T>) -> Self {
        if failed.is_some() {
            ProcessingState::Failed
        } else if completed.is_some() {
            ProcessingState::Completed
        } else if started.is_some() {
            ProcessingState::Running
        } else {
            ProcessingState::Pending
        }
    }

    pub fn of_query(query: &CorpusQuery) -> Self {
        Self::from_marks(&query.started, &query.completed, &query.failed)
    }
}

impl CellState {
    pub fn of(cell: &Datacell) -> Self {
        let processing = ProcessingState::from_marks(&cell.started, &cell.completed, &cell.failed);

        let review = match (&cell.approved_by, &cell.rejected_by) {
            (Some(_), _) => ReviewState::Approved,
            (None, Some(_)) => ReviewState::Rejected,
            (None, None) => ReviewState::Unreviewed,
        };

        let correction = if cell.corrected_data.is_some() {
            CorrectionState::Corrected
        } else {
            CorrectionState::Uncorrected
        };

        Self {
            processing,
            review,
            correction,
        }
    }
}

/// A cell is loading while it runs, or while its job runs and it has not
/// been picked up yet.
pub fn is_loading(cell: &Datacell, extract: &Extract) -> bool {
    let cell_running = cell.started.is_some() && cell.completed.is_none() && cell.failed.is_none();
    let waiting_turn = extract.is_running() && cell.started.is_none();
    cell_running || waiting_turn
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellEdit {
    Correct(Value),
    Approve,
    Reject,
}

impl CellEdit {
    pub fn verb(&self) -> &'static str {
        match self {
            CellEdit::Correct(_) => "edit",
            CellEdit::Approve => "approve",
            CellEdit::Reject => "reject",
        }
    }
}

#[derive(Default, Clone, Debug, Serialize, TS, PartialEq)]
#[ts(export)]
pub struct ExtractGrid {
    pub extract: Extract,
    pub columns: Vec<Column>,
    pub cells: Vec<Datacell>,
}

impl ExtractGrid {
    pub fn new(extract: Extract, columns: Vec<Column>, cells: Vec<Datacell>) -> Self {
        Self {
            extract,
            columns,
            cells,
        }
    }

    pub fn cell(&self, cell_id: &str) -> Option<&Datacell> {
        self.cells.iter().find(|cell| cell.id == cell_id)
    }

    pub fn cell_at(&self, document_id: &str, column_id: &str) -> Option<&Datacell> {
        self.cells
            .iter()
            .find(|cell| cell.document_id == document_id && cell.column_id == column_id)
    }

    pub fn is_cell_loading(&self, cell: &Datacell) -> bool {
        is_loading(cell, &self.extract)
    }

    pub fn loading_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| self.is_cell_loading(cell))
            .count()
    }

    /// Reason the edit is refused locally, if any.
    pub fn edit_blocked(&self, cell_id: &str, edit: &CellEdit) -> Option<String> {
        if self.extract.error.is_some() {
            return Some(format!(
                "cannot {} cell: extract {} failed",
                edit.verb(),
                self.extract.name
            ));
        }
        if self.extract.finished.is_none() {
            return Some(format!(
                "cannot {} cell until extract {} has finished",
                edit.verb(),
                self.extract.name
            ));
        }
        if self.cell(cell_id).is_none() {
            return Some(format!("cell {cell_id} is not part of this extract"));
        }
        None
    }

    /// Swaps in the server's copy. Returns false when the id is unknown.
    pub fn replace_cell(&mut self, updated: Datacell) -> bool {
        match self.cells.iter_mut().find(|cell| cell.id == updated.id) {
            Some(cell) => {
                *cell = updated;
                true
            }
            None => false,
        }
    }
}
