use super::selector::RowSelector;
use serde::Serialize;

/// Half-open, zero-based row range `[start_index, end_index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowDeletion {
    pub start_index: u32,
    pub end_index: u32,
}

impl RowDeletion {
    pub fn for_row(row: u32) -> Self {
        Self {
            start_index: row.saturating_sub(1),
            end_index: row,
        }
    }

    /// The 1-based sheet row this deletion removes.
    pub fn row(&self) -> u32 {
        self.end_index
    }
}

/// Single-row deletions ordered from the bottom of the sheet upwards.
///
/// Removing a row shifts every row below it up by one, so deleting the highest
/// row first keeps the indices of all remaining targets valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionPlan {
    deletions: Vec<RowDeletion>,
}

impl DeletionPlan {
    pub fn for_selector(selector: &RowSelector) -> Self {
        Self {
            deletions: selector.descending().map(RowDeletion::for_row).collect(),
        }
    }

    pub fn deletions(&self) -> &[RowDeletion] {
        &self.deletions
    }

    pub fn len(&self) -> usize {
        self.deletions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty()
    }
}
