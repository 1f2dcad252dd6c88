//! Row addressing and reconciliation: everything that turns loosely shaped
//! request input into exact spreadsheet ranges, without touching the network.

pub mod address;
pub mod deletion;
pub mod key_index;
pub mod payload;
pub mod selector;
pub mod upsert;

pub use address::{A1Range, CellAddress, column_index, column_label, row_span, sheet_range};
pub use deletion::{DeletionPlan, RowDeletion};
pub use key_index::{KeyIndex, KeyIndexError};
pub use payload::{
    PayloadError, RawPayload, Record, ValueGrid, normalize_grid, normalize_objects,
    project_record,
};
pub use selector::{RowSelector, SelectorError};
pub use upsert::{RowUpdate, UpsertError, UpsertPlan, UpsertSummary, record_keys};

/// Sheet contents as read back from the backend; rows may be ragged.
pub type SheetGrid = Vec<Vec<String>>;
