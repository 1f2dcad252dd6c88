use super::{
    AccessScope, BackendProvider, BatchRequest, SheetProperties, SheetsBackend, ValueInputOption,
    WriteOutcome,
};
use crate::errors::{BackendError, BackendErrorKind};
use crate::rows::address::quote_sheet_name;
use crate::rows::{A1Range, CellAddress, SheetGrid};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Every call the backend received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    GetMetadata {
        spreadsheet_id: String,
    },
    GetValues {
        spreadsheet_id: String,
        range: String,
    },
    UpdateValues {
        spreadsheet_id: String,
        range: String,
        values: Vec<Vec<Value>>,
        option: ValueInputOption,
    },
    AppendValues {
        spreadsheet_id: String,
        range: String,
        values: Vec<Vec<Value>>,
        option: ValueInputOption,
    },
    BatchUpdate {
        spreadsheet_id: String,
        requests: Vec<BatchRequest>,
    },
}

#[derive(Debug, Clone, Default)]
struct MemorySheet {
    sheet_id: i64,
    rows: SheetGrid,
}

#[derive(Debug, Default)]
struct MemoryState {
    spreadsheets: HashMap<String, IndexMap<String, MemorySheet>>,
    next_sheet_id: i64,
}

/// Spreadsheet store held in process memory, mirroring how the Sheets API
/// lays out, appends and deletes rows.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: RwLock<MemoryState>,
    calls: Mutex<Vec<BackendCall>>,
    failure: Option<(u16, String)>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a tab. Sheet ids are handed out in insertion order.
    pub fn with_sheet<I, R, S>(mut self, spreadsheet_id: &str, title: &str, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = self.state.get_mut();
        let sheet_id = state.next_sheet_id;
        state.next_sheet_id += 1;
        state
            .spreadsheets
            .entry(spreadsheet_id.to_string())
            .or_default()
            .insert(
                title.to_string(),
                MemorySheet {
                    sheet_id,
                    rows: rows
                        .into_iter()
                        .map(|row| row.into_iter().map(Into::into).collect())
                        .collect(),
                },
            );
        self
    }

    /// Make every call fail as if the API answered with `status`.
    pub fn failing(mut self, status: u16, message: impl Into<String>) -> Self {
        self.failure = Some((status, message.into()));
        self
    }

    pub fn sheet_rows(&self, spreadsheet_id: &str, title: &str) -> Option<SheetGrid> {
        let state = self.state.read();
        let sheet = state.spreadsheets.get(spreadsheet_id)?.get(title)?;
        Some(sheet.rows.clone())
    }

    pub fn sheet_id(&self, spreadsheet_id: &str, title: &str) -> Option<i64> {
        let state = self.state.read();
        Some(state.spreadsheets.get(spreadsheet_id)?.get(title)?.sheet_id)
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: BackendCall) -> Result<(), BackendError> {
        self.calls.lock().push(call);
        match &self.failure {
            Some((status, message)) => Err(BackendError::from_status(*status, message.clone())),
            None => Ok(()),
        }
    }
}

fn spreadsheet_missing() -> BackendError {
    BackendError::from_status(404, "Requested entity was not found.")
}

fn unparsable_range(range: &str) -> BackendError {
    BackendError::from_status(400, format!("Unable to parse range: {range}"))
}

fn resolve<'a>(
    sheets: &'a mut IndexMap<String, MemorySheet>,
    range: &str,
) -> Result<(&'a mut MemorySheet, A1Range), BackendError> {
    let parsed = A1Range::parse(range).ok_or_else(|| unparsable_range(range))?;
    let sheet = sheets
        .get_mut(&parsed.sheet_name)
        .ok_or_else(|| unparsable_range(range))?;
    Ok((sheet, parsed))
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn trim_trailing(rows: &mut SheetGrid) {
    for row in rows.iter_mut() {
        while row.last().is_some_and(String::is_empty) {
            row.pop();
        }
    }
    while rows.last().is_some_and(Vec::is_empty) {
        rows.pop();
    }
}

fn write_block(rows: &mut SheetGrid, origin: &CellAddress, values: &[Vec<Value>]) {
    let row0 = origin.row as usize - 1;
    let col0 = origin.col as usize - 1;
    for (r, cells) in values.iter().enumerate() {
        let target_row = row0 + r;
        if rows.len() <= target_row {
            rows.resize(target_row + 1, Vec::new());
        }
        let row = &mut rows[target_row];
        for (c, value) in cells.iter().enumerate() {
            let target_col = col0 + c;
            if row.len() <= target_col {
                row.resize(target_col + 1, String::new());
            }
            row[target_col] = render(value);
        }
    }
    trim_trailing(rows);
}

fn outcome(sheet_name: &str, origin: &CellAddress, values: &[Vec<Value>]) -> WriteOutcome {
    let width = values.iter().map(Vec::len).max().unwrap_or(0);
    let height = values.len();
    let end = CellAddress::new(
        origin.col + width.saturating_sub(1) as u32,
        origin.row + height.saturating_sub(1) as u32,
    );
    let updated_range = if width <= 1 && height <= 1 {
        format!("{}!{origin}", quote_sheet_name(sheet_name))
    } else {
        format!("{}!{origin}:{end}", quote_sheet_name(sheet_name))
    };
    WriteOutcome {
        updated_range,
        updated_rows: height,
        updated_columns: width,
    }
}

#[async_trait]
impl SheetsBackend for InMemoryBackend {
    async fn get_metadata(
        &self,
        spreadsheet_id: &str,
    ) -> Result<Vec<SheetProperties>, BackendError> {
        self.record(BackendCall::GetMetadata {
            spreadsheet_id: spreadsheet_id.to_string(),
        })?;
        let state = self.state.read();
        let sheets = state
            .spreadsheets
            .get(spreadsheet_id)
            .ok_or_else(spreadsheet_missing)?;
        Ok(sheets
            .iter()
            .enumerate()
            .map(|(index, (title, sheet))| SheetProperties {
                sheet_id: sheet.sheet_id,
                title: title.clone(),
                index: index as u32,
            })
            .collect())
    }

    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<SheetGrid, BackendError> {
        self.record(BackendCall::GetValues {
            spreadsheet_id: spreadsheet_id.to_string(),
            range: range.to_string(),
        })?;
        let mut state = self.state.write();
        let sheets = state
            .spreadsheets
            .get_mut(spreadsheet_id)
            .ok_or_else(spreadsheet_missing)?;
        let (sheet, parsed) = resolve(sheets, range)?;

        let Some(start) = parsed.start else {
            let mut rows = sheet.rows.clone();
            trim_trailing(&mut rows);
            return Ok(rows);
        };
        let end = parsed.end.unwrap_or_else(|| start.clone());
        let (col0, col1) = (start.col.min(end.col) as usize, start.col.max(end.col) as usize);
        let (row0, row1) = (start.row.min(end.row) as usize, start.row.max(end.row) as usize);

        let mut rows: SheetGrid = sheet
            .rows
            .iter()
            .skip(row0 - 1)
            .take(row1 - row0 + 1)
            .map(|row| {
                row.iter()
                    .skip(col0 - 1)
                    .take(col1 - col0 + 1)
                    .cloned()
                    .collect()
            })
            .collect();
        trim_trailing(&mut rows);
        Ok(rows)
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<Value>],
        option: ValueInputOption,
    ) -> Result<WriteOutcome, BackendError> {
        self.record(BackendCall::UpdateValues {
            spreadsheet_id: spreadsheet_id.to_string(),
            range: range.to_string(),
            values: values.to_vec(),
            option,
        })?;
        let mut state = self.state.write();
        let sheets = state
            .spreadsheets
            .get_mut(spreadsheet_id)
            .ok_or_else(spreadsheet_missing)?;
        let (sheet, parsed) = resolve(sheets, range)?;
        let origin = parsed.start.unwrap_or_else(|| CellAddress::new(1, 1));

        write_block(&mut sheet.rows, &origin, values);
        Ok(outcome(&parsed.sheet_name, &origin, values))
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<Value>],
        option: ValueInputOption,
    ) -> Result<WriteOutcome, BackendError> {
        self.record(BackendCall::AppendValues {
            spreadsheet_id: spreadsheet_id.to_string(),
            range: range.to_string(),
            values: values.to_vec(),
            option,
        })?;
        let mut state = self.state.write();
        let sheets = state
            .spreadsheets
            .get_mut(spreadsheet_id)
            .ok_or_else(spreadsheet_missing)?;
        let (sheet, parsed) = resolve(sheets, range)?;
        let col = parsed.start.map(|s| s.col).unwrap_or(1);

        trim_trailing(&mut sheet.rows);
        let next_row = sheet.rows.len() as u32 + 1;
        let origin = CellAddress::new(col, next_row);
        write_block(&mut sheet.rows, &origin, values);
        Ok(outcome(&parsed.sheet_name, &origin, values))
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: &[BatchRequest],
    ) -> Result<(), BackendError> {
        self.record(BackendCall::BatchUpdate {
            spreadsheet_id: spreadsheet_id.to_string(),
            requests: requests.to_vec(),
        })?;
        let mut state = self.state.write();
        let sheets = state
            .spreadsheets
            .get_mut(spreadsheet_id)
            .ok_or_else(spreadsheet_missing)?;

        // Validate the whole batch before applying any of it.
        for request in requests {
            let BatchRequest::DeleteDimension { range } = request;
            if !sheets.values().any(|s| s.sheet_id == range.sheet_id) {
                return Err(BackendError::from_status(
                    400,
                    format!("No grid with id: {}", range.sheet_id),
                ));
            }
        }
        for request in requests {
            let BatchRequest::DeleteDimension { range } = request;
            let Some(sheet) = sheets.values_mut().find(|s| s.sheet_id == range.sheet_id) else {
                continue;
            };
            let len = sheet.rows.len();
            let start = (range.start_index as usize).min(len);
            let end = (range.end_index as usize).min(len);
            sheet.rows.drain(start..end.max(start));
        }
        Ok(())
    }
}

/// Hands out the same in-memory backend for every request and remembers the
/// scopes it was asked for.
#[derive(Debug)]
pub struct InMemoryProvider {
    backend: Arc<InMemoryBackend>,
    scopes: Mutex<Vec<AccessScope>>,
    refusal: Option<String>,
}

impl InMemoryProvider {
    pub fn new(backend: Arc<InMemoryBackend>) -> Self {
        Self {
            backend,
            scopes: Mutex::new(Vec::new()),
            refusal: None,
        }
    }

    /// A provider whose credentials never work.
    pub fn refusing(message: impl Into<String>) -> Self {
        Self {
            refusal: Some(message.into()),
            ..Self::new(Arc::new(InMemoryBackend::new()))
        }
    }

    pub fn backend(&self) -> &Arc<InMemoryBackend> {
        &self.backend
    }

    pub fn scopes(&self) -> Vec<AccessScope> {
        self.scopes.lock().clone()
    }
}

#[async_trait]
impl BackendProvider for InMemoryProvider {
    async fn connect(&self, scope: AccessScope) -> Result<Arc<dyn SheetsBackend>, BackendError> {
        self.scopes.lock().push(scope);
        if let Some(message) = &self.refusal {
            return Err(BackendError::new(BackendErrorKind::Auth, message.clone()));
        }
        Ok(self.backend.clone())
    }
}
