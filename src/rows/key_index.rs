use super::SheetGrid;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyIndexError {
    #[error("Sheet is empty or missing headers")]
    HeaderMissing,
    #[error("Key column '{key_column}' not found in sheet headers: {headers:?}")]
    KeyColumnNotFound {
        key_column: String,
        headers: Vec<String>,
    },
}

/// Maps each key-column value to the 1-based row it was last seen on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIndex {
    rows: HashMap<String, u32>,
}

impl KeyIndex {
    /// Index `grid` by `key_column`, treating row 1 as the header row.
    ///
    /// Blank keys, keys equal to the header label and cells missing from short
    /// rows are skipped. Duplicate keys resolve to the last row.
    pub fn build(grid: &SheetGrid, key_column: &str) -> Result<Self, KeyIndexError> {
        let headers = match grid.first() {
            Some(headers) if !headers.is_empty() => headers,
            _ => return Err(KeyIndexError::HeaderMissing),
        };

        let column = headers.iter().position(|h| h == key_column).ok_or_else(|| {
            KeyIndexError::KeyColumnNotFound {
                key_column: key_column.to_string(),
                headers: headers.clone(),
            }
        })?;

        let mut rows = HashMap::new();
        for (row_number, row) in (2u32..).zip(grid.iter().skip(1)) {
            let Some(cell) = row.get(column) else {
                continue;
            };
            let key = cell.trim();
            if key.is_empty() || key == key_column {
                continue;
            }
            rows.insert(key.to_string(), row_number);
        }

        Ok(Self { rows })
    }

    pub fn row_for(&self, key: &str) -> Option<u32> {
        self.rows.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> SheetGrid {
        rows.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn later_duplicate_wins() {
        let sheet = grid(&[&["key", "value"], &["k", "2"], &["k", "5"]]);
        let index = KeyIndex::build(&sheet, "key").unwrap();
        assert_eq!(index.row_for("k"), Some(3));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let sheet = grid(&[&["id", "name"], &["1", "a"], &["2", "b"], &["3", "c"]]);
        let first = KeyIndex::build(&sheet, "id").unwrap();
        let second = KeyIndex::build(&sheet, "id").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.row_for("1"), Some(2));
        assert_eq!(first.row_for("3"), Some(4));
    }

    #[test]
    fn skips_blank_short_and_header_like_rows() {
        let sheet = grid(&[
            &["name", "id"],
            &["only-name"],
            &["blank", "   "],
            &["repeat", "id"],
            &["padded", "  42 "],
        ]);
        let index = KeyIndex::build(&sheet, "id").unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.row_for("42"), Some(6));
        assert_eq!(index.row_for("id"), None);
    }

    #[test]
    fn requires_headers() {
        assert_eq!(
            KeyIndex::build(&Vec::new(), "id"),
            Err(KeyIndexError::HeaderMissing)
        );
        assert_eq!(
            KeyIndex::build(&vec![Vec::new()], "id"),
            Err(KeyIndexError::HeaderMissing)
        );
    }

    #[test]
    fn key_column_must_match_exactly() {
        let sheet = grid(&[&["ID", "name"]]);
        let err = KeyIndex::build(&sheet, "id").unwrap_err();
        assert_eq!(
            err,
            KeyIndexError::KeyColumnNotFound {
                key_column: "id".to_string(),
                headers: vec!["ID".to_string(), "name".to_string()],
            }
        );
        assert!(err.to_string().contains("Key column 'id' not found"));
    }
}
