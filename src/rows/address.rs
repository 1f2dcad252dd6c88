use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CellAddress {
    pub col: u32,
    pub row: u32,
}

impl CellAddress {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().replace('$', "");
        // Split into letters and numbers
        let split_idx = s.find(|c: char| c.is_ascii_digit())?;
        let (col_str, row_str) = s.split_at(split_idx);

        let row = row_str.parse::<u32>().ok().filter(|row| *row >= 1)?;
        let col = column_index(col_str)?;

        Some(Self { col, row })
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_label(self.col), self.row)
    }
}

impl Ord for CellAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        // Row-major ordering
        match self.row.cmp(&other.row) {
            Ordering::Equal => self.col.cmp(&other.col),
            ord => ord,
        }
    }
}

impl PartialOrd for CellAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Column letters to a 1-based index (`A` -> 1, `AA` -> 27).
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    Some(col)
}

/// 1-based column index to its letters (`1` -> `A`, `26` -> `Z`, `27` -> `AA`).
///
/// Column 0 has no label and renders as `A`.
pub fn column_label(col: u32) -> String {
    let mut n = col.max(1);
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Sheet name as it must appear in front of `!` in an A1 reference.
pub fn quote_sheet_name(sheet_name: &str) -> String {
    let plain = !sheet_name.is_empty()
        && sheet_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        sheet_name.to_string()
    } else {
        format!("'{}'", sheet_name.replace('\'', "''"))
    }
}

/// `Sheet!range`, or the bare sheet reference when `range` is blank.
pub fn sheet_range(sheet_name: &str, range: Option<&str>) -> String {
    let sheet = quote_sheet_name(sheet_name);
    match range.map(str::trim).filter(|r| !r.is_empty()) {
        Some(range) => format!("{sheet}!{range}"),
        None => sheet,
    }
}

/// Single-row span from column A through column `width` at `row`, e.g. `Sheet1!A2:C2`.
pub fn row_span(sheet_name: &str, row: u32, width: usize) -> String {
    let last = column_label(u32::try_from(width).unwrap_or(u32::MAX));
    format!("{}!A{row}:{last}{row}", quote_sheet_name(sheet_name))
}

/// A parsed sheet-qualified range: `Sheet1`, `Sheet1!B2`, `'My Sheet'!A1:C10`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet_name: String,
    pub start: Option<CellAddress>,
    pub end: Option<CellAddress>,
}

impl A1Range {
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (sheet_name, rest) = if let Some(quoted) = input.strip_prefix('\'') {
            let (name, tail) = split_quoted(quoted)?;
            match tail {
                "" => (name, None),
                tail => (name, Some(tail.strip_prefix('!')?)),
            }
        } else {
            match input.rsplit_once('!') {
                Some((name, cells)) => (name.to_string(), Some(cells)),
                None => (input.to_string(), None),
            }
        };

        if sheet_name.is_empty() {
            return None;
        }

        let Some(cells) = rest.map(str::trim).filter(|c| !c.is_empty()) else {
            return Some(Self {
                sheet_name,
                start: None,
                end: None,
            });
        };

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (CellAddress::parse(start)?, Some(CellAddress::parse(end)?)),
            None => (CellAddress::parse(cells)?, None),
        };

        Some(Self {
            sheet_name,
            start: Some(start),
            end,
        })
    }
}

fn split_quoted(quoted: &str) -> Option<(String, &str)> {
    let mut name = String::new();
    let mut chars = quoted.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                name.push('\'');
                continue;
            }
            return Some((name, &quoted[idx + 1..]));
        }
        name.push(ch);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let a1 = CellAddress::parse("A1").unwrap();
        let b1 = CellAddress::parse("B1").unwrap();
        let a2 = CellAddress::parse("A2").unwrap();
        let aa1 = CellAddress::parse("AA1").unwrap();

        assert!(a1 < b1);
        assert!(b1 < aa1); // B=2, AA=27
        assert!(aa1 < a2); // Row 1 < Row 2
    }

    #[test]
    fn column_labels_past_z() {
        assert_eq!(column_label(1), "A");
        assert_eq!(column_label(26), "Z");
        assert_eq!(column_label(27), "AA");
        assert_eq!(column_label(52), "AZ");
        assert_eq!(column_label(53), "BA");
        assert_eq!(column_label(702), "ZZ");
        assert_eq!(column_label(703), "AAA");
    }

    #[test]
    fn column_label_and_index_agree() {
        for col in 1..=2000 {
            assert_eq!(column_index(&column_label(col)), Some(col));
        }
    }

    #[test]
    fn row_span_covers_header_width() {
        assert_eq!(row_span("Sheet1", 2, 3), "Sheet1!A2:C2");
        assert_eq!(row_span("Sheet1", 9, 28), "Sheet1!A9:AB9");
        assert_eq!(row_span("Q3 Leads", 4, 1), "'Q3 Leads'!A4:A4");
    }

    #[test]
    fn sheet_names_are_quoted_when_needed() {
        assert_eq!(sheet_range("Sheet1", None), "Sheet1");
        assert_eq!(sheet_range("Sheet1", Some("  ")), "Sheet1");
        assert_eq!(sheet_range("Sheet1", Some(" A1:B2 ")), "Sheet1!A1:B2");
        assert_eq!(sheet_range("Bob's data", Some("A1")), "'Bob''s data'!A1");
    }

    #[test]
    fn parses_sheet_qualified_ranges() {
        let whole = A1Range::parse("Sheet1").unwrap();
        assert_eq!(whole.sheet_name, "Sheet1");
        assert!(whole.start.is_none());

        let boxed = A1Range::parse("'Bob''s data'!B2:$D$5").unwrap();
        assert_eq!(boxed.sheet_name, "Bob's data");
        assert_eq!(boxed.start, Some(CellAddress::new(2, 2)));
        assert_eq!(boxed.end, Some(CellAddress::new(4, 5)));

        let anchor = A1Range::parse("Sheet1!A1").unwrap();
        assert_eq!(anchor.start, Some(CellAddress::new(1, 1)));
        assert!(anchor.end.is_none());

        assert!(A1Range::parse("Sheet1!A0").is_none());
        assert!(A1Range::parse("'unterminated!A1").is_none());
    }
}
