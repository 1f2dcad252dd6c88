use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Most rows one selector may name, across all of its tokens; matches the
/// Sheets grid limit.
pub const MAX_SELECTOR_ROWS: u32 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("Row numbers string is empty")]
    EmptyInput,
    #[error("Invalid range format: {token}. Use format like '5-10'")]
    InvalidRangeFormat { token: String },
    #[error("Invalid row number: {token}. Must be an integer >= 1")]
    InvalidRowNumber { token: String },
}

/// Deduplicated set of 1-based row numbers, iterated in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RowSelector(BTreeSet<u32>);

impl RowSelector {
    /// Parse selectors such as `5`, `5-10` or `5,7,10-12`.
    pub fn parse(expr: &str) -> Result<Self, SelectorError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(SelectorError::EmptyInput);
        }

        let mut rows = BTreeSet::new();
        for token in expr.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token.contains('-') {
                let (start, end) = parse_span(token)?;
                let span = (end - start) as usize + 1;
                if rows.len() + span > MAX_SELECTOR_ROWS as usize {
                    return Err(SelectorError::InvalidRangeFormat {
                        token: token.to_string(),
                    });
                }
                rows.extend(start..=end);
            } else {
                rows.insert(parse_row(token)?);
            }
        }

        Self::from_rows(rows)
    }

    pub fn from_rows(rows: impl IntoIterator<Item = u32>) -> Result<Self, SelectorError> {
        let rows: BTreeSet<u32> = rows.into_iter().collect();
        if rows.contains(&0) {
            return Err(SelectorError::InvalidRowNumber {
                token: "0".to_string(),
            });
        }
        if rows.is_empty() {
            return Err(SelectorError::EmptyInput);
        }
        Ok(Self(rows))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ascending(&self) -> impl DoubleEndedIterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn descending(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().rev().copied()
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.ascending().collect()
    }
}

impl FromStr for RowSelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RowSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<String> = self.ascending().map(|row| row.to_string()).collect();
        f.write_str(&rows.join(","))
    }
}

fn parse_row(token: &str) -> Result<u32, SelectorError> {
    token
        .parse::<u32>()
        .ok()
        .filter(|row| *row >= 1)
        .ok_or_else(|| SelectorError::InvalidRowNumber {
            token: token.to_string(),
        })
}

fn parse_span(token: &str) -> Result<(u32, u32), SelectorError> {
    let malformed = || SelectorError::InvalidRangeFormat {
        token: token.to_string(),
    };

    if token.matches('-').count() != 1 {
        return Err(malformed());
    }
    let (start, end) = token.split_once('-').ok_or_else(malformed)?;
    let start = start.trim().parse::<u64>().map_err(|_| malformed())?;
    let end = end.trim().parse::<u64>().map_err(|_| malformed())?;

    let mut bounds = [0u32; 2];
    for (slot, bound) in bounds.iter_mut().zip([start, end]) {
        *slot = u32::try_from(bound)
            .ok()
            .filter(|row| *row >= 1)
            .ok_or_else(|| SelectorError::InvalidRowNumber {
                token: bound.to_string(),
            })?;
    }
    let [start, end] = bounds;
    if start > end || end - start >= MAX_SELECTOR_ROWS {
        return Err(malformed());
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_single_rows_and_ranges() {
        assert_eq!(RowSelector::parse("5").unwrap().to_vec(), vec![5]);
        assert_eq!(
            RowSelector::parse("5-10").unwrap().to_vec(),
            vec![5, 6, 7, 8, 9, 10]
        );
        assert_eq!(
            RowSelector::parse("5,7,10-12").unwrap().to_vec(),
            vec![5, 7, 10, 11, 12]
        );
    }

    #[test]
    fn output_is_sorted_and_deduplicated() {
        assert_eq!(RowSelector::parse("3,1,2").unwrap().to_vec(), vec![1, 2, 3]);
        assert_eq!(
            RowSelector::parse("1-3,2-4").unwrap().to_vec(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(RowSelector::parse("4,4,4").unwrap().len(), 1);
    }

    #[test]
    fn tolerates_whitespace_and_empty_tokens() {
        assert_eq!(
            RowSelector::parse("  2 , 4 - 6 ,, 9, ").unwrap().to_vec(),
            vec![2, 4, 5, 6, 9]
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(RowSelector::parse(""), Err(SelectorError::EmptyInput));
        assert_eq!(RowSelector::parse("   "), Err(SelectorError::EmptyInput));
        assert_eq!(RowSelector::parse(",,,"), Err(SelectorError::EmptyInput));
    }

    #[test]
    fn rejects_bad_row_numbers() {
        assert_matches!(
            RowSelector::parse("0"),
            Err(SelectorError::InvalidRowNumber { .. })
        );
        assert_matches!(
            RowSelector::parse("abc"),
            Err(SelectorError::InvalidRowNumber { .. })
        );
        assert_matches!(
            RowSelector::parse("0-3"),
            Err(SelectorError::InvalidRowNumber { .. })
        );
        assert_matches!(
            RowSelector::parse("1,2.5"),
            Err(SelectorError::InvalidRowNumber { .. })
        );
    }

    #[test]
    fn rejects_malformed_ranges() {
        for expr in ["5-3", "a-b", "1-2-3", "-4", "7-", "1--2"] {
            assert_matches!(
                RowSelector::parse(expr),
                Err(SelectorError::InvalidRangeFormat { .. }),
                "expected range format error for {expr:?}"
            );
        }
    }

    #[test]
    fn rejects_ranges_wider_than_a_sheet() {
        assert_matches!(
            RowSelector::parse("1-4000000000"),
            Err(SelectorError::InvalidRangeFormat { .. })
        );
    }

    #[test]
    fn adjacent_ranges_share_one_row_budget() {
        assert_matches!(
            RowSelector::parse("1-9999999,10000000-19999999,20000000-29999999"),
            Err(SelectorError::InvalidRangeFormat { token }) if token == "10000000-19999999"
        );
        assert_matches!(
            RowSelector::parse("1-5000000,5000001-10000001"),
            Err(SelectorError::InvalidRangeFormat { .. })
        );
    }

    #[test]
    fn descending_reverses_ascending() {
        let selector = RowSelector::parse("2,5,7").unwrap();
        assert_eq!(selector.descending().collect::<Vec<_>>(), vec![7, 5, 2]);
        assert_eq!(selector.to_string(), "2,5,7");
    }
}
