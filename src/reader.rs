//! Tab-separated table reader.
//!
//! Simulation output files start with a header row naming the columns
//! (value and error columns alternate, error columns usually have an
//! empty label) followed by rows of floats. A blank line ends the data.

use crate::error::{StatError, StatResult};
use std::fs;
use std::path::Path;

/// Header labels plus fixed-width numeric rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Non-empty header labels, in order.
    pub labels: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    /// Number of columns per row (0 for an empty table).
    pub fn width(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Number of complete value/error column pairs.
    pub fn pair_count(&self) -> usize {
        self.width() / 2
    }

    /// Copy one column out of the rows.
    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[idx]).collect()
    }

    /// Label of the column pair at `idx`, or a positional fallback.
    pub fn pair_label(&self, idx: usize) -> String {
        self.labels
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("col{}", idx))
    }
}

/// Read and parse a table file.
pub fn read_table(path: &Path) -> StatResult<Table> {
    let content = fs::read_to_string(path).map_err(|source| StatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_table(&content, &path.display().to_string())
}

/// Parse table text. `origin` names the source in error messages.
pub fn parse_table(content: &str, origin: &str) -> StatResult<Table> {
    let mut lines = content.lines();

    let header = lines
        .next()
        .ok_or_else(|| StatError::parse(origin, "missing header line"))?;
    let labels: Vec<String> = header
        .split('\t')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(String::from)
        .collect();

    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (offset, line) in lines.enumerate() {
        // line 1 is the header
        let line_no = offset + 2;
        if line.trim().is_empty() {
            break;
        }

        let mut tokens: Vec<&str> = line.split('\t').collect();
        if tokens.last().map(|t| t.trim().is_empty()).unwrap_or(false) {
            tokens.pop();
        }

        let row = tokens
            .iter()
            .map(|token| {
                token.trim().parse::<f64>().map_err(|e| {
                    StatError::parse(
                        format!("{}:{}", origin, line_no),
                        format!("'{}': {}", token.trim(), e),
                    )
                })
            })
            .collect::<StatResult<Vec<f64>>>()?;

        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(StatError::parse(
                    format!("{}:{}", origin, line_no),
                    format!("expected {} columns, found {}", first.len(), row.len()),
                ));
            }
        }
        rows.push(row);
    }

    Ok(Table {
        labels,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paired_table() {
        let text = "MR_h_lower_hc\t\tMR_h_upper_hc\t\n1.5\t0.1\t2.5\t0.2\n1.0\t0.1\t2.0\t0.2\n";
        let table = parse_table(text, "MR_tw=100.txt").unwrap();

        assert_eq!(table.labels, vec!["MR_h_lower_hc", "MR_h_upper_hc"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.width(), 4);
        assert_eq!(table.pair_count(), 2);
        assert_eq!(table.column(2), vec![2.5, 2.0]);
        assert_eq!(table.pair_label(1), "MR_h_upper_hc");
        assert_eq!(table.pair_label(3), "col3");
    }

    #[test]
    fn test_trailing_tab_is_dropped() {
        let table = parse_table("a\t\n1\t2\t\n", "t.txt").unwrap();
        assert_eq!(table.rows, vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn test_stops_at_blank_line() {
        let text = "a\t\n1\t2\n   \n3\t4\n";
        let table = parse_table(text, "t.txt").unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_non_numeric_token_is_parse_failure() {
        let err = parse_table("a\t\n1\tx\n", "bad.txt").unwrap_err();
        match err {
            StatError::Parse { context, reason } => {
                assert_eq!(context, "bad.txt:2");
                assert!(reason.contains("'x'"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_ragged_row_is_parse_failure() {
        let err = parse_table("a\t\n1\t2\n1\t2\t3\n", "ragged.txt").unwrap_err();
        assert!(matches!(err, StatError::Parse { .. }));
    }

    #[test]
    fn test_empty_input_is_parse_failure() {
        assert!(parse_table("", "empty.txt").is_err());
    }

    #[test]
    fn test_read_missing_file_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_table(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, StatError::Io { .. }));
        assert!(err.is_recoverable());
    }
}
