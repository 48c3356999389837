//! CSV bridge onto [`Dataset`].
//!
//! Supported format:
//! - UTF-8, comma-separated
//! - A mandatory header row naming every column
//! - Double-quoted fields with embedded commas are handled correctly
//! - Blank lines are skipped
//!
//! Column kinds are inferred: a column where every cell parses as an
//! integer is tagged [`ColumnKind::Integer`], anything else must parse as
//! a float and is tagged [`ColumnKind::Double`].

use crate::data::dataset::{Column, ColumnKind, Dataset};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parses CSV bytes into a [`Dataset`].
pub fn parse_csv(data: &[u8]) -> Result<Dataset> {
    let text = std::str::from_utf8(data)
        .map_err(|_| Error::Dataset("CSV file is not valid UTF-8".into()))?;

    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let names: Vec<String> = match lines.next() {
        Some(header) => parse_csv_row(header)
            .into_iter()
            .map(|c| c.trim().to_string())
            .collect(),
        None => return Err(Error::Dataset("CSV file is empty".into())),
    };
    if names.iter().any(|n| n.is_empty()) {
        return Err(Error::Dataset("header row has an empty column name".into()));
    }
    // A header whose every cell is numeric is almost certainly a data row;
    // there is no way to recover column names from it.
    if names.iter().all(|n| n.parse::<f64>().is_ok()) {
        return Err(Error::Dataset(
            "first row must name the columns, found only numbers".into(),
        ));
    }

    let mut cells_by_column: Vec<Vec<String>> = vec![Vec::new(); names.len()];
    for (row_idx, line) in lines.enumerate() {
        let cells = parse_csv_row(line);
        if cells.len() != names.len() {
            return Err(Error::Dataset(format!(
                "row {}: expected {} cells, got {}",
                row_idx + 1,
                names.len(),
                cells.len()
            )));
        }
        for (column, cell) in cells_by_column.iter_mut().zip(cells) {
            column.push(cell.trim().to_string());
        }
    }
    if cells_by_column[0].is_empty() {
        return Err(Error::Dataset("CSV contains no data rows".into()));
    }

    let columns = names
        .into_iter()
        .zip(cells_by_column)
        .map(|(name, cells)| build_column(name, &cells))
        .collect::<Result<Vec<Column>>>()?;
    Dataset::from_columns(columns)
}

/// Reads and parses one CSV file.
pub fn read_path<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    parse_csv(&fs::read(path)?)
}

/// Reads several CSV files with identical schemas and stacks their rows
/// in the order given.
pub fn read_paths(paths: &[PathBuf]) -> Result<Dataset> {
    let parts = paths
        .iter()
        .map(read_path)
        .collect::<Result<Vec<Dataset>>>()?;
    Dataset::concat(parts)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Parses a single CSV row, handling double-quoted fields.
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '"' => {
                if in_quotes && i + 1 < chars.len() && chars[i + 1] == '"' {
                    // Escaped quote inside quoted field.
                    current.push('"');
                    i += 2;
                    continue;
                }
                in_quotes = !in_quotes;
            }
            ',' if !in_quotes => {
                fields.push(current.clone());
                current.clear();
            }
            c => current.push(c),
        }
        i += 1;
    }
    fields.push(current);
    fields
}

/// Infers the column kind and parses every cell, reporting the offending
/// row on failure.
fn build_column(name: String, cells: &[String]) -> Result<Column> {
    let kind = if cells.iter().all(|c| c.parse::<i64>().is_ok()) {
        ColumnKind::Integer
    } else {
        ColumnKind::Double
    };
    let values = cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            cell.parse::<f64>().map_err(|_| {
                Error::Dataset(format!(
                    "column '{}' row {}: '{}' is not a valid number",
                    name,
                    row + 1,
                    cell
                ))
            })
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(Column::new(name, kind, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_table_and_infers_kinds() {
        let text = b"pt,n_tracks,tag\n45.5,3,1\n12.25,7,0\n";
        let data = parse_csv(text).unwrap();
        assert_eq!(data.rows(), 2);
        assert_eq!(data.names(), vec!["pt", "n_tracks", "tag"]);
        assert_eq!(data.column("pt").unwrap().kind(), ColumnKind::Double);
        assert_eq!(data.column("n_tracks").unwrap().kind(), ColumnKind::Integer);
        assert_eq!(data.column("n_tracks").unwrap().values(), &[3.0, 7.0]);
    }

    #[test]
    fn handles_quoted_cells_and_blank_lines() {
        let text = b"\"jet,pt\",mass\n\n1.5,2.5\n\n3.5,4.5\n";
        let data = parse_csv(text).unwrap();
        assert_eq!(data.rows(), 2);
        assert_eq!(data.names(), vec!["jet,pt", "mass"]);
        assert_eq!(data.column("jet,pt").unwrap().values(), &[1.5, 3.5]);
    }

    #[test]
    fn rejects_ragged_rows_with_row_context() {
        let text = b"a,b\n1,2\n3\n";
        let err = parse_csv(text).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn rejects_non_numeric_cells_with_context() {
        let text = b"a,b\n1,2\n3,oops\n";
        let err = parse_csv(text).unwrap_err();
        assert!(err.to_string().contains("oops"));
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn rejects_a_numeric_header() {
        let text = b"1,2\n3,4\n";
        let err = parse_csv(text).unwrap_err();
        assert!(err.to_string().contains("name the columns"));
    }

    #[test]
    fn rejects_empty_input_and_header_only_input() {
        assert!(parse_csv(b"").is_err());
        assert!(parse_csv(b"a,b\n").is_err());
    }

    #[test]
    fn integer_detection_requires_every_cell() {
        let text = b"x\n1\n2.5\n";
        let data = parse_csv(text).unwrap();
        assert_eq!(data.column("x").unwrap().kind(), ColumnKind::Double);
    }
}
