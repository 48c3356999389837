use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Numeric kind of a source column. Integer columns (counts, flags) are
/// still stored as `f64`; the kind is metadata carried from the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Double,
}

/// One named column of event values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<f64>) -> Column {
        Column {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// An in-memory table of named, equal-length columns.
///
/// Construction validates the shape; after that the table is immutable.
/// Row subsets are taken by [`Dataset::slice`], which copies into a new
/// table rather than mutating this one.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: usize,
}

impl Dataset {
    /// Builds a dataset from columns, rejecting empty tables, duplicate
    /// names, and length mismatches.
    pub fn from_columns(columns: Vec<Column>) -> Result<Dataset> {
        let first = columns
            .first()
            .ok_or_else(|| Error::Dataset("a dataset needs at least one column".into()))?;
        let rows = first.values.len();
        for column in &columns {
            if column.values.len() != rows {
                return Err(Error::Dataset(format!(
                    "column '{}' has {} values, expected {}",
                    column.name,
                    column.values.len(),
                    rows
                )));
            }
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Error::Dataset(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }
        Ok(Dataset { columns, rows })
    }

    /// Stacks several tables with identical schemas (names and kinds, in
    /// order) into one, preserving row order across parts.
    pub fn concat(parts: Vec<Dataset>) -> Result<Dataset> {
        let mut iter = parts.into_iter();
        let mut merged = iter
            .next()
            .ok_or_else(|| Error::Dataset("nothing to concatenate".into()))?;
        for part in iter {
            if part.columns.len() != merged.columns.len() {
                return Err(Error::Dataset(format!(
                    "cannot concatenate: {} columns vs {}",
                    part.columns.len(),
                    merged.columns.len()
                )));
            }
            for (into, from) in merged.columns.iter_mut().zip(part.columns) {
                if into.name != from.name || into.kind != from.kind {
                    return Err(Error::Dataset(format!(
                        "cannot concatenate: column '{}' ({:?}) vs '{}' ({:?})",
                        into.name, into.kind, from.name, from.kind
                    )));
                }
                into.values.extend(from.values);
            }
            merged.rows += part.rows;
        }
        Ok(merged)
    }

    /// Column names in their table order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Copies rows `start..end` into a new dataset.
    pub fn slice(&self, start: usize, end: usize) -> Result<Dataset> {
        if start >= end || end > self.rows {
            return Err(Error::Dataset(format!(
                "invalid row range {}..{} for a table of {} rows",
                start, end, self.rows
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.kind, c.values[start..end].to_vec()))
            .collect();
        Dataset::from_columns(columns)
    }

    /// Extracts the named columns into a `(rows, names.len())` matrix,
    /// one event per row, columns in the order given.
    pub fn matrix_of(&self, names: &[String]) -> Result<Matrix> {
        if self.rows == 0 {
            return Err(Error::Dataset("dataset has no rows".into()));
        }
        let mut data = vec![Vec::with_capacity(names.len()); self.rows];
        for name in names {
            let column = self
                .column(name)
                .ok_or_else(|| Error::Dataset(format!("unknown column '{}'", name)))?;
            for (row, value) in data.iter_mut().zip(&column.values) {
                row.push(*value);
            }
        }
        Ok(Matrix::from_data(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Dataset {
        Dataset::from_columns(vec![
            Column::new("pt", ColumnKind::Double, vec![10.0, 20.0, 30.0, 40.0]),
            Column::new("n_tracks", ColumnKind::Integer, vec![2.0, 3.0, 5.0, 4.0]),
            Column::new("tag", ColumnKind::Integer, vec![0.0, 1.0, 1.0, 0.0]),
        ])
        .unwrap()
    }

    #[test]
    fn from_columns_records_shape_and_order() {
        let data = table();
        assert_eq!(data.rows(), 4);
        assert_eq!(data.names(), vec!["pt", "n_tracks", "tag"]);
        assert_eq!(data.column("n_tracks").unwrap().kind(), ColumnKind::Integer);
    }

    #[test]
    fn from_columns_rejects_duplicate_names() {
        let err = Dataset::from_columns(vec![
            Column::new("x", ColumnKind::Double, vec![1.0]),
            Column::new("x", ColumnKind::Double, vec![2.0]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn from_columns_rejects_ragged_columns() {
        let err = Dataset::from_columns(vec![
            Column::new("x", ColumnKind::Double, vec![1.0, 2.0]),
            Column::new("y", ColumnKind::Double, vec![1.0]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("expected 2"));
    }

    #[test]
    fn from_columns_rejects_empty_tables() {
        assert!(Dataset::from_columns(vec![]).is_err());
    }

    #[test]
    fn slice_copies_the_requested_rows() {
        let data = table();
        let middle = data.slice(1, 3).unwrap();
        assert_eq!(middle.rows(), 2);
        assert_eq!(middle.column("pt").unwrap().values(), &[20.0, 30.0]);
        // The source table is untouched.
        assert_eq!(data.rows(), 4);
    }

    #[test]
    fn slice_rejects_bad_ranges() {
        let data = table();
        assert!(data.slice(2, 2).is_err());
        assert!(data.slice(0, 5).is_err());
        assert!(data.slice(3, 1).is_err());
    }

    #[test]
    fn matrix_of_follows_the_requested_column_order() {
        let data = table();
        let m = data
            .matrix_of(&["tag".to_string(), "pt".to_string()])
            .unwrap();
        assert_eq!(m.rows, 4);
        assert_eq!(m.cols, 2);
        assert_eq!(m.data[1], vec![1.0, 20.0]);
    }

    #[test]
    fn matrix_of_rejects_unknown_columns() {
        let err = table().matrix_of(&["eta".to_string()]).unwrap_err();
        assert!(err.to_string().contains("eta"));
    }

    #[test]
    fn concat_stacks_rows_in_order() {
        let a = table();
        let b = table().slice(0, 2).unwrap();
        let merged = Dataset::concat(vec![a, b]).unwrap();
        assert_eq!(merged.rows(), 6);
        assert_eq!(
            merged.column("pt").unwrap().values(),
            &[10.0, 20.0, 30.0, 40.0, 10.0, 20.0]
        );
    }

    #[test]
    fn concat_rejects_schema_mismatches() {
        let a = table();
        let b = Dataset::from_columns(vec![
            Column::new("pt", ColumnKind::Double, vec![1.0]),
            Column::new("eta", ColumnKind::Double, vec![0.5]),
            Column::new("tag", ColumnKind::Integer, vec![1.0]),
        ])
        .unwrap();
        assert!(Dataset::concat(vec![a, b]).is_err());
    }
}
