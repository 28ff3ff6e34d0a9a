use std::fmt;

use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// CellValue – a single cell of a recording table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as read from a CSV, JSON or Parquet recording.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Float(f64),
    Integer(i64),
    Text(String),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Coerce the cell to `f64` the way a float cast of a loaded column would.
    ///
    /// Missing cells become NaN; text is accepted only if it parses as a float.
    pub fn coerce_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Null => Some(f64::NAN),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column / Table – one loaded recording
// ---------------------------------------------------------------------------

/// A named, row-ordered column.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

/// One recording: named columns in file order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    /// Build a table from column-major data.
    pub fn from_columns(columns: Vec<Column>) -> Self {
        Table { columns }
    }

    /// Column names in file order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of rows (length of the longest column).
    pub fn len(&self) -> usize {
        self.columns.iter().map(|c| c.values.len()).max().unwrap_or(0)
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read `name` as a numeric signal.
    ///
    /// `file` is only used to give errors their context.
    pub fn numeric_column(&self, file: &str, name: &str) -> Result<Vec<f64>> {
        let column = self
            .column(name)
            .ok_or_else(|| PipelineError::SchemaMismatch {
                file: file.to_string(),
                column: name.to_string(),
            })?;

        column
            .values
            .iter()
            .enumerate()
            .map(|(row, cell)| {
                cell.coerce_f64().ok_or_else(|| PipelineError::TypeMismatch {
                    file: file.to_string(),
                    column: name.to_string(),
                    row,
                    value: cell.to_string(),
                })
            })
            .collect()
    }
}
