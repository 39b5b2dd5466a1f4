// In-memory CSV table
//
// Columns keep their header order and an inferred kind so that JSON output
// distinguishes integers, floats and text the same way the CSV was written.

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{LabError, Result};

/// Tokens read as a missing cell
const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-nan", "null", "NULL", "None", "#N/A",
];

// ============================================================================
// CELLS & COLUMNS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Int(v) => json!(v),
            Cell::Float(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Missing => Value::Null,
        }
    }

    fn to_field(&self) -> String {
        match self {
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => format_float(*v),
            Cell::Text(s) => s.clone(),
            Cell::Missing => String::new(),
        }
    }
}

/// Floats always carry a decimal point so a re-read keeps the column a float
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, cells: Vec<Cell>) -> Self {
        Column {
            name: name.into(),
            kind,
            cells,
        }
    }

    pub fn from_floats(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Column::new(
            name,
            ColumnKind::Float,
            values.into_iter().map(Cell::Float).collect(),
        )
    }

    pub fn from_ints(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Column::new(
            name,
            ColumnKind::Integer,
            values.into_iter().map(Cell::Int).collect(),
        )
    }

    pub fn from_strings(name: impl Into<String>, values: impl IntoIterator<Item = String>) -> Self {
        Column::new(
            name,
            ColumnKind::Text,
            values.into_iter().map(Cell::Text).collect(),
        )
    }

    /// Infer the kind from raw CSV fields and parse them.
    ///
    /// Whole numbers with a missing cell are read as floats, since an
    /// integer column has no missing value.
    fn from_raw(name: String, raw: Vec<String>) -> Self {
        let present: Vec<&str> = raw
            .iter()
            .map(String::as_str)
            .filter(|s| !is_missing_token(s))
            .collect();
        let complete = present.len() == raw.len();

        let kind = if complete && present.iter().all(|s| s.trim().parse::<i64>().is_ok()) {
            ColumnKind::Integer
        } else if present.iter().all(|s| s.trim().parse::<f64>().is_ok()) {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        };

        let cells = raw
            .into_iter()
            .map(|s| {
                if is_missing_token(&s) {
                    return Cell::Missing;
                }
                match kind {
                    ColumnKind::Integer => s.trim().parse().map(Cell::Int).unwrap_or(Cell::Missing),
                    ColumnKind::Float => s.trim().parse().map(Cell::Float).unwrap_or(Cell::Missing),
                    ColumnKind::Text => Cell::Text(s),
                }
            })
            .collect();

        Column { name, kind, cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.cells.iter().map(Cell::to_json).collect())
    }

    /// Numeric view of the column; missing or text cells become None
    pub fn floats(&self) -> Vec<Option<f64>> {
        self.cells.iter().map(Cell::as_f64).collect()
    }
}

fn is_missing_token(s: &str) -> bool {
    MISSING_TOKENS.contains(&s.trim())
}

// ============================================================================
// DATA TABLE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    columns: Vec<Column>,
}

impl DataTable {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut table = DataTable::default();
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Read a CSV file with a header row
    pub fn read_csv(path: &Path) -> Result<Self> {
        Self::read_csv_inner(path, None)
    }

    /// Read a CSV file, replacing its header row with `names`
    pub fn read_csv_with_names(path: &Path, names: &[&str]) -> Result<Self> {
        Self::read_csv_inner(path, Some(names))
    }

    fn read_csv_inner(path: &Path, names: Option<&[&str]>) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path)?;
        let file_headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

        let headers: Vec<String> = match names {
            Some(names) => {
                if names.len() != file_headers.len() {
                    return Err(LabError::InvalidInput(format!(
                        "{} has {} columns, expected {}",
                        path.display(),
                        file_headers.len(),
                        names.len()
                    )));
                }
                names.iter().map(|s| s.to_string()).collect()
            }
            None => file_headers,
        };

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in rdr.records() {
            let record = record?;
            for (i, field) in record.iter().enumerate() {
                raw[i].push(field.to_string());
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, values)| Column::from_raw(name, values))
            .collect();

        Ok(DataTable { columns })
    }

    /// Write the table with a header row and no index column
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for row in 0..self.nrows() {
            wtr.write_record(self.columns.iter().map(|c| c.cells[row].to_field()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| LabError::ColumnNotFound(name.to_string()))
    }

    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if !self.columns.is_empty() && column.len() != self.nrows() {
            return Err(LabError::InvalidInput(format!(
                "column {} has {} rows, table has {}",
                column.name,
                column.len(),
                self.nrows()
            )));
        }
        if self.has_column(&column.name) {
            return Err(LabError::InvalidInput(format!(
                "duplicate column {}",
                column.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Keep only the named columns, in the order given
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<DataTable> {
        let columns = names
            .iter()
            .map(|name| self.column(name.as_ref()).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(DataTable { columns })
    }

    pub fn drop_columns(&mut self, names: &[&str]) -> Result<()> {
        for name in names {
            self.column(name)?;
        }
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
        Ok(())
    }

    /// Rows in the given order; indices must be in range
    pub fn take_rows(&self, indices: &[usize]) -> DataTable {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                kind: c.kind,
                cells: indices.iter().map(|&i| c.cells[i].clone()).collect(),
            })
            .collect();
        DataTable { columns }
    }

    pub fn drop_missing_rows(&self) -> DataTable {
        let keep: Vec<usize> = (0..self.nrows())
            .filter(|&row| self.columns.iter().all(|c| !c.cells[row].is_missing()))
            .collect();
        self.take_rows(&keep)
    }

    /// Sample `n` distinct rows in random order
    pub fn sample_rows<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<DataTable> {
        let available = self.nrows();
        if n > available {
            return Err(LabError::SampleTooLarge {
                requested: n,
                available,
            });
        }
        let indices = rand::seq::index::sample(rng, available, n).into_vec();
        Ok(self.take_rows(&indices))
    }

    pub fn numeric_only(&self) -> DataTable {
        let columns = self
            .columns
            .iter()
            .filter(|c| c.kind.is_numeric())
            .cloned()
            .collect();
        DataTable { columns }
    }

    pub fn text_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Text)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.kind.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Dense samples x features matrix; every column must be numeric and complete
    pub fn numeric_matrix(&self) -> Result<Array2<f64>> {
        let (rows, cols) = (self.nrows(), self.ncols());
        let mut matrix = Array2::<f64>::zeros((rows, cols));

        for (j, column) in self.columns.iter().enumerate() {
            if !column.kind.is_numeric() {
                return Err(LabError::InvalidInput(format!(
                    "column {} is not numeric",
                    column.name
                )));
            }
            for (i, cell) in column.cells.iter().enumerate() {
                matrix[[i, j]] = cell.as_f64().ok_or_else(|| {
                    LabError::InvalidInput(format!(
                        "column {} has a missing value at row {}",
                        column.name, i
                    ))
                })?;
            }
        }

        Ok(matrix)
    }

    /// Build a float table from a samples x features matrix
    pub fn from_matrix<S: AsRef<str>>(names: &[S], matrix: &Array2<f64>) -> Result<DataTable> {
        if names.len() != matrix.ncols() {
            return Err(LabError::InvalidInput(format!(
                "{} names for {} matrix columns",
                names.len(),
                matrix.ncols()
            )));
        }
        let columns = names
            .iter()
            .zip(matrix.columns())
            .map(|(name, values)| Column::from_floats(name.as_ref(), values.iter().copied()))
            .collect();
        Ok(DataTable { columns })
    }

    /// Replace every text column by integer codes over its sorted distinct values.
    ///
    /// Returns `{column: {"code": label}}` for the encoded columns, in column
    /// order. Missing cells get code -1.
    pub fn encode_categorical(&mut self) -> Map<String, Value> {
        let mut mappings = Map::new();

        for column in self.columns.iter_mut().filter(|c| c.kind == ColumnKind::Text) {
            let categories: Vec<String> = column
                .cells
                .iter()
                .filter_map(|cell| match cell {
                    Cell::Text(s) => Some(s.clone()),
                    _ => None,
                })
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            let cells = column
                .cells
                .iter()
                .map(|cell| match cell {
                    Cell::Text(s) => categories
                        .binary_search(s)
                        .map(|code| Cell::Int(code as i64))
                        .unwrap_or(Cell::Int(-1)),
                    _ => Cell::Int(-1),
                })
                .collect();

            column.cells = cells;
            column.kind = ColumnKind::Integer;

            let mapping: Map<String, Value> = categories
                .into_iter()
                .enumerate()
                .map(|(code, label)| (code.to_string(), Value::String(label)))
                .collect();
            mappings.insert(column.name.clone(), Value::Object(mapping));
        }

        mappings
    }

    pub fn row_json(&self, row: usize) -> Map<String, Value> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.cells[row].to_json()))
            .collect()
    }

    /// Records as a JSON array of objects keyed by header
    pub fn to_records(&self) -> Value {
        Value::Array(
            (0..self.nrows())
                .map(|row| Value::Object(self.row_json(row)))
                .collect(),
        )
    }

    /// Rows as JSON arrays (`df.values.tolist()`)
    pub fn to_rows(&self) -> Value {
        Value::Array(
            (0..self.nrows())
                .map(|row| Value::Array(self.columns.iter().map(|c| c.cells[row].to_json()).collect()))
                .collect(),
        )
    }
}
