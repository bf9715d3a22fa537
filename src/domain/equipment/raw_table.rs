// ============================================================
// RAW TABLE TYPES
// ============================================================
// Untrusted, decoded upload content before validation

use serde::{Deserialize, Serialize};

/// A single untyped cell as produced by a table decoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Missing in the pandas sense: empty, or a NaN number.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Numeric coercion. Text is trimmed before parsing; booleans are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if !n.is_nan() => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
            _ => None,
        }
    }

    /// Total stringification used for text fields. Never fails.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// One uploaded line. Cells are aligned with the owning table's headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// Row index (0-based, data rows only)
    pub index: usize,
    pub cells: Vec<CellValue>,
}

impl RawRow {
    pub fn cell(&self, column: usize) -> &CellValue {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    pub fn has_missing(&self) -> bool {
        self.cells.iter().any(CellValue::is_missing)
    }
}

/// A decoded, rectangular table: header list plus rows of untyped cells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Build a table, padding short rows with `Empty` and cutting long ones to
    /// the header width so every row is rectangular.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, mut cells)| {
                cells.resize(width, CellValue::Empty);
                RawRow { index, cells }
            })
            .collect();

        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
