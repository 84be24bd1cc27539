use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;

/// A cell as read from the sheet, before any cleaning or casting.
///
/// `Empty` marks a cell with no content at all and is kept distinct from a
/// cell holding an empty string.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    /// A date-formatted cell, already converted from its serial number.
    DateTime(NaiveDateTime),
    /// Spreadsheet error literal such as `#DIV/0!`.
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// True for empty cells and for strings made only of whitespace,
    /// non-breaking spaces included.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(value) => value.chars().all(char::is_whitespace),
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Int(_) | CellValue::Float(_))
    }

    /// Text rendering of the cell used for header labels. Blank cells have no
    /// label. Whole floats render without a fractional part so that a year
    /// typed as a number reads `2024`, not `2024.0`.
    pub fn label(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        Some(self.to_string())
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Int(value) => write!(f, "{value}"),
            CellValue::Float(value) => write!(f, "{}", format_float(*value)),
            CellValue::String(value) => write!(f, "{value}"),
            CellValue::Bool(value) => write!(f, "{value}"),
            CellValue::DateTime(value) => write!(f, "{}", format_datetime(value)),
            CellValue::Error(value) => write!(f, "{value}"),
        }
    }
}

/// A typed value in an extracted table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<CellValue> for Value {
    fn from(cell: CellValue) -> Self {
        match cell {
            CellValue::Empty => Value::Null,
            CellValue::Int(value) => Value::Integer(value),
            CellValue::Float(value) => Value::Float(value),
            CellValue::String(value) => Value::Text(value),
            CellValue::Bool(value) => Value::Boolean(value),
            CellValue::DateTime(value) => Value::DateTime(value),
            CellValue::Error(value) => Value::Text(value),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Text(value) => write!(f, "{value}"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::DateTime(value) => write!(f, "{}", format_datetime(value)),
        }
    }
}

/// A named column of an extracted table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// A table extracted from a workbook. Every column holds the same number of
/// values and rows keep the order they have in the sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.columns.first().map(|column| column.values.len()).unwrap_or(0)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    /// Looks up a column by its reconstructed header name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.height() {
            return None;
        }
        Some(self.columns.iter().map(|column| &column.values[index]).collect())
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.height()).filter_map(|index| self.row(index))
    }
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Dates at midnight render as the bare date.
fn format_datetime(value: &NaiveDateTime) -> String {
    if value.time() == NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
