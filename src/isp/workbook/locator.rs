//! Declarative description of where a table sits in a sheet.
//!
//! A [`TableLocator`] is validated once when it is built and is immutable
//! afterwards. Locators loaded from YAML go through [`LocatorRecord`] and
//! [`TableLocator::from_record`] so both paths share the same checks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::isp::workbook::columns::{ColumnRange, column_index};
use crate::isp::workbook::error::{Result, WorkbookError};

/// The row, or contiguous rows, holding a table's column labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderRows {
    Single(u32),
    Multi(Vec<u32>),
}

impl HeaderRows {
    pub fn first(&self) -> u32 {
        match self {
            HeaderRows::Single(row) => *row,
            HeaderRows::Multi(rows) => rows.first().copied().unwrap_or(0),
        }
    }

    pub fn last(&self) -> u32 {
        match self {
            HeaderRows::Single(row) => *row,
            HeaderRows::Multi(rows) => rows.last().copied().unwrap_or(0),
        }
    }

    pub fn count(&self) -> usize {
        match self {
            HeaderRows::Single(_) => 1,
            HeaderRows::Multi(rows) => rows.len(),
        }
    }
}

impl From<u32> for HeaderRows {
    fn from(row: u32) -> Self {
        HeaderRows::Single(row)
    }
}

impl From<Vec<u32>> for HeaderRows {
    fn from(rows: Vec<u32>) -> Self {
        HeaderRows::Multi(rows)
    }
}

/// Sheet rows to drop from a table body, in sheet-absolute numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkipRows {
    Row(u32),
    Rows(Vec<u32>),
    Range { start: u32, end: u32 },
}

impl SkipRows {
    /// Every sheet row covered, sorted and deduplicated.
    pub fn rows(&self) -> BTreeSet<u32> {
        match self {
            SkipRows::Row(row) => BTreeSet::from([*row]),
            SkipRows::Rows(rows) => rows.iter().copied().collect(),
            SkipRows::Range { start, end } => (*start..=*end).collect(),
        }
    }

    /// Lowest and highest row covered, without expanding ranges.
    pub fn span(&self) -> Option<(u32, u32)> {
        match self {
            SkipRows::Row(row) => Some((*row, *row)),
            SkipRows::Rows(rows) => Some((*rows.iter().min()?, *rows.iter().max()?)),
            SkipRows::Range { start, end } => Some((*start, *end)),
        }
    }
}

impl From<u32> for SkipRows {
    fn from(row: u32) -> Self {
        SkipRows::Row(row)
    }
}

impl From<Vec<u32>> for SkipRows {
    fn from(rows: Vec<u32>) -> Self {
        SkipRows::Rows(rows)
    }
}

/// One column letter or several, as written in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MergedColumns {
    One(String),
    Many(Vec<String>),
}

impl MergedColumns {
    fn into_vec(self) -> Vec<String> {
        match self {
            MergedColumns::One(column) => vec![column],
            MergedColumns::Many(columns) => columns,
        }
    }
}

/// Serialised form of a locator. The table name is the key of the YAML
/// mapping the record sits under, so it is not repeated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocatorRecord {
    pub sheet_name: String,
    pub header_rows: HeaderRows,
    pub end_row: u32,
    pub column_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_rows: Option<SkipRows>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns_with_merged_rows: Option<MergedColumns>,
    #[serde(default = "default_forward_fill")]
    pub forward_fill_values: bool,
}

fn default_forward_fill() -> bool {
    true
}

/// Position and shape of one table within a workbook sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLocator {
    name: String,
    sheet_name: String,
    header_rows: HeaderRows,
    end_row: u32,
    column_range: ColumnRange,
    skip_rows: Option<SkipRows>,
    columns_with_merged_rows: Vec<String>,
    forward_fill_values: bool,
}

impl TableLocator {
    /// Creates a locator, checking the header rows and parsing the column
    /// range. Optional settings are added with the `with_*` methods.
    pub fn new(
        name: impl Into<String>,
        sheet_name: impl Into<String>,
        header_rows: impl Into<HeaderRows>,
        end_row: u32,
        column_range: &str,
    ) -> Result<Self> {
        let name = name.into();
        let header_rows = header_rows.into();
        validate_header_rows(&name, &header_rows)?;
        if end_row < header_rows.last() {
            return Err(invalid(
                &name,
                format!(
                    "end_row {end_row} is above the last header row {}",
                    header_rows.last()
                ),
            ));
        }
        let column_range = column_range.parse::<ColumnRange>().map_err(|_| {
            invalid(
                &name,
                format!("column_range '{column_range}' must look like 'B:F' with first <= last"),
            )
        })?;

        Ok(Self {
            name,
            sheet_name: sheet_name.into(),
            header_rows,
            end_row,
            column_range,
            skip_rows: None,
            columns_with_merged_rows: Vec::new(),
            forward_fill_values: true,
        })
    }

    /// Builds a locator from a config record stored under `name`.
    pub fn from_record(name: impl Into<String>, record: LocatorRecord) -> Result<Self> {
        let mut locator = Self::new(
            name,
            record.sheet_name,
            record.header_rows,
            record.end_row,
            &record.column_range,
        )?
        .with_forward_fill_values(record.forward_fill_values);
        if let Some(skip_rows) = record.skip_rows {
            locator = locator.with_skip_rows(skip_rows)?;
        }
        if let Some(columns) = record.columns_with_merged_rows {
            locator = locator.with_merged_columns(columns.into_vec())?;
        }
        Ok(locator)
    }

    /// Rows to exclude from the body. Each must fall after the last header
    /// row and no later than `end_row`.
    pub fn with_skip_rows(mut self, skip_rows: impl Into<SkipRows>) -> Result<Self> {
        let skip_rows = skip_rows.into();
        if let SkipRows::Range { start, end } = &skip_rows {
            if start > end {
                return Err(invalid(
                    &self.name,
                    format!("skip_rows range start {start} is after end {end}"),
                ));
            }
        }
        let last_header = self.header_rows.last();
        let outside = skip_rows.span().and_then(|(lo, hi)| {
            if lo <= last_header {
                Some(lo)
            } else if hi > self.end_row {
                Some(hi)
            } else {
                None
            }
        });
        if let Some(row) = outside {
            return Err(invalid(
                &self.name,
                format!(
                    "skip row {row} is outside the table body (rows {} to {})",
                    last_header + 1,
                    self.end_row
                ),
            ));
        }
        self.skip_rows = Some(skip_rows);
        Ok(self)
    }

    /// Columns whose blank cells are filled downward, given as letters.
    pub fn with_merged_columns<I, S>(mut self, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut letters = Vec::new();
        for column in columns {
            let column: String = column.into();
            let column = column.trim().to_ascii_uppercase();
            let index = column_index(&column)
                .map_err(|_| invalid(&self.name, format!("'{column}' is not a column letter")))?;
            if !self.column_range.contains(index) {
                return Err(invalid(
                    &self.name,
                    format!(
                        "merged column {column} is outside column_range {}",
                        self.column_range
                    ),
                ));
            }
            letters.push(column);
        }
        self.columns_with_merged_rows = letters;
        Ok(self)
    }

    pub fn with_forward_fill_values(mut self, forward_fill_values: bool) -> Self {
        self.forward_fill_values = forward_fill_values;
        self
    }

    /// Returns the same locator pointed at a differently spelled sheet name.
    pub fn with_sheet_name(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = sheet_name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn header_rows(&self) -> &HeaderRows {
        &self.header_rows
    }

    pub fn first_header_row(&self) -> u32 {
        self.header_rows.first()
    }

    pub fn last_header_row(&self) -> u32 {
        self.header_rows.last()
    }

    pub fn header_row_count(&self) -> usize {
        self.header_rows.count()
    }

    pub fn end_row(&self) -> u32 {
        self.end_row
    }

    pub fn column_range(&self) -> ColumnRange {
        self.column_range
    }

    pub fn skip_rows(&self) -> Option<&SkipRows> {
        self.skip_rows.as_ref()
    }

    pub fn columns_with_merged_rows(&self) -> &[String] {
        &self.columns_with_merged_rows
    }

    pub fn forward_fill_values(&self) -> bool {
        self.forward_fill_values
    }

    /// Number of body rows between the last header row and `end_row`,
    /// skipped rows included.
    pub fn data_row_count(&self) -> usize {
        self.end_row.saturating_sub(self.last_header_row()) as usize
    }

    /// Zero-based body indices of the skipped rows.
    pub fn skipped_data_indices(&self) -> BTreeSet<usize> {
        let first_data_row = self.last_header_row() + 1;
        self.skip_rows
            .as_ref()
            .map(|skip| {
                skip.rows()
                    .into_iter()
                    .map(|row| (row - first_data_row) as usize)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Zero-based positions, within the column range, of the merged columns.
    pub fn merged_column_offsets(&self) -> Vec<usize> {
        self.columns_with_merged_rows
            .iter()
            .filter_map(|letters| column_index(letters).ok())
            .filter_map(|index| self.column_range.offset_of(index))
            .collect()
    }

    /// Back to the serialised form.
    pub fn to_record(&self) -> LocatorRecord {
        LocatorRecord {
            sheet_name: self.sheet_name.clone(),
            header_rows: self.header_rows.clone(),
            end_row: self.end_row,
            column_range: self.column_range.to_string(),
            skip_rows: self.skip_rows.clone(),
            columns_with_merged_rows: match self.columns_with_merged_rows.as_slice() {
                [] => None,
                [one] => Some(MergedColumns::One(one.clone())),
                many => Some(MergedColumns::Many(many.to_vec())),
            },
            forward_fill_values: self.forward_fill_values,
        }
    }
}

fn validate_header_rows(name: &str, header_rows: &HeaderRows) -> Result<()> {
    match header_rows {
        HeaderRows::Single(0) => Err(invalid(name, "header_rows must be 1-based row numbers")),
        HeaderRows::Single(_) => Ok(()),
        HeaderRows::Multi(rows) => {
            if rows.is_empty() {
                return Err(invalid(name, "header_rows must not be an empty list"));
            }
            if rows.contains(&0) {
                return Err(invalid(name, "header_rows must be 1-based row numbers"));
            }
            if rows.windows(2).any(|pair| pair[1] != pair[0] + 1) {
                return Err(invalid(
                    name,
                    format!("header_rows {rows:?} must be ascending and contiguous"),
                ));
            }
            Ok(())
        }
    }
}

fn invalid(table: &str, reason: impl Into<String>) -> WorkbookError {
    WorkbookError::InvalidLocator {
        table: table.to_string(),
        reason: reason.into(),
    }
}
