use std::fmt;
use std::str::FromStr;

use crate::isp::workbook::error::{Result, WorkbookError};

/// Converts column letters to a 1-based column index (A=1, Z=26, AA=27).
pub fn column_index(letters: &str) -> Result<u32> {
    let trimmed = letters.trim();
    if trimmed.is_empty() {
        return Err(WorkbookError::InvalidColumn(letters.to_string()));
    }

    let mut index: u32 = 0;
    for ch in trimmed.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(WorkbookError::InvalidColumn(letters.to_string()));
        }
        let digit = u32::from(ch.to_ascii_uppercase() as u8 - b'A') + 1;
        index = index
            .checked_mul(26)
            .and_then(|value| value.checked_add(digit))
            .ok_or_else(|| WorkbookError::InvalidColumn(letters.to_string()))?;
    }
    Ok(index)
}

/// Converts a 1-based column index back to its letters.
pub fn column_letters(index: u32) -> String {
    let mut remaining = index;
    let mut letters = Vec::new();
    while remaining > 0 {
        let rem = (remaining - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Parses an A1-style cell reference such as `AB12` into a 1-based
/// `(row, column)` pair.
pub fn parse_cell_reference(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|ch: char| ch.is_ascii_digit())?;
    if split == 0 {
        return None;
    }
    let column = column_index(&reference[..split]).ok()?;
    let row = reference[split..].parse::<u32>().ok()?;
    if row == 0 {
        return None;
    }
    Some((row, column))
}

/// An inclusive span of columns written alphabetically, e.g. `B:AF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    first: u32,
    last: u32,
}

impl ColumnRange {
    /// Builds a range from 1-based indices. `first` must not exceed `last`.
    pub fn new(first: u32, last: u32) -> Result<Self> {
        if first == 0 || first > last {
            return Err(WorkbookError::InvalidColumn(format!(
                "{}:{}",
                column_letters(first),
                column_letters(last)
            )));
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn last(&self) -> u32 {
        self.last
    }

    pub fn width(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    pub fn contains(&self, column: u32) -> bool {
        (self.first..=self.last).contains(&column)
    }

    /// Zero-based position of a sheet column within this range.
    pub fn offset_of(&self, column: u32) -> Option<usize> {
        self.contains(column).then(|| (column - self.first) as usize)
    }

    pub fn columns(&self) -> impl Iterator<Item = u32> {
        self.first..=self.last
    }
}

impl FromStr for ColumnRange {
    type Err = WorkbookError;

    fn from_str(value: &str) -> Result<Self> {
        let (first, last) = value
            .split_once(':')
            .ok_or_else(|| WorkbookError::InvalidColumn(value.to_string()))?;
        let first = column_index(first)?;
        let last = column_index(last)?;
        if first > last {
            return Err(WorkbookError::InvalidColumn(value.to_string()));
        }
        Ok(Self { first, last })
    }
}

impl fmt::Display for ColumnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            column_letters(self.first),
            column_letters(self.last)
        )
    }
}
