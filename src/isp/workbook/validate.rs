//! Checks that a declared table location still matches the sheet.
//!
//! Each check looks at one edge of the table and fails with its own error
//! variant naming the table. None of them alter the extracted data.

use tracing::debug;

use crate::isp::workbook::error::{Bound, Result, WorkbookError};
use crate::isp::workbook::header::FlatHeader;
use crate::isp::workbook::io::region::{probe_cell, probe_column, sheet_extent};
use crate::isp::workbook::io::source::WorkbookSource;
use crate::isp::workbook::locator::TableLocator;
use crate::isp::workbook::model::{CellValue, Table, Value};

/// Text in the first column that means the declared end row runs into the
/// notes printed under a table.
pub const NOTE_MARKERS: &[&str] = &["Notes:", "Note:", "Source:", "Sources:"];

/// Content that marks a deliberately kept column left of a table.
pub const KEEP_COLUMN_MARKER: &str = "DO NOT DELETE THIS COLUMN";

/// Verifies the declared rows and columns lie within the populated part of
/// the sheet. Runs before any value is read.
pub fn preflight<W: WorkbookSource + ?Sized>(source: &mut W, locator: &TableLocator) -> Result<()> {
    let (max_row, max_column) = sheet_extent(source, locator.sheet_name())?;
    let range = locator.column_range();
    let checks = [
        (Bound::FirstHeaderRow, locator.first_header_row(), max_row),
        (Bound::EndRow, locator.end_row(), max_row),
        (Bound::FirstColumn, range.first(), max_column),
        (Bound::LastColumn, range.last(), max_column),
    ];
    for (bound, requested, limit) in checks {
        if requested > limit {
            return Err(WorkbookError::RegionOutOfBounds {
                table: locator.name().to_string(),
                bound,
                requested,
                limit,
            });
        }
    }
    Ok(())
}

pub fn check_duplicate_columns(locator: &TableLocator, header: &FlatHeader) -> Result<()> {
    let names = header.duplicates();
    if names.is_empty() {
        Ok(())
    } else {
        Err(WorkbookError::DuplicateColumn {
            table: locator.name().to_string(),
            names,
        })
    }
}

/// The second column of the range, or the only one for a single column.
fn probe_column_index(locator: &TableLocator) -> u32 {
    let range = locator.column_range();
    range.first() + u32::from(range.width() > 1)
}

pub fn check_header_above<W: WorkbookSource + ?Sized>(
    source: &mut W,
    locator: &TableLocator,
) -> Result<()> {
    let first_header = locator.first_header_row();
    if first_header == 1 {
        return Ok(());
    }
    let cell = probe_cell(
        source,
        locator.sheet_name(),
        first_header - 1,
        probe_column_index(locator),
    )?;
    if cell.is_blank() {
        Ok(())
    } else {
        Err(WorkbookError::HeaderAboveRange {
            table: locator.name().to_string(),
        })
    }
}

pub fn check_data_below<W: WorkbookSource + ?Sized>(
    source: &mut W,
    locator: &TableLocator,
) -> Result<()> {
    let cell = probe_cell(
        source,
        locator.sheet_name(),
        locator.end_row() + 1,
        probe_column_index(locator),
    )?;
    if cell.is_blank() {
        Ok(())
    } else {
        Err(WorkbookError::DataOverrun {
            table: locator.name().to_string(),
        })
    }
}

/// The column right of the range must be blank over the body rows. A lone
/// backtick is treated as blank.
pub fn check_column_right<W: WorkbookSource + ?Sized>(
    source: &mut W,
    locator: &TableLocator,
) -> Result<()> {
    let first_data_row = locator.last_header_row() + 1;
    if first_data_row > locator.end_row() {
        return Ok(());
    }
    let cells = probe_column(
        source,
        locator.sheet_name(),
        first_data_row..=locator.end_row(),
        locator.column_range().last() + 1,
    )?;
    let occupied = cells
        .iter()
        .any(|cell| !cell.is_blank() && !matches!(cell, CellValue::String(text) if text.trim() == "`"));
    if occupied {
        Err(WorkbookError::MissingColumnRight {
            table: locator.name().to_string(),
        })
    } else {
        Ok(())
    }
}

/// The column left of the range must be blank from the first header row to
/// the end row. Tables starting in column B are exempt, as are columns whose
/// only content is the keep marker.
pub fn check_column_left<W: WorkbookSource + ?Sized>(
    source: &mut W,
    locator: &TableLocator,
) -> Result<()> {
    let first = locator.column_range().first();
    if first == 2 {
        return Ok(());
    }
    let cells = probe_column(
        source,
        locator.sheet_name(),
        locator.first_header_row()..=locator.end_row(),
        first - 1,
    )?;
    let content: Vec<String> = cells
        .iter()
        .filter(|cell| !cell.is_blank())
        .map(CellValue::to_string)
        .collect();
    if content.is_empty() || content.iter().all(|text| text.contains(KEEP_COLUMN_MARKER)) {
        Ok(())
    } else {
        Err(WorkbookError::MissingColumnLeft {
            table: locator.name().to_string(),
        })
    }
}

/// The last column must hold something in the body before any fill.
pub fn check_last_column(locator: &TableLocator, raw_body: &[Vec<CellValue>]) -> Result<()> {
    if raw_body.is_empty() {
        return Ok(());
    }
    let all_blank = raw_body
        .iter()
        .all(|row| row.last().is_none_or(CellValue::is_blank));
    if all_blank {
        Err(WorkbookError::EmptyColumn {
            table: locator.name().to_string(),
        })
    } else {
        Ok(())
    }
}

/// The first column must have no nulls and must not contain note markers.
pub fn check_first_column(locator: &TableLocator, table: &Table) -> Result<()> {
    let Some(first) = table.columns.first() else {
        return Ok(());
    };
    if first.values.iter().any(Value::is_null) {
        return Err(WorkbookError::TableOverrun {
            table: locator.name().to_string(),
        });
    }
    for value in &first.values {
        let text = value.to_string();
        if let Some(marker) = NOTE_MARKERS.iter().find(|marker| text.contains(*marker)) {
            return Err(WorkbookError::NotesOverrun {
                table: locator.name().to_string(),
                marker: marker.to_string(),
            });
        }
    }
    Ok(())
}

/// Runs every check that needs the extracted table, in a fixed order.
pub fn check_boundaries<W: WorkbookSource + ?Sized>(
    source: &mut W,
    locator: &TableLocator,
    table: &Table,
    raw_body: &[Vec<CellValue>],
) -> Result<()> {
    check_header_above(source, locator)?;
    check_data_below(source, locator)?;
    check_column_right(source, locator)?;
    check_column_left(source, locator)?;
    check_last_column(locator, raw_body)?;
    check_first_column(locator, table)?;
    debug!(table = locator.name(), "boundary checks passed");
    Ok(())
}
