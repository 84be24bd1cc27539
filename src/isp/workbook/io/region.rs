use std::ops::RangeInclusive;

use crate::isp::workbook::columns::ColumnRange;
use crate::isp::workbook::error::{Bound, Result, WorkbookError};
use crate::isp::workbook::io::source::{CellWindow, FormatGrid, WorkbookSource};
use crate::isp::workbook::model::CellValue;

/// A rectangular block of raw cell values read from a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRegion {
    pub sheet_name: String,
    pub first_row: u32,
    pub columns: ColumnRange,
    pub rows: Vec<Vec<CellValue>>,
}

/// Populated extent of a sheet as `(max_row, max_column)`, 1-based.
pub fn sheet_extent<W: WorkbookSource + ?Sized>(source: &mut W, sheet: &str) -> Result<(u32, u32)> {
    let sheet = source.sheet(sheet)?;
    Ok((sheet.max_row(), sheet.max_column()))
}

/// Reads the values of `rows` × `columns` without any type inference.
///
/// Fails with `SheetNotFound` for an unknown sheet and with
/// `RegionOutOfBounds` when the block reaches past the populated extent.
pub fn read_region<W: WorkbookSource + ?Sized>(
    source: &mut W,
    sheet_name: &str,
    rows: RangeInclusive<u32>,
    columns: ColumnRange,
) -> Result<RawRegion> {
    let sheet = source.sheet(sheet_name)?;
    let out_of_bounds = |bound, requested, limit| WorkbookError::RegionOutOfBounds {
        table: sheet_name.to_string(),
        bound,
        requested,
        limit,
    };
    if *rows.start() == 0 || *rows.start() > sheet.max_row() {
        return Err(out_of_bounds(Bound::FirstHeaderRow, *rows.start(), sheet.max_row()));
    }
    if *rows.end() > sheet.max_row() {
        return Err(out_of_bounds(Bound::EndRow, *rows.end(), sheet.max_row()));
    }
    if columns.first() > sheet.max_column() {
        return Err(out_of_bounds(Bound::FirstColumn, columns.first(), sheet.max_column()));
    }
    if columns.last() > sheet.max_column() {
        return Err(out_of_bounds(Bound::LastColumn, columns.last(), sheet.max_column()));
    }

    let values = rows
        .clone()
        .map(|row| {
            columns
                .columns()
                .map(|column| sheet.cell(row, column).clone())
                .collect()
        })
        .collect();

    Ok(RawRegion {
        sheet_name: sheet_name.to_string(),
        first_row: *rows.start(),
        columns,
        rows: values,
    })
}

/// Number-format codes for `rows` × `columns`. Only the percentage pass needs
/// these, so they are never fetched alongside values.
pub fn read_number_formats<W: WorkbookSource + ?Sized>(
    source: &mut W,
    sheet_name: &str,
    rows: RangeInclusive<u32>,
    columns: ColumnRange,
) -> Result<FormatGrid> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let window = CellWindow {
        first_row: *rows.start(),
        last_row: *rows.end(),
        first_column: columns.first(),
        last_column: columns.last(),
    };
    source.number_formats(sheet_name, &window)
}

/// Reads one cell. Cells beyond the populated extent read as empty.
pub fn probe_cell<W: WorkbookSource + ?Sized>(
    source: &mut W,
    sheet_name: &str,
    row: u32,
    column: u32,
) -> Result<CellValue> {
    let sheet = source.sheet(sheet_name)?;
    Ok(sheet.cell(row, column).clone())
}

/// Reads one column over `rows`. Unlike [`read_region`] this never fails on
/// coordinates outside the populated extent; such cells read as empty, as
/// does column zero.
pub fn probe_column<W: WorkbookSource + ?Sized>(
    source: &mut W,
    sheet_name: &str,
    rows: RangeInclusive<u32>,
    column: u32,
) -> Result<Vec<CellValue>> {
    let sheet = source.sheet(sheet_name)?;
    Ok(rows.map(|row| sheet.cell(row, column).clone()).collect())
}
