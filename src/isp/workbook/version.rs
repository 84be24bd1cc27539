use crate::isp::workbook::error::{Result, WorkbookError};
use crate::isp::workbook::io::source::WorkbookSource;
use crate::isp::workbook::model::CellValue;

/// Sheet listing the workbook's revisions, newest last.
pub const CHANGE_LOG_SHEET: &str = "Change Log";

const VERSION_COLUMN: u32 = 2;

/// Reads the workbook version: the last value in column B of the change log,
/// rendered with at least one decimal place (`6` reads as `"6.0"`).
pub fn detect_version<W: WorkbookSource + ?Sized>(source: &mut W) -> Result<String> {
    let sheet = source.sheet(CHANGE_LOG_SHEET)?;
    let latest = (1..=sheet.max_row())
        .rev()
        .map(|row| sheet.cell(row, VERSION_COLUMN))
        .find(|cell| !cell.is_blank())
        .ok_or_else(|| {
            WorkbookError::InvalidWorkbook(format!(
                "no version found in column B of the '{CHANGE_LOG_SHEET}' sheet"
            ))
        })?;
    let number = match latest {
        CellValue::Int(value) => Some(*value as f64),
        CellValue::Float(value) => Some(*value),
        CellValue::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        WorkbookError::InvalidWorkbook(format!("'{latest}' is not a workbook version number"))
    })?;
    Ok(format!("{number:?}"))
}
