//! The extraction pipeline: region read, header, body clean-up, casting,
//! percentage rescaling and, on request, boundary checks.

use std::ops::RangeInclusive;

use tracing::{debug, info, instrument, warn};

use crate::isp::workbook::columns::ColumnRange;
use crate::isp::workbook::error::{Result, WorkbookError};
use crate::isp::workbook::header::reconstruct;
use crate::isp::workbook::io::region::{RawRegion, read_number_formats, read_region};
use crate::isp::workbook::io::source::WorkbookSource;
use crate::isp::workbook::locator::TableLocator;
use crate::isp::workbook::model::{CellValue, Column, Table, Value};
use crate::isp::workbook::percentage::{percentage_mask, rescale_percentages};
use crate::isp::workbook::rows::{drop_rows, fill_across, fill_down};
use crate::isp::workbook::sanitise::{Sanitiser, replace_hyphen_sentinels};
use crate::isp::workbook::validate;

/// Settings for one extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub run_validation: bool,
    pub sanitiser: Sanitiser,
}

impl ExtractOptions {
    pub fn with_validation(mut self, run_validation: bool) -> Self {
        self.run_validation = run_validation;
        self
    }

    pub fn with_sanitiser(mut self, sanitiser: Sanitiser) -> Self {
        self.sanitiser = sanitiser;
        self
    }
}

/// Extracts the table described by `locator` using the built-in sanitiser.
pub fn extract<W: WorkbookSource + ?Sized>(
    source: &mut W,
    locator: &TableLocator,
    run_validation: bool,
) -> Result<Table> {
    extract_with(
        source,
        locator,
        &ExtractOptions::default().with_validation(run_validation),
    )
}

#[instrument(
    level = "debug",
    skip_all,
    fields(table = locator.name(), sheet = locator.sheet_name(), checks = options.run_validation)
)]
pub fn extract_with<W: WorkbookSource + ?Sized>(
    source: &mut W,
    locator: &TableLocator,
    options: &ExtractOptions,
) -> Result<Table> {
    if options.run_validation {
        validate::preflight(source, locator)?;
    }

    let range = locator.column_range();
    let region = read_region(
        source,
        locator.sheet_name(),
        locator.first_header_row()..=locator.end_row(),
        range,
    )
    .map_err(|error| for_table(error, locator.name()))?;

    let mut header_rows = region.rows;
    let body = header_rows.split_off(locator.header_row_count());
    let header = reconstruct(&header_rows, &options.sanitiser);
    debug!(columns = ?header.names(), "reconstructed header");
    if options.run_validation {
        validate::check_duplicate_columns(locator, &header)?;
    }

    let skipped = locator.skipped_data_indices();
    let raw_body = drop_rows(body.clone(), &skipped);
    let mut rows = raw_body.clone();
    let merged = locator.merged_column_offsets();
    fill_down(&mut rows, &merged);
    if locator.forward_fill_values() && locator.header_row_count() > 1 {
        fill_across(&mut rows, &merged);
    }
    replace_hyphen_sentinels(&mut rows);

    let mut values: Vec<Vec<Value>> = (0..header.len())
        .map(|column| {
            let cells = rows
                .iter()
                .map(|row| row.get(column).cloned().unwrap_or_default())
                .collect();
            options.sanitiser.cast_column(cells)
        })
        .collect();

    if body.iter().flatten().any(CellValue::is_numeric) {
        let formats = read_number_formats(
            source,
            locator.sheet_name(),
            locator.last_header_row() + 1..=locator.end_row(),
            range,
        )?;
        let mask = percentage_mask(&body, &formats, &skipped);
        let whole = rescale_percentages(&mut values, &mask);
        if whole > 0 {
            debug!(columns = whole, "rescaled percentage columns");
        }
    }

    let table = Table {
        name: locator.name().to_string(),
        columns: header
            .into_names()
            .into_iter()
            .zip(values)
            .map(|(name, values)| Column { name, values })
            .collect(),
    };

    if options.run_validation {
        validate::check_boundaries(source, locator, &table, &raw_body)?;
    }

    info!(rows = table.height(), columns = table.width(), "extracted table");
    Ok(table)
}

/// Reads a raw block of cells by column letters, e.g. `"B:F"`.
pub fn extract_raw_region<W: WorkbookSource + ?Sized>(
    source: &mut W,
    sheet_name: &str,
    rows: RangeInclusive<u32>,
    columns: &str,
) -> Result<RawRegion> {
    let columns = columns.parse::<ColumnRange>()?;
    read_region(source, sheet_name, rows, columns)
}

/// Extracts every table, keeping going after failures. Results keep the
/// order of `locators`.
#[instrument(level = "info", skip_all, fields(checks = run_validation))]
pub fn extract_all<'a, W, I>(
    source: &mut W,
    locators: I,
    run_validation: bool,
) -> Vec<(String, Result<Table>)>
where
    W: WorkbookSource + ?Sized,
    I: IntoIterator<Item = &'a TableLocator>,
{
    let results: Vec<(String, Result<Table>)> = locators
        .into_iter()
        .map(|locator| {
            let result = extract(source, locator, run_validation);
            if let Err(error) = &result {
                warn!(table = locator.name(), %error, "table extraction failed");
            }
            (locator.name().to_string(), result)
        })
        .collect();
    let failed = results.iter().filter(|(_, result)| result.is_err()).count();
    info!(tables = results.len(), failed, "extracted tables");
    results
}

/// Region errors are raised per sheet; re-label them with the table.
fn for_table(error: WorkbookError, table: &str) -> WorkbookError {
    match error {
        WorkbookError::RegionOutOfBounds {
            bound,
            requested,
            limit,
            ..
        } => WorkbookError::RegionOutOfBounds {
            table: table.to_string(),
            bound,
            requested,
            limit,
        },
        other => other,
    }
}
