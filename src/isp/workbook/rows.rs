//! Row post-processing on a table body: skipped rows and merged-cell fills.

use std::collections::BTreeSet;

use crate::isp::workbook::model::CellValue;

/// Removes the rows at the given body indices; the remaining rows keep their
/// order and are indexed contiguously afterwards.
pub fn drop_rows(rows: Vec<Vec<CellValue>>, skipped: &BTreeSet<usize>) -> Vec<Vec<CellValue>> {
    if skipped.is_empty() {
        return rows;
    }
    rows.into_iter()
        .enumerate()
        .filter(|(index, _)| !skipped.contains(index))
        .map(|(_, row)| row)
        .collect()
}

/// Fills empty cells of the given columns with the nearest value above.
/// Cells above the first value stay empty.
pub fn fill_down(rows: &mut [Vec<CellValue>], columns: &[usize]) {
    for &column in columns {
        let mut last: Option<CellValue> = None;
        for row in rows.iter_mut() {
            let Some(cell) = row.get_mut(column) else {
                continue;
            };
            if cell.is_empty() {
                if let Some(value) = &last {
                    *cell = value.clone();
                }
            } else {
                last = Some(cell.clone());
            }
        }
    }
}

/// Fills empty cells from the cell to their left, row by row. Cells in
/// `exempt` columns are never written.
pub fn fill_across(rows: &mut [Vec<CellValue>], exempt: &[usize]) {
    for row in rows.iter_mut() {
        for column in 1..row.len() {
            if exempt.contains(&column) || !row[column].is_empty() {
                continue;
            }
            row[column] = row[column - 1].clone();
        }
    }
}
