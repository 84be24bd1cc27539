use std::collections::BTreeSet;

use crate::isp::workbook::io::source::FormatGrid;
use crate::isp::workbook::model::{CellValue, Value};

/// Marks body cells that hold a number displayed with a percentage format.
///
/// `raw_body` and `formats` cover every body row, skipped ones included;
/// the returned mask covers only the kept rows, in order.
pub fn percentage_mask(
    raw_body: &[Vec<CellValue>],
    formats: &FormatGrid,
    skipped: &BTreeSet<usize>,
) -> Vec<Vec<bool>> {
    raw_body
        .iter()
        .enumerate()
        .filter(|(index, _)| !skipped.contains(index))
        .map(|(index, row)| {
            row.iter()
                .enumerate()
                .map(|(column, cell)| {
                    cell.is_numeric()
                        && formats
                            .get(index)
                            .and_then(|formats| formats.get(column))
                            .and_then(Option::as_deref)
                            .is_some_and(|format| format.contains('%'))
                })
                .collect()
        })
        .collect()
}

/// Multiplies flagged numeric values by 100. Returns the number of columns
/// that were rescaled as a whole.
pub fn rescale_percentages(columns: &mut [Vec<Value>], mask: &[Vec<bool>]) -> usize {
    let mut whole_columns = 0;
    for (column, values) in columns.iter_mut().enumerate() {
        let flagged = |row: usize| {
            mask.get(row)
                .and_then(|flags| flags.get(column))
                .copied()
                .unwrap_or(false)
        };
        let whole = !values.is_empty() && (0..values.len()).all(flagged);
        if whole {
            whole_columns += 1;
        }
        for (row, value) in values.iter_mut().enumerate() {
            if whole || flagged(row) {
                *value = scale(value);
            }
        }
    }
    whole_columns
}

fn scale(value: &Value) -> Value {
    match value {
        Value::Integer(number) => number
            .checked_mul(100)
            .map(Value::Integer)
            .unwrap_or(Value::Float(*number as f64 * 100.0)),
        Value::Float(number) => Value::Float(number * 100.0),
        other => other.clone(),
    }
}
