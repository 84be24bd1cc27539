use crate::isp::workbook::model::CellValue;
use crate::isp::workbook::sanitise::Sanitiser;

/// Joins the fragments of a multi-row header.
pub const HEADER_SEPARATOR: &str = "_";

/// One flat column name per column of a table's range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatHeader(Vec<String>);

impl FlatHeader {
    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn into_names(self) -> Vec<String> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names that occur more than once, each listed once in first-seen order.
    pub fn duplicates(&self) -> Vec<String> {
        let mut repeated: Vec<String> = Vec::new();
        for (index, name) in self.0.iter().enumerate() {
            if self.0[..index].contains(name) && !repeated.contains(name) {
                repeated.push(name.clone());
            }
        }
        repeated
    }
}

/// Builds the flat header from the raw header rows of a region.
///
/// With one row each label is sanitised as it stands. With several, the
/// rows are folded top to bottom: the top row spreads labels rightward over
/// merged cells, intermediate rows spread only under a blank above and drop
/// labels repeated from the row above, and the last row drops labels equal
/// to the already processed row above. Fragments are then joined per column
/// with [`HEADER_SEPARATOR`]. A column left without any fragment is named
/// `Unnamed: <position>`.
pub fn reconstruct(rows: &[Vec<CellValue>], sanitiser: &Sanitiser) -> FlatHeader {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let labels: Vec<Vec<Option<String>>> = rows
        .iter()
        .map(|row| {
            (0..width)
                .map(|column| row.get(column).and_then(|cell| label(cell, sanitiser)))
                .collect()
        })
        .collect();

    let processed = fold_rows(&labels);

    let names = (0..width)
        .map(|column| {
            let fragments: Vec<&str> = processed
                .iter()
                .filter_map(|row| row[column].as_deref())
                .collect();
            if fragments.is_empty() {
                format!("Unnamed: {column}")
            } else {
                fragments.join(HEADER_SEPARATOR)
            }
        })
        .collect();
    FlatHeader(names)
}

fn label(cell: &CellValue, sanitiser: &Sanitiser) -> Option<String> {
    let text = sanitiser.column_name(&cell.label()?);
    (!text.is_empty()).then_some(text)
}

fn fold_rows(labels: &[Vec<Option<String>>]) -> Vec<Vec<Option<String>>> {
    let Some((top, rest)) = labels.split_first() else {
        return Vec::new();
    };
    if rest.is_empty() {
        return vec![top.clone()];
    }

    let mut processed = vec![fill_right(top)];
    let last_index = labels.len() - 1;
    for (offset, row) in rest.iter().enumerate() {
        let index = offset + 1;
        let raw_above = &labels[index - 1];
        let next = if index == last_index {
            let above = &processed[index - 1];
            row.iter()
                .zip(above)
                .map(|(cell, above)| if cell == above { None } else { cell.clone() })
                .collect()
        } else {
            intermediate_row(row, raw_above)
        };
        processed.push(next);
    }
    processed
}

fn fill_right(row: &[Option<String>]) -> Vec<Option<String>> {
    let mut last: Option<String> = None;
    row.iter()
        .map(|cell| {
            if cell.is_some() {
                last = cell.clone();
            }
            last.clone()
        })
        .collect()
}

fn intermediate_row(row: &[Option<String>], raw_above: &[Option<String>]) -> Vec<Option<String>> {
    let mut out: Vec<Option<String>> = Vec::with_capacity(row.len());
    for (column, cell) in row.iter().enumerate() {
        let above = &raw_above[column];
        let value = match cell {
            None if column > 0 && above.is_none() => out[column - 1].clone(),
            None => None,
            Some(_) if column > 0 && cell == above => None,
            Some(_) => cell.clone(),
        };
        out.push(value);
    }
    out
}
