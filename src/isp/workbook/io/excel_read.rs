use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use tracing::debug;
use zip::ZipArchive;

use crate::isp::workbook::error::{Result, WorkbookError};
use crate::isp::workbook::io::number_formats::PackageFormats;
use crate::isp::workbook::io::source::{CellWindow, FormatGrid, Sheet, WorkbookSource};
use crate::isp::workbook::model::CellValue;

/// An `.xlsx` workbook opened read-only from disk.
///
/// Sheet values are parsed once per sheet and kept for the life of the
/// handle. Number formats are read from the package only when asked for.
pub struct XlsxWorkbook {
    path: PathBuf,
    reader: Xlsx<BufReader<File>>,
    sheets: HashMap<String, Sheet>,
    package: Option<(ZipArchive<BufReader<File>>, PackageFormats)>,
}

impl XlsxWorkbook {
    /// Opens the workbook at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WorkbookError::MissingInput(path.to_path_buf()));
        }
        let reader: Xlsx<_> = open_workbook(path)?;
        debug!(path = %path.display(), "opened workbook");
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            sheets: HashMap::new(),
            package: None,
        })
    }

    fn read_required_sheet(&mut self, name: &str) -> Result<Range<DataType>> {
        let range_result =
            self.reader
                .worksheet_range(name)
                .ok_or_else(|| WorkbookError::SheetNotFound {
                    sheet: name.to_string(),
                })?;
        let range = range_result.map_err(WorkbookError::from)?;
        Ok(range)
    }

    fn package(&mut self) -> Result<&mut (ZipArchive<BufReader<File>>, PackageFormats)> {
        if self.package.is_none() {
            let file = BufReader::new(File::open(&self.path)?);
            let mut archive = ZipArchive::new(file)?;
            let formats = PackageFormats::load(&mut archive)?;
            self.package = Some((archive, formats));
        }
        self.package
            .as_mut()
            .ok_or_else(|| WorkbookError::InvalidWorkbook("package not loaded".into()))
    }
}

impl WorkbookSource for XlsxWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.reader.sheet_names().to_vec()
    }

    fn sheet(&mut self, name: &str) -> Result<&Sheet> {
        if !self.sheets.contains_key(name) {
            let range = self.read_required_sheet(name)?;
            let sheet = range_to_sheet(name, &range);
            debug!(
                sheet = name,
                max_row = sheet.max_row(),
                max_column = sheet.max_column(),
                "loaded sheet values"
            );
            self.sheets.insert(name.to_string(), sheet);
        }
        self.sheets
            .get(name)
            .ok_or_else(|| WorkbookError::SheetNotFound {
                sheet: name.to_string(),
            })
    }

    fn number_formats(&mut self, name: &str, window: &CellWindow) -> Result<FormatGrid> {
        let (archive, formats) = self.package()?;
        formats.read_window(archive, name, window)
    }
}

/// Places a calamine range on a grid anchored at A1, so sheet coordinates
/// can be used directly regardless of where the used range starts.
fn range_to_sheet(name: &str, range: &Range<DataType>) -> Sheet {
    let (Some((start_row, start_col)), Some((end_row, end_col))) = (range.start(), range.end())
    else {
        return Sheet::new(name, Vec::new());
    };

    let height = (end_row + 1) as usize;
    let width = (end_col + 1) as usize;
    let mut rows = vec![vec![CellValue::Empty; width]; height];
    for (row, col, cell) in range.cells() {
        let value = cell_to_value(cell);
        if !value.is_empty() {
            rows[row + start_row as usize][col + start_col as usize] = value;
        }
    }
    Sheet::new(name, rows)
}

fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(value) => CellValue::String(value.clone()),
        DataType::Float(value) => CellValue::Float(*value),
        DataType::Int(value) => CellValue::Int(*value),
        DataType::Bool(value) => CellValue::Bool(*value),
        DataType::DateTime(serial) => cell
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Float(*serial)),
        DataType::DateTimeIso(text) => cell
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::String(text.clone())),
        DataType::Error(error) => CellValue::Error(format!("{error}")),
        DataType::Empty => CellValue::Empty,
        other => CellValue::String(other.to_string()),
    }
}
