use std::collections::{BTreeMap, HashMap};

use crate::isp::workbook::error::{Result, WorkbookError};
use crate::isp::workbook::model::CellValue;

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Number-format code per cell of a rectangular window, row-major. `None`
/// marks cells without an explicit format.
pub type FormatGrid = Vec<Vec<Option<String>>>;

/// A rectangular block of cells, 1-based and inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellWindow {
    pub first_row: u32,
    pub last_row: u32,
    pub first_column: u32,
    pub last_column: u32,
}

impl CellWindow {
    pub fn contains(&self, row: u32, column: u32) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_column..=self.last_column).contains(&column)
    }

    pub fn height(&self) -> usize {
        (self.last_row + 1).saturating_sub(self.first_row) as usize
    }

    pub fn width(&self) -> usize {
        (self.last_column + 1).saturating_sub(self.first_column) as usize
    }

    /// An all-`None` grid of this window's shape.
    pub fn empty_grid(&self) -> FormatGrid {
        vec![vec![None; self.width()]; self.height()]
    }
}

/// The values of one worksheet, anchored at A1.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    /// Creates a sheet whose first row is sheet row 1 and whose first cell in
    /// each row is column A.
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Highest populated row, 1-based; zero for an empty sheet.
    pub fn max_row(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Highest populated column, 1-based; zero for an empty sheet.
    pub fn max_column(&self) -> u32 {
        self.rows.iter().map(Vec::len).max().unwrap_or(0) as u32
    }

    /// The cell at a 1-based position. Positions outside the populated part
    /// of the sheet, and column or row zero, read as empty.
    pub fn cell(&self, row: u32, column: u32) -> &CellValue {
        if row == 0 || column == 0 {
            return &EMPTY_CELL;
        }
        self.rows
            .get((row - 1) as usize)
            .and_then(|cells| cells.get((column - 1) as usize))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// Read-only access to an open workbook.
///
/// Implementations may cache parsed sheets, which is why reads take
/// `&mut self`. A handle is meant to be used from one thread; open another
/// handle for parallel extraction.
pub trait WorkbookSource {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// The values of a sheet, failing with `SheetNotFound` when it is absent.
    fn sheet(&mut self, name: &str) -> Result<&Sheet>;

    /// Number-format codes for a window of a sheet.
    fn number_formats(&mut self, name: &str, window: &CellWindow) -> Result<FormatGrid>;
}

/// A workbook held entirely in memory, for callers that already have cell
/// values at hand and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    order: Vec<String>,
    sheets: HashMap<String, Sheet>,
    formats: HashMap<String, BTreeMap<(u32, u32), String>>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a sheet. Rows start at sheet row 1, cells at column A.
    pub fn with_sheet(mut self, name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let name = name.into();
        if !self.sheets.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.sheets.insert(name.clone(), Sheet::new(name, rows));
        self
    }

    /// Sets the number-format code of one cell (1-based row and column).
    pub fn with_number_format(
        mut self,
        sheet: &str,
        row: u32,
        column: u32,
        format: impl Into<String>,
    ) -> Self {
        self.formats
            .entry(sheet.to_string())
            .or_default()
            .insert((row, column), format.into());
        self
    }
}

impl WorkbookSource for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn sheet(&mut self, name: &str) -> Result<&Sheet> {
        self.sheets
            .get(name)
            .ok_or_else(|| WorkbookError::SheetNotFound {
                sheet: name.to_string(),
            })
    }

    fn number_formats(&mut self, name: &str, window: &CellWindow) -> Result<FormatGrid> {
        if !self.sheets.contains_key(name) {
            return Err(WorkbookError::SheetNotFound {
                sheet: name.to_string(),
            });
        }
        let mut grid = window.empty_grid();
        if let Some(formats) = self.formats.get(name) {
            for (&(row, column), format) in formats {
                if window.contains(row, column) {
                    grid[(row - window.first_row) as usize]
                        [(column - window.first_column) as usize] = Some(format.clone());
                }
            }
        }
        Ok(grid)
    }
}
