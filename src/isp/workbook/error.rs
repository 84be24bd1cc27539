use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, WorkbookError>;

/// Which edge of a declared table fell outside the populated part of a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    FirstHeaderRow,
    EndRow,
    FirstColumn,
    LastColumn,
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::FirstHeaderRow => write!(f, "first header row"),
            Bound::EndRow => write!(f, "end_row"),
            Bound::FirstColumn => write!(f, "first column"),
            Bound::LastColumn => write!(f, "last column"),
        }
    }
}

/// Error type covering the failure cases met while opening a workbook,
/// loading table configuration, extracting a table, or checking that a
/// table's declared location still matches the sheet.
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON serialisation fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when a YAML table config cannot be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Errors bubbled up from the CSV writer.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when the workbook package cannot be opened as a zip archive.
    #[error("workbook package error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Raised when a part of the workbook package is not well-formed XML.
    #[error("workbook XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when a column letter or column range cannot be parsed.
    #[error("invalid column reference '{0}'")]
    InvalidColumn(String),

    /// Raised when a table locator fails validation at construction time.
    #[error("invalid config for table {table}: {reason}")]
    InvalidLocator { table: String, reason: String },

    /// Raised when the set of table configs is inconsistent.
    #[error("invalid table config: {0}")]
    InvalidConfig(String),

    /// Raised when the requested sheet is absent from the workbook.
    #[error("sheet '{sheet}' cannot be found in the workbook")]
    SheetNotFound { sheet: String },

    /// Raised when a row or column lies outside the populated extent of a sheet.
    #[error("the {bound} ({requested}) for table {table} is not within the excel sheet (limit {limit})")]
    RegionOutOfBounds {
        table: String,
        bound: Bound,
        requested: u32,
        limit: u32,
    },

    /// Raised when the cell above the first header row is not blank.
    #[error("there is data or a header above the first header row for table {table}")]
    HeaderAboveRange { table: String },

    /// Raised when the cell below the declared end row is not blank.
    #[error("there is data in the row after the defined table end for table {table}")]
    DataOverrun { table: String },

    /// Raised when the first column of the extracted table has blank cells.
    #[error(
        "the first column of the table {table} contains na values indicating the table end row is incorrectly specified"
    )]
    TableOverrun { table: String },

    /// Raised when the first column of the extracted table runs into notes.
    #[error("the first column of the table {table} contains the sub string '{marker}'")]
    NotesOverrun { table: String, marker: String },

    /// Raised when the last column of the declared range is empty.
    #[error("the last column of the table {table} is empty")]
    EmptyColumn { table: String },

    /// Raised when the column to the right of the declared range holds data.
    #[error("there is data in the column adjacent to the last column in the table {table}")]
    MissingColumnRight { table: String },

    /// Raised when the column to the left of the declared range holds data.
    #[error("there is data in the column adjacent to the first column in the table {table}")]
    MissingColumnLeft { table: String },

    /// Raised when the reconstructed header repeats a column name.
    #[error("there are duplicate column names in the table {table}: {names:?}")]
    DuplicateColumn { table: String, names: Vec<String> },

    /// Raised when a table name is not present in the loaded configs.
    #[error("the table_name ({name}) provided is not in the config for this workbook version{}", suggestion_suffix(.suggestion))]
    UnknownTable {
        name: String,
        suggestion: Option<String>,
    },

    /// Raised when the workbook version has no shipped config directory.
    #[error("the workbook version {0} is not supported")]
    UnsupportedVersion(String),

    /// Raised when tables are saved to a path that is not a directory.
    #[error("the path provided is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Raised after a batch save when one or more tables failed.
    #[error("{} table(s) failed to load:\n{}", .failures.len(), format_failures(.failures))]
    TablesFailed { failures: Vec<(String, String)> },

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl WorkbookError {
    /// Name of the table this error belongs to, when it is table scoped.
    pub fn table(&self) -> Option<&str> {
        match self {
            WorkbookError::InvalidLocator { table, .. }
            | WorkbookError::RegionOutOfBounds { table, .. }
            | WorkbookError::HeaderAboveRange { table }
            | WorkbookError::DataOverrun { table }
            | WorkbookError::TableOverrun { table }
            | WorkbookError::NotesOverrun { table, .. }
            | WorkbookError::EmptyColumn { table }
            | WorkbookError::MissingColumnRight { table }
            | WorkbookError::MissingColumnLeft { table }
            | WorkbookError::DuplicateColumn { table, .. } => Some(table),
            _ => None,
        }
    }

    /// True for failures meaning the declared layout no longer matches the sheet.
    pub fn is_layout_mismatch(&self) -> bool {
        matches!(
            self,
            WorkbookError::RegionOutOfBounds { .. }
                | WorkbookError::HeaderAboveRange { .. }
                | WorkbookError::DataOverrun { .. }
                | WorkbookError::TableOverrun { .. }
                | WorkbookError::NotesOverrun { .. }
                | WorkbookError::EmptyColumn { .. }
                | WorkbookError::MissingColumnRight { .. }
                | WorkbookError::MissingColumnLeft { .. }
                | WorkbookError::DuplicateColumn { .. }
        )
    }
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(". Did you mean '{name}'?"),
        None => String::new(),
    }
}

fn format_failures(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(name, message)| format!("{name}: {message}"))
        .collect::<Vec<_>>()
        .join("\n")
}
