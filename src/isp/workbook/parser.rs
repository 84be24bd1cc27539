use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::isp::workbook::config::{
    ConfigSource, TableConfigs, load_config_dir, resolve_sheet_names,
};
use crate::isp::workbook::error::{Result, WorkbookError};
use crate::isp::workbook::extract;
use crate::isp::workbook::io::csv_write::write_table_csv;
use crate::isp::workbook::io::excel_read::XlsxWorkbook;
use crate::isp::workbook::io::source::WorkbookSource;
use crate::isp::workbook::locator::TableLocator;
use crate::isp::workbook::model::Table;
use crate::isp::workbook::version::detect_version;

const SUGGESTION_CUTOFF: f64 = 0.6;

/// Which configured tables to save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSelection {
    All,
    Named(Vec<String>),
}

/// A workbook paired with the table configs that match its version.
pub struct Parser<W: WorkbookSource> {
    source: W,
    version: String,
    config_path: PathBuf,
    configs: TableConfigs,
}

impl Parser<XlsxWorkbook> {
    /// Opens an `.xlsx` workbook and loads its table configs.
    pub fn open(path: &Path, config: ConfigSource) -> Result<Self> {
        Self::new(XlsxWorkbook::open(path)?, config)
    }
}

impl<W: WorkbookSource> Parser<W> {
    /// Detects the workbook version, loads the matching configs and points
    /// each locator at the workbook's spelling of its sheet name.
    #[instrument(level = "info", skip_all)]
    pub fn new(mut source: W, config: ConfigSource) -> Result<Self> {
        let version = detect_version(&mut source)?;
        let config_path = config.resolve(&version)?;
        let configs = load_config_dir(&config_path)?;
        let configs = resolve_sheet_names(configs, &source.sheet_names())?;
        info!(
            %version,
            config_path = %config_path.display(),
            tables = configs.len(),
            "workbook ready"
        );
        Ok(Self {
            source,
            version,
            config_path,
            configs,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn configs(&self) -> &TableConfigs {
        &self.configs
    }

    /// Configured table names grouped by sheet, both sorted.
    pub fn table_names_by_sheet(&self) -> BTreeMap<String, Vec<String>> {
        let mut by_sheet: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, locator) in &self.configs {
            by_sheet
                .entry(locator.sheet_name().to_string())
                .or_default()
                .push(name.clone());
        }
        by_sheet
    }

    /// Extracts a configured table by name.
    pub fn get_table(&mut self, name: &str, run_validation: bool) -> Result<Table> {
        let locator = self
            .configs
            .get(name)
            .cloned()
            .ok_or_else(|| WorkbookError::UnknownTable {
                name: name.to_string(),
                suggestion: suggest_table_name(name, self.configs.keys()),
            })?;
        self.get_table_from_config(&locator, run_validation)
    }

    /// Extracts a table from a locator that need not be in the loaded configs.
    pub fn get_table_from_config(
        &mut self,
        locator: &TableLocator,
        run_validation: bool,
    ) -> Result<Table> {
        extract::extract(&mut self.source, locator, run_validation)
    }

    /// Extracts every configured table in name order.
    pub fn extract_all(&mut self, run_validation: bool) -> Vec<(String, Result<Table>)> {
        extract::extract_all(&mut self.source, self.configs.values(), run_validation)
    }

    /// Writes each selected table to `<directory>/<name>.csv`.
    ///
    /// Every table is attempted; if any fail, the rest are still written and
    /// the failures are reported together as `TablesFailed`.
    #[instrument(
        level = "info",
        skip_all,
        fields(directory = %directory.display(), checks = run_validation)
    )]
    pub fn save_tables(
        &mut self,
        directory: &Path,
        selection: &TableSelection,
        run_validation: bool,
    ) -> Result<Vec<PathBuf>> {
        if directory.exists() && !directory.is_dir() {
            return Err(WorkbookError::NotADirectory(directory.to_path_buf()));
        }
        fs::create_dir_all(directory)?;

        let names: Vec<String> = match selection {
            TableSelection::All => self.configs.keys().cloned().collect(),
            TableSelection::Named(names) => names.clone(),
        };

        let mut written = Vec::new();
        let mut failures = Vec::new();
        for name in names {
            let path = directory.join(format!("{name}.csv"));
            let result = self
                .get_table(&name, run_validation)
                .and_then(|table| write_table_csv(&path, &table));
            match result {
                Ok(()) => written.push(path),
                Err(error) => {
                    warn!(table = %name, %error, "table not saved");
                    failures.push((name, error.to_string()));
                }
            }
        }

        info!(saved = written.len(), failed = failures.len(), "saved tables");
        if failures.is_empty() {
            Ok(written)
        } else {
            Err(WorkbookError::TablesFailed { failures })
        }
    }
}

/// The candidate most similar to `name`, ignoring case, if it is close
/// enough to be a plausible typo. Ties go to the earliest candidate.
pub fn suggest_table_name<'a, I>(name: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let wanted = name.to_lowercase();
    candidates
        .into_iter()
        .map(|candidate| {
            let similarity = strsim::normalized_levenshtein(&wanted, &candidate.to_lowercase());
            (candidate, similarity)
        })
        .filter(|(_, similarity)| *similarity >= SUGGESTION_CUTOFF)
        .min_by(|(_, left), (_, right)| right.total_cmp(left))
        .map(|(candidate, _)| candidate.clone())
}
