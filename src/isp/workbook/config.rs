//! Table locators stored as YAML, one mapping of table name → locator per
//! file, with a directory of such files per workbook version.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::isp::workbook::error::{Result, WorkbookError};
use crate::isp::workbook::locator::{LocatorRecord, TableLocator};

/// Table name → locator, sorted by name.
pub type TableConfigs = BTreeMap<String, TableLocator>;

/// Where to look for the config files of a workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A directory of config files used regardless of workbook version.
    Directory(PathBuf),
    /// A root holding one sub-directory per supported workbook version.
    Versioned(PathBuf),
}

impl ConfigSource {
    /// The config directory to use for a workbook of `version`.
    pub fn resolve(&self, version: &str) -> Result<PathBuf> {
        match self {
            ConfigSource::Directory(path) => Ok(path.clone()),
            ConfigSource::Versioned(root) => {
                let path = root.join(version);
                if path.is_dir() {
                    Ok(path)
                } else {
                    Err(WorkbookError::UnsupportedVersion(version.to_string()))
                }
            }
        }
    }
}

/// Reads one YAML config file. A file with no entries yields an empty map.
pub fn load_yaml(path: &Path) -> Result<TableConfigs> {
    let text = fs::read_to_string(path)?;
    parse_yaml(&text)
}

/// Parses the text of one YAML config file.
pub fn parse_yaml(text: &str) -> Result<TableConfigs> {
    let has_content = text
        .lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with('#') && line != "---");
    if !has_content {
        return Ok(TableConfigs::new());
    }
    let records: Option<BTreeMap<String, LocatorRecord>> = serde_yaml::from_str(text)?;
    records
        .unwrap_or_default()
        .into_iter()
        .map(|(name, record)| {
            let locator = TableLocator::from_record(name.clone(), record)?;
            Ok((name, locator))
        })
        .collect()
}

/// Loads every `.yaml` and `.yml` file of a directory, in file-name order.
/// A table defined in two files is a config error.
#[instrument(level = "debug", skip_all, fields(dir = %dir.display()))]
pub fn load_config_dir(dir: &Path) -> Result<TableConfigs> {
    if !dir.is_dir() {
        return Err(WorkbookError::NotADirectory(dir.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::result::Result<_, _>>()?;
    files.retain(|path| {
        path.is_file()
            && path
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| matches!(extension, "yaml" | "yml"))
    });
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut configs = TableConfigs::new();
    for file in &files {
        for (name, locator) in load_yaml(file)? {
            if configs.contains_key(&name) {
                return Err(WorkbookError::InvalidConfig(format!(
                    "table {name} is defined more than once (again in {})",
                    file.display()
                )));
            }
            configs.insert(name, locator);
        }
    }
    debug!(files = files.len(), tables = configs.len(), "loaded table configs");
    Ok(configs)
}

/// Rewrites each locator's sheet name to the workbook's own spelling,
/// matching case-insensitively.
pub fn resolve_sheet_names(configs: TableConfigs, workbook_sheets: &[String]) -> Result<TableConfigs> {
    configs
        .into_iter()
        .map(|(name, locator)| {
            let wanted = locator.sheet_name().to_lowercase();
            let matches: Vec<&String> = workbook_sheets
                .iter()
                .filter(|sheet| sheet.to_lowercase() == wanted)
                .collect();
            match matches.as_slice() {
                [sheet] => {
                    let sheet = sheet.to_string();
                    Ok((name, locator.with_sheet_name(sheet)))
                }
                [] => Err(WorkbookError::SheetNotFound {
                    sheet: locator.sheet_name().to_string(),
                }),
                several => Err(WorkbookError::InvalidConfig(format!(
                    "sheet name '{}' for table {name} matches several sheets: {several:?}",
                    locator.sheet_name()
                ))),
            }
        })
        .collect()
}
