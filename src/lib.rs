//! Core library for the isp-workbook-parser command line application.
//!
//! Tables are pulled out of loosely structured "inputs and assumptions"
//! workbooks using declarative locators. Workbook access lives under
//! [`isp::workbook::io`], locators and their YAML configs in
//! [`isp::workbook::locator`] and [`isp::workbook::config`], the extraction
//! pipeline in [`isp::workbook::extract`], and the boundary checks in
//! [`isp::workbook::validate`]. [`isp::workbook::parser::Parser`] ties a
//! workbook to the configs for its version.

pub mod isp;

pub use isp::workbook::{
    Result, WorkbookError, columns, config, error, extract, header, io, locator, model, parser,
    percentage, rows, sanitise, validate, version,
};
