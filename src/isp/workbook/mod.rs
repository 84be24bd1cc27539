pub mod columns;
pub mod config;
pub mod error;
pub mod extract;
pub mod header;
pub mod io;
pub mod locator;
pub mod model;
pub mod parser;
pub mod percentage;
pub mod rows;
pub mod sanitise;
pub mod validate;
pub mod version;

pub use error::{Result, WorkbookError};
