pub mod csv_write;
pub mod excel_read;
pub(crate) mod number_formats;
pub mod region;
pub mod source;
