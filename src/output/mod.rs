//! Output formatting module
//!
//! Renders finished runs for the terminal or other tools.

mod formatter;

pub use formatter::{csv_record, OutputFormat, ResultFormatter, CSV_HEADER};
