//! I/O module
//!
//! Handles CSV parsing and report output.
//!
//! # Components
//!
//! - `csv_format` - The recipient CSV dialect and a lazy row reader over in-memory text
//! - `report` - CSV serialization of annotated rows and the validation summary

pub mod csv_format;
pub mod report;

pub use csv_format::{column_headers, parse_rows, trim_file_data, RowReader};
pub use report::{write_annotated_rows_csv, write_summary_csv, ReportSummary};
