//! Recipient CSV Library
//! # Overview
//!
//! This library validates uploaded recipient spreadsheets and personalises
//! message templates for each row, for email and SMS notifications.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (TemplateType, error enums)
//! - [`cli`] - CLI arguments parsing and the binary's run loop
//! - [`core`] - Business logic components:
//!   - [`core::columns`] - Column-name normalization and normalized maps
//!   - [`core::template`] - Placeholder extraction, substitution and length checks
//!   - [`core::recipients`] - Phone number and email address validation
//!   - [`core::recipient_csv`] - The recipient list engine
//! - [`io`] - The CSV dialect and report output
//!
//! # Row Errors
//!
//! A row can fail in three ways, each reported as its own set of row indices:
//!
//! - **Bad recipient**: the phone number or email address is invalid
//! - **Missing data**: a declared placeholder column is empty, or the template
//!   needs a value the row doesn't have
//! - **Message too long**: the rendered template is over its character limit
//!
//! # List Checks
//!
//! On top of per-row errors, a list can:
//! - lack the recipient column or a placeholder column
//! - have more rows than the sender may still send, or than any list may hold
//! - contain recipients outside a non-empty whitelist

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod types;

pub use core::recipients::{
    in_whitelist, validate_and_format, validate_and_format_email, validate_and_format_phone,
    validate_email, validate_phone, validate_recipient,
};
pub use core::{
    normalize, Cell, Columns, NormalizedKey, RecipientCsv, RecipientCsvOptions, Row, Template,
    TemplateDefinition,
};
pub use io::{write_annotated_rows_csv, ReportSummary};
pub use types::{PhoneError, RecipientError, TemplateType};
