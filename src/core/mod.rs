//! Core business logic module
//!
//! This module contains the recipient list components:
//! - `columns` - Key normalization and the normalized column map, cells and rows
//! - `cache` - Fixed-capacity memo cache for hot pure functions
//! - `template` - Placeholder extraction, substitution and length checks
//! - `recipients` - Phone number and email address validation
//! - `annotated_rows` - One-pass row annotation and the error sets derived from it
//! - `recipient_csv` - The recipient list engine
//! - `traits` - Interfaces for external renderers and encoders

pub mod annotated_rows;
pub mod cache;
pub mod columns;
pub mod recipient_csv;
pub mod recipients;
pub mod template;
pub mod traits;

pub use annotated_rows::AnnotatedRows;
pub use columns::{normalize, Cell, Columns, NormalizedKey, Row};
pub use recipient_csv::{RecipientCsv, RecipientCsvOptions, MAX_ROWS};
pub use template::{Template, TemplateDefinition};
pub use traits::{HtmlEmailRenderer, TextEncoder};
