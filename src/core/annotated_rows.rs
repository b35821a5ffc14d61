//! Annotated row collection
//!
//! Annotation is the one pass over a recipient list that keeps every row in
//! memory. [`AnnotatedRows::annotate`] runs it once; everything else in this
//! module is a read-only derivation over the resulting rows, so the error
//! sets can be computed (and tested) without re-parsing.
//!
//! # Per-cell errors
//!
//! - The recipient column gets the validator's message when the address or
//!   number is invalid
//! - A declared placeholder column gets `"Missing"` when its value is absent
//!   or empty
//! - Every other column is marked `ignore` and never carries an error

use crate::core::columns::{normalize, NormalizedKey, Row};
use crate::core::recipients::validate_recipient;
use crate::core::template::Template;
use crate::io::csv_format::parse_rows;
use crate::types::TemplateType;
use std::collections::BTreeSet;
use tracing::debug;

/// Error recorded against a declared placeholder with no value
pub const MISSING: &str = "Missing";

/// Rows of a recipient list annotated with their validation outcome
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedRows {
    rows: Vec<Row>,
    recipient_column: NormalizedKey,
}

impl AnnotatedRows {
    /// Parse and annotate every row of `text`
    ///
    /// If a template is given, each row's values are bound into it in turn to
    /// check the rendered length; the template is left holding the last row.
    pub fn annotate(
        text: &str,
        template_type: TemplateType,
        placeholder_keys: &[NormalizedKey],
        mut template: Option<&mut Template>,
    ) -> Self {
        let recipient_column = normalize(template_type.recipient_column());

        let mut relevant_keys = placeholder_keys.to_vec();
        relevant_keys.push(recipient_column.clone());

        let rows: Vec<Row> = parse_rows(text)
            .enumerate()
            .map(|(index, values)| {
                Row::new(
                    index,
                    values,
                    |key, value| field_error(key, value, &recipient_column, template_type, placeholder_keys),
                    &relevant_keys,
                    template.as_deref_mut(),
                )
            })
            .collect();

        debug!(rows = rows.len(), %template_type, "annotated recipient list");

        AnnotatedRows {
            rows,
            recipient_column,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows where a non-recipient cell has an error or a template placeholder had no value
    pub fn rows_with_missing_data(&self) -> BTreeSet<usize> {
        self.indices(|row| {
            !row.unrendered_placeholders().is_empty()
                || row
                    .cells()
                    .iter()
                    .any(|(key, cell)| *key != self.recipient_column && cell.has_error())
        })
    }

    /// Rows whose recipient cell has an error
    pub fn rows_with_bad_recipients(&self) -> BTreeSet<usize> {
        self.indices(|row| {
            row.cells()
                .get_key(&self.recipient_column)
                .is_some_and(|cell| cell.has_error())
        })
    }

    pub fn rows_with_message_too_long(&self) -> BTreeSet<usize> {
        self.indices(Row::message_too_long)
    }

    /// Union of missing data, bad recipients and overlong messages
    pub fn rows_with_errors(&self) -> BTreeSet<usize> {
        let mut errors = self.rows_with_missing_data();
        errors.extend(self.rows_with_bad_recipients());
        errors.extend(self.rows_with_message_too_long());
        errors
    }

    /// Rows with an index below `limit`
    pub fn initial(&self, limit: usize) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |row| row.index < limit)
    }

    pub fn with_errors(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|row| row.has_error())
    }

    fn indices<F>(&self, predicate: F) -> BTreeSet<usize>
    where
        F: Fn(&Row) -> bool,
    {
        self.rows
            .iter()
            .filter(|&row| predicate(row))
            .map(|row| row.index)
            .collect()
    }
}

fn field_error(
    key: &NormalizedKey,
    value: Option<&str>,
    recipient_column: &NormalizedKey,
    template_type: TemplateType,
    placeholder_keys: &[NormalizedKey],
) -> Option<String> {
    if key == recipient_column {
        if let Err(error) = validate_recipient(value.unwrap_or_default(), template_type) {
            return Some(error.to_string());
        }
    }

    if !placeholder_keys.contains(key) {
        return None;
    }

    match value {
        None | Some("") => Some(MISSING.to_string()),
        Some(_) => None,
    }
}
