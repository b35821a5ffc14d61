//! Recipient list engine
//!
//! `RecipientCsv` takes the raw text of an uploaded spreadsheet and answers
//! every question the upload flow asks about it: which headers are missing,
//! which rows have bad recipients or missing personalisation, whether the
//! list is too big or goes beyond the sender's whitelist, and finally the
//! recipients and personalisation to queue.
//!
//! # Phases
//!
//! 1. **Construction** parses the header row and annotates every data row once
//!    ([`AnnotatedRows`]). The error sets and preview accessors all read from
//!    that cached annotation.
//! 2. **Bulk accessors** (`recipients`, `personalisation`, ...) re-parse the
//!    raw text lazily, one row at a time, and never touch the annotation.
//!
//! Changing `placeholders` or `whitelist` after construction only affects the
//! derivations that read them directly (`missing_column_headers`, the bulk
//! accessors, whitelist checks). The annotation is never recomputed.

use crate::core::annotated_rows::AnnotatedRows;
use crate::core::columns::{normalize, Columns, NormalizedKey, Row};
use crate::core::recipients::in_whitelist;
use crate::core::template::{Template, PLACEHOLDER_CLOSING_TAG, PLACEHOLDER_OPENING_TAG};
use crate::io::csv_format::{column_headers, parse_rows, trim_file_data};
use crate::types::TemplateType;
use std::collections::BTreeSet;
use tracing::debug;

/// Largest list that can be sent in one go
pub const MAX_ROWS: usize = 50_000;

/// Personalisation values of one row, restricted to the declared placeholders
pub type Personalisation = Columns<Option<String>>;

/// Options for building a [`RecipientCsv`]
///
/// # Examples
///
/// ```
/// use recipient_csv::{RecipientCsv, RecipientCsvOptions, TemplateType};
///
/// let options = RecipientCsvOptions::default().with_placeholders(["name"]);
/// let recipients = RecipientCsv::new("email address,name\na@b.com,Jo", TemplateType::Email, options);
/// assert!(!recipients.has_errors());
/// ```
#[derive(Debug, Clone)]
pub struct RecipientCsvOptions {
    /// Placeholder columns every row must fill in
    pub placeholders: Vec<String>,
    /// Recipients allowed to be sent to; empty means no restriction
    pub whitelist: Vec<String>,
    /// Template used to check each row's rendered length
    pub template: Option<Template>,
    /// Messages the sender may still send
    pub remaining_messages: usize,
    pub max_rows: usize,
    pub max_errors_shown: usize,
    pub max_initial_rows_shown: usize,
}

impl Default for RecipientCsvOptions {
    fn default() -> Self {
        Self {
            placeholders: Vec::new(),
            whitelist: Vec::new(),
            template: None,
            remaining_messages: usize::MAX,
            max_rows: MAX_ROWS,
            max_errors_shown: 20,
            max_initial_rows_shown: 10,
        }
    }
}

impl RecipientCsvOptions {
    pub fn with_placeholders<I, S>(mut self, placeholders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.placeholders = placeholders.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_whitelist<I, S>(mut self, whitelist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = whitelist.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_remaining_messages(mut self, remaining_messages: usize) -> Self {
        self.remaining_messages = remaining_messages;
        self
    }

    pub fn with_max_errors_shown(mut self, max_errors_shown: usize) -> Self {
        self.max_errors_shown = max_errors_shown;
        self
    }

    pub fn with_max_initial_rows_shown(mut self, max_initial_rows_shown: usize) -> Self {
        self.max_initial_rows_shown = max_initial_rows_shown;
        self
    }
}

/// A recipient list parsed from CSV text and validated against a template
#[derive(Debug, Clone)]
pub struct RecipientCsv {
    file_data: String,
    template_type: TemplateType,
    recipient_column: NormalizedKey,
    placeholders: Vec<String>,
    placeholder_keys: Vec<NormalizedKey>,
    whitelist: Vec<String>,
    template: Option<Template>,
    remaining_messages: usize,
    max_rows: usize,
    max_errors_shown: usize,
    max_initial_rows_shown: usize,
    annotated: AnnotatedRows,
}

impl RecipientCsv {
    /// Parse and annotate a recipient list
    ///
    /// Leading and trailing separators and whitespace are stripped from the
    /// text first. This is the only step whose memory grows with the number
    /// of rows.
    pub fn new(file_data: &str, template_type: TemplateType, options: RecipientCsvOptions) -> Self {
        let RecipientCsvOptions {
            placeholders,
            whitelist,
            mut template,
            remaining_messages,
            max_rows,
            max_errors_shown,
            max_initial_rows_shown,
        } = options;

        let file_data = trim_file_data(file_data).to_string();
        let placeholder_keys = normalize_all(&placeholders);
        let annotated =
            AnnotatedRows::annotate(&file_data, template_type, &placeholder_keys, template.as_mut());

        debug!(
            rows = annotated.len(),
            placeholders = placeholders.len(),
            whitelist = whitelist.len(),
            "recipient list loaded"
        );

        RecipientCsv {
            file_data,
            template_type,
            recipient_column: normalize(template_type.recipient_column()),
            placeholders,
            placeholder_keys,
            whitelist,
            template,
            remaining_messages,
            max_rows,
            max_errors_shown,
            max_initial_rows_shown,
            annotated,
        }
    }

    pub fn file_data(&self) -> &str {
        &self.file_data
    }

    pub fn template_type(&self) -> TemplateType {
        self.template_type
    }

    /// Display name of the column holding recipients for this channel
    pub fn recipient_column_header(&self) -> &'static str {
        self.template_type.recipient_column()
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Replace the declared placeholders
    ///
    /// Affects `missing_column_headers` and the personalisation accessors; the
    /// existing annotation is kept as it was built.
    pub fn set_placeholders<I, S>(&mut self, placeholders: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.placeholders = placeholders.into_iter().map(Into::into).collect();
        self.placeholder_keys = normalize_all(&self.placeholders);
    }

    pub fn whitelist(&self) -> &[String] {
        &self.whitelist
    }

    /// Replace the whitelist; the entries are collected so they can be read repeatedly
    pub fn set_whitelist<I, S>(&mut self, whitelist: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = whitelist.into_iter().map(Into::into).collect();
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn remaining_messages(&self) -> usize {
        self.remaining_messages
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn annotated(&self) -> &AnnotatedRows {
        &self.annotated
    }

    pub fn annotated_rows(&self) -> &[Row] {
        self.annotated.rows()
    }

    /// True if anything would stop the list being sent
    pub fn has_errors(&self) -> bool {
        !self.missing_column_headers().is_empty()
            || self.more_rows_than_can_send()
            || self.too_many_rows()
            || !self.allowed_to_send_to()
            || !self.rows_with_missing_data().is_empty()
            || !self.rows_with_bad_recipients().is_empty()
            || !self.rows_with_message_too_long().is_empty()
    }

    /// True if there is no whitelist or every recipient is on it
    pub fn allowed_to_send_to(&self) -> bool {
        self.whitelist.is_empty()
            || self
                .recipients()
                .all(|recipient| in_whitelist(recipient.as_deref().unwrap_or_default(), &self.whitelist))
    }

    /// Rows whose recipient is not on a non-empty whitelist
    pub fn rows_not_allowed_to_send_to(&self) -> BTreeSet<usize> {
        if self.whitelist.is_empty() {
            return BTreeSet::new();
        }
        self.recipients()
            .enumerate()
            .filter(|(_, recipient)| !in_whitelist(recipient.as_deref().unwrap_or_default(), &self.whitelist))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn rows_with_errors(&self) -> BTreeSet<usize> {
        self.annotated.rows_with_errors()
    }

    pub fn rows_with_missing_data(&self) -> BTreeSet<usize> {
        self.annotated.rows_with_missing_data()
    }

    pub fn rows_with_bad_recipients(&self) -> BTreeSet<usize> {
        self.annotated.rows_with_bad_recipients()
    }

    pub fn rows_with_message_too_long(&self) -> BTreeSet<usize> {
        self.annotated.rows_with_message_too_long()
    }

    pub fn more_rows_than_can_send(&self) -> bool {
        self.annotated.len() > self.remaining_messages
    }

    pub fn too_many_rows(&self) -> bool {
        self.annotated.len() > self.max_rows
    }

    /// The first rows of the list, for previewing
    pub fn initial_annotated_rows(&self) -> impl Iterator<Item = &Row> {
        self.annotated.initial(self.max_initial_rows_shown)
    }

    pub fn annotated_rows_with_errors(&self) -> impl Iterator<Item = &Row> {
        self.annotated.with_errors()
    }

    /// The first rows with errors, for previewing
    pub fn initial_annotated_rows_with_errors(&self) -> impl Iterator<Item = &Row> {
        self.annotated_rows_with_errors().take(self.max_errors_shown)
    }

    /// Rows re-parsed from the raw text
    pub fn rows(&self) -> impl Iterator<Item = Columns<Option<String>>> + '_ {
        parse_rows(&self.file_data)
    }

    pub fn recipients(&self) -> impl Iterator<Item = Option<String>> + '_ {
        self.rows().map(move |row| self.recipient_from_row(&row))
    }

    pub fn personalisation(&self) -> impl Iterator<Item = Personalisation> + '_ {
        self.rows().map(move |row| self.personalisation_from_row(row))
    }

    pub fn recipients_and_personalisation(
        &self,
    ) -> impl Iterator<Item = (Option<String>, Personalisation)> + '_ {
        self.rows().map(move |row| {
            let recipient = self.recipient_from_row(&row);
            (recipient, self.personalisation_from_row(row))
        })
    }

    pub fn enumerated_recipients_and_personalisation(
        &self,
    ) -> impl Iterator<Item = (usize, Option<String>, Personalisation)> + '_ {
        self.recipients_and_personalisation()
            .enumerate()
            .map(|(index, (recipient, personalisation))| (index, recipient, personalisation))
    }

    /// The header row as written in the file
    pub fn column_headers(&self) -> Vec<String> {
        column_headers(&self.file_data)
    }

    /// Headers with declared placeholder columns wrapped in the highlight tag
    pub fn column_headers_with_placeholders_highlighted(&self) -> Vec<String> {
        self.column_headers()
            .into_iter()
            .map(|header| {
                if self.placeholder_keys.contains(&normalize(&header)) {
                    format!("{}{}{}", PLACEHOLDER_OPENING_TAG, header, PLACEHOLDER_CLOSING_TAG)
                } else {
                    header
                }
            })
            .collect()
    }

    /// Required columns (recipient column and placeholders) absent from the header row
    ///
    /// Reported with the spelling the caller used for them.
    pub fn missing_column_headers(&self) -> BTreeSet<String> {
        let present = normalize_all(&self.column_headers());
        let mut seen = Vec::new();

        std::iter::once(self.recipient_column_header())
            .chain(self.placeholders.iter().map(String::as_str))
            .filter(|name| {
                let key = normalize(name);
                if present.contains(&key) || seen.contains(&key) {
                    return false;
                }
                seen.push(key);
                true
            })
            .map(String::from)
            .collect()
    }

    pub fn has_recipient_column(&self) -> bool {
        normalize_all(&self.column_headers()).contains(&self.recipient_column)
    }

    fn recipient_from_row(&self, row: &Columns<Option<String>>) -> Option<String> {
        row.get_key(&self.recipient_column).cloned().flatten()
    }

    fn personalisation_from_row(&self, row: Columns<Option<String>>) -> Personalisation {
        row.filter(|key| self.placeholder_keys.contains(key))
    }
}

fn normalize_all<S: AsRef<str>>(names: &[S]) -> Vec<NormalizedKey> {
    names.iter().map(|name| normalize(name.as_ref())).collect()
}
