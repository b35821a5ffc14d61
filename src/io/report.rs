//! Report output for a validated recipient list
//!
//! Two CSV documents are produced:
//! - the annotated rows chosen for display, one line per row with the
//!   original cell values and a combined `errors` column
//! - a one-line summary of the list-level checks
//!
//! Both writers take a `&mut dyn Write` so they can target stdout, stderr or
//! an in-memory buffer in tests.

use crate::core::columns::Row;
use crate::core::recipient_csv::RecipientCsv;
use crate::types::RecipientError;
use csv::Writer;
use serde::Serialize;
use std::io::Write;

/// Error text for a row whose rendered message is over the character limit
pub const MESSAGE_TOO_LONG: &str = "Message too long";

/// List-level outcome of validating a recipient list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub rows: usize,
    pub rows_with_errors: usize,
    pub rows_with_missing_data: usize,
    pub rows_with_bad_recipients: usize,
    pub rows_with_message_too_long: usize,
    /// Required columns absent from the file, joined with `; `
    pub missing_column_headers: String,
    pub too_many_rows: bool,
    pub more_rows_than_can_send: bool,
    pub allowed_to_send_to: bool,
    pub has_errors: bool,
}

impl From<&RecipientCsv> for ReportSummary {
    fn from(recipients: &RecipientCsv) -> Self {
        let missing: Vec<String> = recipients.missing_column_headers().into_iter().collect();

        ReportSummary {
            rows: recipients.annotated_rows().len(),
            rows_with_errors: recipients.rows_with_errors().len(),
            rows_with_missing_data: recipients.rows_with_missing_data().len(),
            rows_with_bad_recipients: recipients.rows_with_bad_recipients().len(),
            rows_with_message_too_long: recipients.rows_with_message_too_long().len(),
            missing_column_headers: missing.join("; "),
            too_many_rows: recipients.too_many_rows(),
            more_rows_than_can_send: recipients.more_rows_than_can_send(),
            allowed_to_send_to: recipients.allowed_to_send_to(),
            has_errors: recipients.has_errors(),
        }
    }
}

/// Combined error text for one row, in header order
fn row_errors(row: &Row, headers: &[String]) -> String {
    let mut errors: Vec<String> = headers
        .iter()
        .filter_map(|header| {
            let error = row.get(header)?.error.as_deref()?;
            Some(format!("{}: {}", header, error))
        })
        .collect();

    if !row.unrendered_placeholders().is_empty() {
        errors.push(format!("Missing: {}", row.unrendered_placeholders().join(", ")));
    }
    if row.message_too_long() {
        errors.push(MESSAGE_TOO_LONG.to_string());
    }
    errors.join("; ")
}

/// Write the rows to show to CSV
///
/// If any row has an error, the first rows with errors are written (capped
/// at `max_errors_shown`); otherwise the first `max_initial_rows_shown` rows.
/// Columns are `row`, the file's headers as written, then `errors`. Row
/// numbers are 1-based data row positions.
///
/// # Arguments
///
/// * `recipients` - The validated recipient list
/// * `output` - Mutable reference to a writer for the report
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(RecipientError::Io)` if a write error occurred
pub fn write_annotated_rows_csv(
    recipients: &RecipientCsv,
    output: &mut dyn Write,
) -> Result<(), RecipientError> {
    let headers = recipients.column_headers();
    let mut writer = Writer::from_writer(output);

    let header_record = std::iter::once("row")
        .chain(headers.iter().map(String::as_str))
        .chain(std::iter::once("errors"));
    writer
        .write_record(header_record)
        .map_err(|e| RecipientError::io(format!("Failed to write report header: {}", e)))?;

    let rows: Vec<&Row> = if recipients.rows_with_errors().is_empty() {
        recipients.initial_annotated_rows().collect()
    } else {
        recipients.initial_annotated_rows_with_errors().collect()
    };

    for row in rows {
        let mut record = Vec::with_capacity(headers.len() + 2);
        record.push((row.index + 1).to_string());
        for header in &headers {
            let value = row
                .get(header)
                .and_then(|cell| cell.data.clone())
                .unwrap_or_default();
            record.push(value);
        }
        record.push(row_errors(row, &headers));

        writer
            .write_record(&record)
            .map_err(|e| RecipientError::io(format!("Failed to write report row: {}", e)))?;
    }

    writer
        .flush()
        .map_err(|e| RecipientError::io(format!("Failed to flush output: {}", e)))?;

    Ok(())
}

/// Write the summary as a single-record CSV with a header line
pub fn write_summary_csv(summary: &ReportSummary, output: &mut dyn Write) -> Result<(), RecipientError> {
    let mut writer = Writer::from_writer(output);
    writer
        .serialize(summary)
        .map_err(|e| RecipientError::io(format!("Failed to write summary: {}", e)))?;
    writer
        .flush()
        .map_err(|e| RecipientError::io(format!("Failed to flush output: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::recipient_csv::RecipientCsvOptions;
    use crate::core::template::{Template, TemplateDefinition};
    use crate::types::TemplateType;

    fn report(recipients: &RecipientCsv) -> String {
        let mut output = Vec::new();
        write_annotated_rows_csv(recipients, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_report_of_valid_list_shows_initial_rows() {
        let recipients = RecipientCsv::new(
            "phone number,name\n07700900460,Jo\n07700900461,Sam\n07700900462,Al",
            TemplateType::Sms,
            RecipientCsvOptions::default()
                .with_placeholders(["name"])
                .with_max_initial_rows_shown(2),
        );

        assert_eq!(
            report(&recipients),
            "row,phone number,name,errors\n1,07700900460,Jo,\n2,07700900461,Sam,\n"
        );
    }

    #[test]
    fn test_report_shows_only_rows_with_errors() {
        let recipients = RecipientCsv::new(
            "email address,name\ntest@example.com,Jo\nexample.com,\nok@example.com,Al",
            TemplateType::Email,
            RecipientCsvOptions::default().with_placeholders(["name"]),
        );

        assert_eq!(
            report(&recipients),
            "row,email address,name,errors\n\
             2,example.com,,email address: Not a valid email address; name: Missing\n"
        );
    }

    #[test]
    fn test_report_lists_template_errors() {
        let template = Template::new(TemplateDefinition::new("((name)) ((code))", TemplateType::Sms))
            .with_content_character_limit(5);
        let recipients = RecipientCsv::new(
            "phone number,name,code\n07700900460,Jo\n07700900461,Samantha,1",
            TemplateType::Sms,
            RecipientCsvOptions::default().with_template(template),
        );

        assert_eq!(
            report(&recipients),
            "row,phone number,name,code,errors\n\
             1,07700900460,Jo,,Missing: code\n\
             2,07700900461,Samantha,1,Message too long\n"
        );
    }

    #[test]
    fn test_summary() {
        let recipients = RecipientCsv::new(
            "phone number\n07700900460\n+44 123",
            TemplateType::Sms,
            RecipientCsvOptions::default().with_placeholders(["name"]),
        );
        let summary = ReportSummary::from(&recipients);

        assert_eq!(summary.rows, 2);
        assert_eq!(summary.rows_with_bad_recipients, 1);
        assert_eq!(summary.rows_with_errors, 1);
        assert_eq!(summary.missing_column_headers, "name");
        assert!(summary.allowed_to_send_to);
        assert!(summary.has_errors);

        let mut output = Vec::new();
        write_summary_csv(&summary, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "rows,rows_with_errors,rows_with_missing_data,rows_with_bad_recipients,\
                 rows_with_message_too_long,missing_column_headers,too_many_rows,\
                 more_rows_than_can_send,allowed_to_send_to,has_errors"
            )
        );
        assert_eq!(lines.next(), Some("2,1,0,1,0,name,false,false,true,true"));
    }
}
