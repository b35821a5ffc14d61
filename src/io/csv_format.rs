//! CSV dialect for recipient lists
//!
//! This module centralizes the CSV format concerns:
//! - trimming stray separators and whitespace around the whole file
//! - the reader configuration (no quoting, flexible field counts)
//! - stripping leading spaces from every field
//! - mapping each record onto the header row as normalized [`Columns`]
//!
//! Everything reads from an in-memory `&str`, so parsing never touches the
//! filesystem and can be repeated as often as needed.
//!
//! # Dialect
//!
//! - Quote characters are ordinary data
//! - Leading spaces in a field are dropped; trailing spaces are kept
//! - Blank lines are skipped
//! - Short rows leave the remaining columns absent (`None`)
//! - Fields beyond the header row are dropped

use crate::core::columns::{normalize, Columns, NormalizedKey};
use crate::types::RecipientError;
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use tracing::{trace, warn};

/// Characters stripped from both ends of the raw file
const FILE_PADDING: &[char] = &[',', ' ', '\n', '\r', '\t'];

/// Strip leading and trailing separators and whitespace from the raw file
pub fn trim_file_data(file_data: &str) -> &str {
    file_data.trim_matches(FILE_PADDING)
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .quoting(false)
        .flexible(true)
        .has_headers(true)
        .trim(Trim::None)
        .from_reader(text.as_bytes())
}

fn clean_field(field: &str) -> String {
    field.trim_start_matches(' ').to_string()
}

/// The header row as written in the file, or empty for an empty file
pub fn column_headers(text: &str) -> Vec<String> {
    match reader(text).headers() {
        Ok(headers) => headers.iter().map(clean_field).collect(),
        Err(error) => {
            warn!(%error, "could not read CSV header row");
            Vec::new()
        }
    }
}

/// Lazy reader yielding one normalized row per CSV record
///
/// Headers are read and normalized once; each call to `next` parses a single
/// record, so memory stays flat however many rows the text holds.
pub struct RowReader<'a> {
    headers: Vec<String>,
    keys: Vec<NormalizedKey>,
    records: StringRecordsIntoIter<&'a [u8]>,
}

impl<'a> RowReader<'a> {
    /// Read the header row and prepare to stream the remaining records
    ///
    /// # Errors
    ///
    /// Returns `RecipientError::Parse` if the header row cannot be read.
    pub fn new(text: &'a str) -> Result<Self, RecipientError> {
        let mut reader = reader(text);
        let headers: Vec<String> = reader.headers()?.iter().map(clean_field).collect();
        let keys = headers.iter().map(|header| normalize(header)).collect();

        Ok(Self {
            headers,
            keys,
            records: reader.into_records(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn to_columns(&self, record: &StringRecord) -> Columns<Option<String>> {
        if record.len() > self.keys.len() {
            trace!(
                line = record.position().map(|p| p.line()),
                extra = record.len() - self.keys.len(),
                "dropping fields beyond the header row"
            );
        }

        let mut columns = Columns::new();
        for (index, (header, key)) in self.headers.iter().zip(&self.keys).enumerate() {
            columns.insert_named(header, key.clone(), record.get(index).map(clean_field));
        }
        columns
    }
}

impl Iterator for RowReader<'_> {
    type Item = Result<Columns<Option<String>>, RecipientError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(
            record
                .map(|record| self.to_columns(&record))
                .map_err(RecipientError::from),
        )
    }
}

/// Parse every data row, logging and skipping records that cannot be read
pub fn parse_rows(text: &str) -> impl Iterator<Item = Columns<Option<String>>> + '_ {
    let reader = RowReader::new(text)
        .map_err(|error| warn!(%error, "could not read CSV header row"))
        .ok();

    reader.into_iter().flatten().filter_map(|result| match result {
        Ok(row) => Some(row),
        Err(error) => {
            warn!(%error, "skipping malformed CSV record");
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn data(row: &Columns<Option<String>>, key: &str) -> Option<String> {
        row.get(key).cloned().flatten()
    }

    #[rstest]
    #[case::padding(",\n  email address,name\n a@b.com,Jo\n,,\n, ,\n\t", "email address,name\n a@b.com,Jo")]
    #[case::trailing_comma_of_last_row("phone number,name\n07700900460,", "phone number,name\n07700900460")]
    #[case::empty("  \n\n ", "")]
    fn test_trim_file_data(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(trim_file_data(raw), expected);
    }

    #[rstest]
    #[case::simple("phone number,name\n07700900460,Jo", vec!["phone number", "name"])]
    #[case::leading_spaces("email address, name,  colour", vec!["email address", "name", "colour"])]
    #[case::trailing_spaces_kept("first name ,last", vec!["first name ", "last"])]
    #[case::header_only("email address,name", vec!["email address", "name"])]
    #[case::empty("", vec![])]
    fn test_column_headers(#[case] text: &str, #[case] expected: Vec<&str>) {
        assert_eq!(column_headers(text), expected);
    }

    #[test]
    fn test_row_reader_maps_records_onto_headers() {
        let reader = RowReader::new("Phone Number,FIRST_NAME\n07700900460, Jo\n").unwrap();
        assert_eq!(reader.headers(), ["Phone Number", "FIRST_NAME"]);

        let rows: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(data(&rows[0], "phone_number").as_deref(), Some("07700900460"));
        assert_eq!(data(&rows[0], "first name").as_deref(), Some("Jo"));
        assert_eq!(rows[0].name(&normalize("firstname")), Some("FIRST_NAME"));
    }

    #[test]
    fn test_short_rows_leave_columns_absent() {
        let rows: Vec<_> = parse_rows("phone number,name,date\n07700900460,Jo").collect();

        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[0].get("date"), Some(&None));
    }

    #[test]
    fn test_extra_fields_are_dropped() {
        let rows: Vec<_> = parse_rows("email address\na@b.com,surplus,fields").collect();

        assert_eq!(rows[0].len(), 1);
        assert_eq!(data(&rows[0], "email address").as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_quotes_are_ordinary_characters() {
        let rows: Vec<_> = parse_rows("email address,name\n\"a@b.com\",\"Jo, Jr\"").collect();

        assert_eq!(data(&rows[0], "email address").as_deref(), Some("\"a@b.com\""));
        assert_eq!(data(&rows[0], "name").as_deref(), Some("\"Jo"));
    }

    #[rstest]
    #[case::lf("email address\na@b.com\nc@d.com")]
    #[case::crlf("email address\r\na@b.com\r\nc@d.com")]
    #[case::cr("email address\ra@b.com\rc@d.com")]
    #[case::blank_lines("email address\n\na@b.com\n\n\nc@d.com")]
    fn test_line_terminators_and_blank_lines(#[case] text: &str) {
        let recipients: Vec<_> = parse_rows(text)
            .map(|row| data(&row, "email address"))
            .collect();
        assert_eq!(
            recipients,
            vec![Some("a@b.com".to_string()), Some("c@d.com".to_string())]
        );
    }

    #[test]
    fn test_empty_text_has_no_rows() {
        assert_eq!(parse_rows("").count(), 0);
        assert_eq!(parse_rows("email address,name").count(), 0);
    }

    #[test]
    fn test_parse_rows_can_be_consumed_partially() {
        let text = format!("email address\n{}", "a@b.com\n".repeat(1000));
        assert_eq!(parse_rows(&text).take(3).count(), 3);
    }
}
