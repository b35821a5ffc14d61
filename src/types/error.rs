//! Error types for recipient validation and template rendering
//!
//! Most validation problems in a recipient list are recorded as data on the
//! annotated rows and never surface as errors. The types here cover the cases
//! that do get returned as `Err`:
//!
//! # Error Categories
//!
//! - **Recipient Errors**: A phone number or email address failed validation
//! - **Template Errors**: Rendering with unbound placeholders, SMS-only operations on email templates
//! - **File I/O Errors**: Reading the CSV file from disk (CLI only)
//! - **CSV Parsing Errors**: Malformed CSV records

use thiserror::Error;

/// Reason a phone number was rejected
///
/// The display text is the message shown against the cell in an annotated row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PhoneError {
    /// Something other than a digit remained after stripping formatting characters
    #[error("Must not contain letters or symbols")]
    NonDigit,

    /// The digits do not start with a UK mobile prefix
    #[error("Not a UK mobile number")]
    NotUkMobile,

    /// More than nine digits follow the mobile prefix
    #[error("Too many digits")]
    TooManyDigits,

    /// Fewer than nine digits follow the mobile prefix
    #[error("Not enough digits")]
    TooFewDigits,
}

/// Main error type for the recipient list engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecipientError {
    /// Phone number failed validation
    #[error("{reason}")]
    InvalidPhone {
        /// Why the number was rejected
        reason: PhoneError,
    },

    /// Email address failed validation
    #[error("Not a valid email address")]
    InvalidEmail,

    /// Rendering was requested while some placeholders have no bound value
    ///
    /// Reachable from row annotation, where it is caught and recorded as
    /// missing data on the row.
    #[error("{}", placeholders.join(", "))]
    NeededByTemplate {
        /// Placeholder names without a value, in order of first appearance
        placeholders: Vec<String>,
    },

    /// Fragment counting was requested on a template that is not an SMS
    #[error("The template needs to have a template type of 'sms'")]
    NotSmsTemplate,

    /// I/O error occurred while reading input
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<PhoneError> for RecipientError {
    fn from(reason: PhoneError) -> Self {
        RecipientError::InvalidPhone { reason }
    }
}

impl From<std::io::Error> for RecipientError {
    fn from(error: std::io::Error) -> Self {
        RecipientError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for RecipientError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        RecipientError::Parse {
            line,
            message: error.to_string(),
        }
    }
}

impl RecipientError {
    /// Create a NeededByTemplate error
    pub fn needed_by_template<I, S>(placeholders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RecipientError::NeededByTemplate {
            placeholders: placeholders.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an Io error
    pub fn io(message: impl Into<String>) -> Self {
        RecipientError::Io {
            message: message.into(),
        }
    }

    /// True for the recipient validation failures (bad phone or email)
    pub fn is_invalid_recipient(&self) -> bool {
        matches!(
            self,
            RecipientError::InvalidPhone { .. } | RecipientError::InvalidEmail
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::non_digit(
        RecipientError::InvalidPhone { reason: PhoneError::NonDigit },
        "Must not contain letters or symbols"
    )]
    #[case::not_uk_mobile(
        RecipientError::InvalidPhone { reason: PhoneError::NotUkMobile },
        "Not a UK mobile number"
    )]
    #[case::too_many_digits(
        RecipientError::InvalidPhone { reason: PhoneError::TooManyDigits },
        "Too many digits"
    )]
    #[case::too_few_digits(
        RecipientError::InvalidPhone { reason: PhoneError::TooFewDigits },
        "Not enough digits"
    )]
    #[case::invalid_email(RecipientError::InvalidEmail, "Not a valid email address")]
    #[case::needed_by_template(
        RecipientError::NeededByTemplate { placeholders: vec!["name".to_string(), "date".to_string()] },
        "name, date"
    )]
    #[case::not_sms(
        RecipientError::NotSmsTemplate,
        "The template needs to have a template type of 'sms'"
    )]
    #[case::io_error(
        RecipientError::Io { message: "Permission denied".to_string() },
        "I/O error: Permission denied"
    )]
    #[case::parse_error_with_line(
        RecipientError::Parse { line: Some(42), message: "Invalid field".to_string() },
        "CSV parse error at line 42: Invalid field"
    )]
    #[case::parse_error_without_line(
        RecipientError::Parse { line: None, message: "Invalid field".to_string() },
        "CSV parse error: Invalid field"
    )]
    fn test_error_display(#[case] error: RecipientError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_needed_by_template_helper() {
        assert_eq!(
            RecipientError::needed_by_template(["x"]),
            RecipientError::NeededByTemplate {
                placeholders: vec!["x".to_string()]
            }
        );
    }

    #[rstest]
    #[case::phone(PhoneError::TooFewDigits.into(), true)]
    #[case::email(RecipientError::InvalidEmail, true)]
    #[case::template(RecipientError::NotSmsTemplate, false)]
    fn test_is_invalid_recipient(#[case] error: RecipientError, #[case] expected: bool) {
        assert_eq!(error.is_invalid_recipient(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: RecipientError = io_error.into();
        assert!(matches!(error, RecipientError::Io { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }
}
