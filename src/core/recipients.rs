//! Phone number and email address validation
//!
//! Recipients are validated per channel and formatted into a canonical form
//! so that different spellings of the same recipient compare equal:
//!
//! - UK mobile numbers become `+447xxxxxxxxx`
//! - email addresses are trimmed and lowercased
//!
//! [`canonical_form`] is memoized because whitelist checks call it for every
//! recipient against every whitelist entry.

use crate::core::cache::{memoize, BoundedCache};
use crate::types::{PhoneError, RecipientError, TemplateType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Mutex;

/// No whitespace, quotes, semicolons or extra `@`; no underscore in the
/// domain; ends in a 2-10 letter top level domain
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^[^\s";@]+@[^\s";@_]*\.[a-z]{2,10}$"#).expect("email pattern is valid")
});

const UK_MOBILE_PREFIXES: [&str; 5] = ["7", "07", "447", "4407", "00447"];

const SUBSCRIBER_DIGITS: usize = 9;

const CANONICAL_CACHE_CAPACITY: usize = 512;

static CANONICAL_CACHE: Lazy<Mutex<BoundedCache<String, String>>> =
    Lazy::new(|| Mutex::new(BoundedCache::new(CANONICAL_CACHE_CAPACITY)));

/// Validate a UK mobile number, returning the nine subscriber digits after the `7`
pub fn validate_phone(number: &str) -> Result<String, RecipientError> {
    let stripped: String = number
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | ' ' | '-'))
        .collect();
    let digits = stripped.trim_start_matches('+').trim_start_matches('0');

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PhoneError::NonDigit.into());
    }

    if !UK_MOBILE_PREFIXES
        .iter()
        .any(|prefix| digits.starts_with(prefix))
    {
        return Err(PhoneError::NotUkMobile.into());
    }

    let subscriber = digits
        .split_once('7')
        .map(|(_, rest)| rest)
        .unwrap_or_default();

    match subscriber.len() {
        SUBSCRIBER_DIGITS => Ok(subscriber.to_string()),
        n if n > SUBSCRIBER_DIGITS => Err(PhoneError::TooManyDigits.into()),
        _ => Err(PhoneError::TooFewDigits.into()),
    }
}

/// International format: `+447` followed by the subscriber digits
pub fn format_phone(subscriber: &str) -> String {
    format!("+447{}", subscriber)
}

/// Human readable format, e.g. `07123 456 789`
pub fn format_phone_human(subscriber: &str) -> String {
    let groups: Vec<String> = subscriber
        .chars()
        .collect::<Vec<_>>()
        .chunks(3)
        .map(|chunk| chunk.iter().collect())
        .collect();
    format!("07{}", groups.join(" "))
}

pub fn validate_and_format_phone(number: &str, human_readable: bool) -> Result<String, RecipientError> {
    let subscriber = validate_phone(number)?;
    if human_readable {
        Ok(format_phone_human(&subscriber))
    } else {
        Ok(format_phone(&subscriber))
    }
}

/// Validate an email address, returning it unchanged
pub fn validate_email(email_address: &str) -> Result<String, RecipientError> {
    if !EMAIL.is_match(email_address) || email_address.contains("..") {
        return Err(RecipientError::InvalidEmail);
    }
    Ok(email_address.to_string())
}

pub fn format_email(email_address: &str) -> String {
    email_address.trim().to_lowercase()
}

pub fn validate_and_format_email(email_address: &str) -> Result<String, RecipientError> {
    validate_email(email_address).map(|email| format_email(&email))
}

/// Validate a recipient for the channel without formatting it
pub fn validate_recipient(recipient: &str, template_type: TemplateType) -> Result<String, RecipientError> {
    match template_type {
        TemplateType::Email => validate_email(recipient),
        TemplateType::Sms => validate_phone(recipient),
    }
}

/// Validate a recipient for the channel and return its canonical form
pub fn validate_and_format(recipient: &str, template_type: TemplateType) -> Result<String, RecipientError> {
    match template_type {
        TemplateType::Email => validate_and_format_email(recipient),
        TemplateType::Sms => validate_and_format_phone(recipient, false),
    }
}

/// Canonical form of a recipient of unknown channel
///
/// Tries a phone number first, then an email address; anything else is
/// returned unchanged.
pub fn canonical_form(recipient: &str) -> String {
    memoize(&CANONICAL_CACHE, recipient, || {
        validate_and_format_phone(recipient, false)
            .or_else(|_| validate_and_format_email(recipient))
            .unwrap_or_else(|_| recipient.to_string())
    })
}

/// True if the recipient matches a whitelist entry once both are canonicalized
///
/// An empty whitelist means no restriction.
pub fn in_whitelist<S: AsRef<str>>(recipient: &str, whitelist: &[S]) -> bool {
    if whitelist.is_empty() {
        return true;
    }
    let recipient = canonical_form(recipient);
    whitelist
        .iter()
        .any(|allowed| canonical_form(allowed.as_ref()) == recipient)
}
