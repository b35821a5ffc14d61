//! Placeholder substitution templates
//!
//! A template is message text containing placeholders written as
//! `((placeholder name))`. The template can:
//! - list its placeholders (subject first, then body, duplicates collapsed)
//! - highlight them for a preview (`formatted`)
//! - substitute bound values (`replaced`), refusing to render while any
//!   placeholder has no value
//! - measure the rendered byte length against a character limit and count
//!   SMS fragments
//!
//! Values are stored in a [`Columns`] map, so `((First Name))` is satisfied by
//! a value bound under `first_name`, `FIRSTNAME` and so on.

use crate::core::columns::{normalize, Columns, NormalizedKey};
use crate::core::traits::{HtmlEmailRenderer, TextEncoder};
use crate::types::{RecipientError, TemplateType};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Anything that looks like `((registration number))`
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\(([^\)\(]+)\)\)").expect("placeholder pattern is valid")
});

static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n|\r").expect("line break pattern is valid"));

static GOVUK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(gov)\.(uk)").expect("GOV.UK pattern is valid"));

pub const PLACEHOLDER_OPENING_TAG: &str = "<span class='placeholder'>";
pub const PLACEHOLDER_CLOSING_TAG: &str = "</span>";

/// Byte length that still fits in a single SMS
pub const SMS_SINGLE_FRAGMENT_LENGTH: usize = 160;
/// Bytes per fragment once a message is split (the rest carries the concatenation header)
pub const SMS_MULTIPART_FRAGMENT_LENGTH: usize = 153;

/// Stored template as loaded from the caller's records
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDefinition {
    pub id: Option<String>,
    pub name: Option<String>,
    pub content: String,
    pub subject: Option<String>,
    pub template_type: TemplateType,
}

impl TemplateDefinition {
    pub fn new(content: impl Into<String>, template_type: TemplateType) -> Self {
        TemplateDefinition {
            id: None,
            name: None,
            content: content.into(),
            subject: None,
            template_type,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// A template with bound personalisation values
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    id: Option<String>,
    name: Option<String>,
    content: String,
    subject: Option<String>,
    template_type: TemplateType,
    values: Columns<Option<String>>,
    prefix: Option<String>,
    content_character_limit: Option<usize>,
}

impl Template {
    pub fn new(definition: TemplateDefinition) -> Self {
        let TemplateDefinition {
            id,
            name,
            content,
            subject,
            template_type,
        } = definition;

        Template {
            id,
            name,
            content,
            subject,
            template_type,
            values: Columns::new(),
            prefix: None,
            content_character_limit: None,
        }
    }

    /// Bind personalisation values; `None` leaves a placeholder unbound
    pub fn with_values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Option<String>>,
    {
        self.values = Columns::from_pairs(values.into_iter().map(|(k, v)| (k, v.into())));
        self
    }

    /// Remove the named values, whatever their spelling
    pub fn drop_values<I, K>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let dropped: Vec<NormalizedKey> = names.into_iter().map(|n| normalize(n.as_ref())).collect();
        self.values = std::mem::take(&mut self.values).filter(|key| !dropped.contains(key));
        self
    }

    /// Service name shown before SMS content; ignored for email
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = match self.template_type {
            TemplateType::Sms => Some(prefix.into()),
            TemplateType::Email => None,
        };
        self
    }

    pub fn with_content_character_limit(mut self, limit: usize) -> Self {
        self.content_character_limit = Some(limit);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn set_subject(&mut self, subject: Option<String>) {
        self.subject = subject;
    }

    pub fn template_type(&self) -> TemplateType {
        self.template_type
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn content_character_limit(&self) -> Option<usize> {
        self.content_character_limit
    }

    pub fn values(&self) -> &Columns<Option<String>> {
        &self.values
    }

    pub fn set_values(&mut self, values: Columns<Option<String>>) {
        self.values = values;
    }

    /// Placeholder names in order of first appearance, subject before body
    pub fn placeholders(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let texts = self.subject.iter().map(String::as_str).chain([self.content.as_str()]);
        for text in texts {
            for captures in PLACEHOLDER.captures_iter(text) {
                let name = &captures[1];
                if !seen.iter().any(|existing| existing == name) {
                    seen.push(name.to_string());
                }
            }
        }
        seen
    }

    /// Each placeholder wrapped in the highlight tag
    pub fn placeholders_highlighted(&self) -> Vec<String> {
        self.placeholders().iter().map(|p| highlight(p)).collect()
    }

    /// Content with placeholders highlighted and line breaks marked, for previews
    pub fn formatted(&self) -> String {
        self.add_prefix(nl2br(&highlight_placeholders(&self.content)))
    }

    pub fn formatted_subject(&self) -> String {
        self.add_prefix(nl2br(&highlight_placeholders(self.subject.as_deref().unwrap_or(""))))
    }

    /// Placeholders that have no bound value
    ///
    /// A value bound as `None` counts as missing; an empty string does not.
    pub fn missing_data(&self) -> Vec<String> {
        self.placeholders()
            .into_iter()
            .filter(|placeholder| self.value_for(placeholder).is_none())
            .collect()
    }

    /// Bound value names that no placeholder refers to, spelled as they were bound
    pub fn additional_data(&self) -> Vec<String> {
        let placeholder_keys: Vec<NormalizedKey> =
            self.placeholders().iter().map(|p| normalize(p)).collect();
        self.values
            .keys()
            .filter(|key| !placeholder_keys.contains(key))
            .map(|key| self.values.name(key).unwrap_or(key.as_str()).to_string())
            .collect()
    }

    /// Content with every placeholder substituted
    ///
    /// # Errors
    ///
    /// `NeededByTemplate` listing every placeholder without a value.
    pub fn replaced(&self) -> Result<String, RecipientError> {
        Ok(self.add_prefix(self.substitute(&self.content)?))
    }

    pub fn replaced_subject(&self) -> Result<String, RecipientError> {
        self.substitute(self.subject.as_deref().unwrap_or(""))
    }

    /// Rendered content with `GOV.UK` broken up so mail clients don't link it
    pub fn replaced_govuk_escaped(&self) -> Result<String, RecipientError> {
        Ok(unlink_govuk_escaped(&self.replaced()?))
    }

    /// Byte length of the raw content
    pub fn content_count(&self) -> usize {
        self.content.len()
    }

    /// Byte length of the rendered content, prefix included
    pub fn replaced_content_count(&self) -> Result<usize, RecipientError> {
        Ok(self.replaced()?.len())
    }

    /// True when a limit is set and the rendered content is longer than it
    ///
    /// Without a limit nothing is rendered, so this never fails.
    pub fn content_too_long(&self) -> Result<bool, RecipientError> {
        match self.content_character_limit {
            Some(limit) => Ok(self.replaced_content_count()? > limit),
            None => Ok(false),
        }
    }

    /// Number of SMS fragments the rendered content takes
    pub fn sms_fragment_count(&self) -> Result<usize, RecipientError> {
        self.ensure_sms()?;
        Ok(sms_fragment_count(self.replaced_content_count()?))
    }

    /// Fragment count after running the rendered content through `encoder`
    pub fn sms_fragment_count_with(&self, encoder: &dyn TextEncoder) -> Result<usize, RecipientError> {
        self.ensure_sms()?;
        Ok(sms_fragment_count(encoder.encode(&self.replaced()?).len()))
    }

    /// Hand the rendered body to an HTML email renderer
    pub fn as_html_email(
        &self,
        renderer: &dyn HtmlEmailRenderer,
        govuk_banner: bool,
    ) -> Result<String, RecipientError> {
        let body = nl2br(&self.replaced_govuk_escaped()?);
        Ok(renderer.render(&body, govuk_banner))
    }

    fn ensure_sms(&self) -> Result<(), RecipientError> {
        match self.template_type {
            TemplateType::Sms => Ok(()),
            TemplateType::Email => Err(RecipientError::NotSmsTemplate),
        }
    }

    fn value_for(&self, placeholder: &str) -> Option<&str> {
        self.values.get(placeholder).and_then(|value| value.as_deref())
    }

    fn substitute(&self, text: &str) -> Result<String, RecipientError> {
        let missing = self.missing_data();
        if !missing.is_empty() {
            return Err(RecipientError::NeededByTemplate {
                placeholders: missing,
            });
        }
        Ok(PLACEHOLDER
            .replace_all(text, |captures: &Captures| {
                self.value_for(&captures[1]).unwrap_or_default().to_string()
            })
            .into_owned())
    }

    fn add_prefix(&self, output: String) -> String {
        match self.prefix.as_deref().map(str::trim) {
            Some(prefix) if !prefix.is_empty() => format!("{}: {}", prefix, output),
            _ => output,
        }
    }
}

/// Fragments needed for a message of `byte_length` bytes
pub fn sms_fragment_count(byte_length: usize) -> usize {
    if byte_length <= SMS_SINGLE_FRAGMENT_LENGTH {
        1
    } else {
        byte_length.div_ceil(SMS_MULTIPART_FRAGMENT_LENGTH)
    }
}

/// Trim, then replace each line break character with `<br>`
pub fn nl2br(value: &str) -> String {
    LINE_BREAK.replace_all(value.trim(), "<br>").into_owned()
}

/// Insert a zero-width space into `GOV.UK` unless it is part of a domain or URL
pub fn unlink_govuk_escaped(message: &str) -> String {
    let mut output = String::with_capacity(message.len() + 3);
    let mut last = 0;

    for captures in GOVUK.captures_iter(message) {
        let (Some(whole), Some(gov), Some(uk)) = (captures.get(0), captures.get(1), captures.get(2))
        else {
            continue;
        };
        let before = message[..whole.start()].chars().next_back();
        let after = message[whole.end()..].chars().next();
        if matches!(before, Some('.') | Some('/')) || matches!(after, Some('/') | Some('?')) {
            continue;
        }
        output.push_str(&message[last..whole.start()]);
        output.push_str(gov.as_str());
        output.push_str(".\u{200B}");
        output.push_str(uk.as_str());
        last = whole.end();
    }

    output.push_str(&message[last..]);
    output
}

fn highlight(placeholder: &str) -> String {
    format!("{}{}{}", PLACEHOLDER_OPENING_TAG, placeholder, PLACEHOLDER_CLOSING_TAG)
}

fn highlight_placeholders(text: &str) -> String {
    PLACEHOLDER
        .replace_all(text, |captures: &Captures| highlight(&captures[1]))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sms(content: &str) -> Template {
        Template::new(TemplateDefinition::new(content, TemplateType::Sms))
    }

    fn email(content: &str) -> Template {
        Template::new(TemplateDefinition::new(content, TemplateType::Email))
    }

    #[rstest]
    #[case::none("Hello", vec![])]
    #[case::single("Hello ((name))", vec!["name"])]
    #[case::ordered_and_deduplicated(
        "((b)) then ((a)) then ((b))",
        vec!["b", "a"]
    )]
    #[case::nested_parens_rejected("(((name)))", vec!["name"])]
    #[case::spaces_in_name("Your ((registration number)) is due", vec!["registration number"])]
    #[case::unclosed("((name)", vec![])]
    fn test_placeholders(#[case] content: &str, #[case] expected: Vec<&str>) {
        assert_eq!(sms(content).placeholders(), expected);
    }

    #[test]
    fn test_placeholders_include_subject_first() {
        let template = Template::new(
            TemplateDefinition::new("Dear ((name)), ((date))", TemplateType::Email)
                .with_subject("((date)) reminder"),
        );
        assert_eq!(template.placeholders(), vec!["date", "name"]);
    }

    #[test]
    fn test_placeholders_follow_content_changes() {
        let mut template = sms("((a))");
        template.set_content("((b))");
        assert_eq!(template.placeholders(), vec!["b"]);
    }

    #[rstest]
    #[case::highlighted(
        "Hello ((name))",
        "Hello <span class='placeholder'>name</span>"
    )]
    #[case::line_breaks("line one\nline two\r\n", "line one<br>line two")]
    #[case::crlf_inside("a\r\nb", "a<br><br>b")]
    fn test_formatted(#[case] content: &str, #[case] expected: &str) {
        assert_eq!(email(content).formatted(), expected);
    }

    #[test]
    fn test_formatted_subject() {
        let template = Template::new(
            TemplateDefinition::new("body", TemplateType::Email).with_subject("Hi ((name))"),
        );
        assert_eq!(
            template.formatted_subject(),
            "Hi <span class='placeholder'>name</span>"
        );
    }

    #[test]
    fn test_placeholders_highlighted() {
        assert_eq!(
            sms("((a)) ((b))").placeholders_highlighted(),
            vec![
                "<span class='placeholder'>a</span>",
                "<span class='placeholder'>b</span>"
            ]
        );
    }

    #[test]
    fn test_replaced_substitutes_values() {
        let template = email("Hello ((name)), see you on ((date))")
            .with_values([("name", "Jo".to_string()), ("date", "Monday".to_string())]);
        assert_eq!(template.replaced().unwrap(), "Hello Jo, see you on Monday");
    }

    #[test]
    fn test_replaced_matches_values_ignoring_case_and_spaces() {
        let template = email("Hello ((First Name))").with_values([("first_name", "Jo".to_string())]);
        assert_eq!(template.replaced().unwrap(), "Hello Jo");
    }

    #[test]
    fn test_replaced_fails_when_value_missing() {
        let template = email("((x)) and ((y))").with_values([("y", "1".to_string())]);
        assert_eq!(
            template.replaced(),
            Err(RecipientError::needed_by_template(["x"]))
        );
    }

    #[test]
    fn test_none_is_unbound_but_empty_string_is_not() {
        let template = email("((a))((b))")
            .with_values([("a", None), ("b", Some(String::new()))]);
        assert_eq!(template.missing_data(), vec!["a"]);

        let template = template.with_values([("a", Some(String::new())), ("b", Some(String::new()))]);
        assert_eq!(template.replaced().unwrap(), "");
    }

    #[test]
    fn test_replaced_subject() {
        let template = Template::new(
            TemplateDefinition::new("body", TemplateType::Email).with_subject("About ((topic))"),
        )
        .with_values([("topic", "tax".to_string())]);
        assert_eq!(template.replaced_subject().unwrap(), "About tax");
    }

    #[test]
    fn test_additional_data() {
        let template = email("((name))").with_values([
            ("Name", "Jo".to_string()),
            ("colour", "red".to_string()),
        ]);
        assert_eq!(template.additional_data(), vec!["colour"]);
    }

    #[test]
    fn test_additional_data_keeps_bound_spelling() {
        let template = email("((name))").with_values([
            ("name", "Jo".to_string()),
            ("Favourite_Colour", "red".to_string()),
        ]);
        assert_eq!(template.additional_data(), vec!["Favourite_Colour"]);
    }

    #[test]
    fn test_drop_values() {
        let template = email("((name))")
            .with_values([("name", "Jo".to_string()), ("colour", "red".to_string())])
            .drop_values(["COLOUR"]);
        assert!(template.additional_data().is_empty());
        assert_eq!(template.values().len(), 1);
    }

    #[rstest]
    #[case::sms_gets_prefix(TemplateType::Sms, "  Service  ", "Service: Hello Jo")]
    #[case::email_never_does(TemplateType::Email, "Service", "Hello Jo")]
    #[case::blank_prefix(TemplateType::Sms, "  ", "Hello Jo")]
    fn test_prefix(#[case] template_type: TemplateType, #[case] prefix: &str, #[case] expected: &str) {
        let template = Template::new(TemplateDefinition::new("Hello ((name))", template_type))
            .with_prefix(prefix)
            .with_values([("name", "Jo".to_string())]);
        assert_eq!(template.replaced().unwrap(), expected);
    }

    #[test]
    fn test_prefix_is_counted_in_length() {
        let template = sms("abc").with_prefix("Svc");
        assert_eq!(template.content_count(), 3);
        assert_eq!(template.replaced_content_count().unwrap(), 8);
    }

    #[rstest]
    #[case::no_limit(None, "x".repeat(1000), false)]
    #[case::under(Some(10), "x".to_string(), false)]
    #[case::at(Some(10), "x".repeat(10), false)]
    #[case::over(Some(10), "x".repeat(30), true)]
    #[case::multibyte_counts_bytes(Some(10), "é".repeat(6), true)]
    fn test_content_too_long(
        #[case] limit: Option<usize>,
        #[case] value: String,
        #[case] expected: bool,
    ) {
        let mut template = sms("((placeholder))").with_values([("placeholder", value)]);
        if let Some(limit) = limit {
            template = template.with_content_character_limit(limit);
        }
        assert_eq!(template.content_too_long().unwrap(), expected);
    }

    #[test]
    fn test_content_too_long_without_limit_skips_rendering() {
        assert_eq!(sms("((unbound))").content_too_long(), Ok(false));
    }

    #[rstest]
    #[case(0, 1)]
    #[case(160, 1)]
    #[case(161, 2)]
    #[case(306, 2)]
    #[case(307, 3)]
    #[case(459, 3)]
    #[case(460, 4)]
    fn test_sms_fragment_count(#[case] byte_length: usize, #[case] expected: usize) {
        assert_eq!(sms_fragment_count(byte_length), expected);
    }

    #[test]
    fn test_template_sms_fragment_count() {
        let template = sms("((body))").with_values([("body", "a".repeat(161))]);
        assert_eq!(template.sms_fragment_count(), Ok(2));
    }

    #[test]
    fn test_sms_fragment_count_rejects_email() {
        assert_eq!(
            email("hi").sms_fragment_count(),
            Err(RecipientError::NotSmsTemplate)
        );
    }

    struct DropNonAscii;

    impl TextEncoder for DropNonAscii {
        fn encode(&self, text: &str) -> String {
            text.chars().filter(char::is_ascii).collect()
        }
    }

    #[test]
    fn test_sms_fragment_count_with_encoder() {
        // 100 two-byte characters would need two fragments unencoded
        let template = sms("((body))").with_values([("body", "é".repeat(100))]);
        assert_eq!(template.sms_fragment_count(), Ok(2));
        assert_eq!(template.sms_fragment_count_with(&DropNonAscii), Ok(1));
    }

    #[rstest]
    #[case::plain("Visit GOV.UK today", "Visit GOV.\u{200B}UK today")]
    #[case::lowercase("gov.uk", "gov.\u{200B}uk")]
    #[case::domain("www.gov.uk", "www.gov.uk")]
    #[case::url_path("gov.uk/tax", "gov.uk/tax")]
    #[case::query("gov.uk?x=1", "gov.uk?x=1")]
    #[case::after_slash("https://gov.uk", "https://gov.uk")]
    fn test_unlink_govuk_escaped(#[case] message: &str, #[case] expected: &str) {
        assert_eq!(unlink_govuk_escaped(message), expected);
    }

    struct Wrapper;

    impl HtmlEmailRenderer for Wrapper {
        fn render(&self, body: &str, govuk_banner: bool) -> String {
            format!("<body banner={}>{}</body>", govuk_banner, body)
        }
    }

    #[test]
    fn test_as_html_email() {
        let template = email("Hi ((name))\nSee GOV.UK").with_values([("name", "Jo".to_string())]);
        assert_eq!(
            template.as_html_email(&Wrapper, false).unwrap(),
            "<body banner=false>Hi Jo<br>See GOV.\u{200B}UK</body>"
        );
    }

    #[test]
    fn test_metadata() {
        let mut definition = TemplateDefinition::new("x", TemplateType::Sms);
        definition.id = Some("1234".to_string());
        definition.name = Some("Reminder".to_string());
        let template = Template::new(definition);

        assert_eq!(template.id(), Some("1234"));
        assert_eq!(template.name(), Some("Reminder"));
        assert_eq!(template.template_type(), TemplateType::Sms);
    }
}
