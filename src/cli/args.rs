use crate::core::recipient_csv::RecipientCsvOptions;
use crate::core::template::{Template, TemplateDefinition};
use crate::types::TemplateType;
use clap::Parser;
use std::path::PathBuf;

/// Validate a recipient list against a message template
#[derive(Parser, Debug)]
#[command(name = "recipient-csv")]
#[command(about = "Validate a recipient CSV file and report rows with errors", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing one recipient per row
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Channel the list is for; decides the recipient column and its validation
    #[arg(
        long = "type",
        value_name = "TYPE",
        default_value = "sms",
        help = "Template type: 'email' or 'sms'"
    )]
    pub template_type: TemplateType,

    /// Placeholder columns every row must fill in
    #[arg(
        long = "placeholder",
        value_name = "NAME",
        help = "Placeholder column required in every row (repeatable)"
    )]
    pub placeholders: Vec<String>,

    /// Template body used to check rendered message length
    #[arg(long = "content", value_name = "TEXT", help = "Template content with ((placeholders))")]
    pub content: Option<String>,

    #[arg(long = "subject", value_name = "TEXT", help = "Template subject (email only)")]
    pub subject: Option<String>,

    #[arg(
        long = "character-limit",
        value_name = "COUNT",
        help = "Maximum rendered message length in bytes"
    )]
    pub character_limit: Option<usize>,

    #[arg(long = "prefix", value_name = "TEXT", help = "Service name prefixed to SMS messages")]
    pub prefix: Option<String>,

    /// Recipients the sender is restricted to
    #[arg(
        long = "whitelist",
        value_name = "RECIPIENT",
        help = "Allowed recipient (repeatable); no whitelist allows everyone"
    )]
    pub whitelist: Vec<String>,

    #[arg(
        long = "remaining-messages",
        value_name = "COUNT",
        help = "Messages the sender may still send (default: unlimited)"
    )]
    pub remaining_messages: Option<usize>,

    #[arg(
        long = "max-errors-shown",
        value_name = "COUNT",
        default_value_t = 20,
        help = "Maximum number of rows with errors in the report"
    )]
    pub max_errors_shown: usize,

    #[arg(
        long = "max-initial-rows-shown",
        value_name = "COUNT",
        default_value_t = 10,
        help = "Number of rows in the report when there are no errors"
    )]
    pub max_initial_rows_shown: usize,
}

impl CliArgs {
    /// Build the template described by `--content` and friends, if any
    pub fn to_template(&self) -> Option<Template> {
        let content = self.content.as_ref()?;

        let mut definition = TemplateDefinition::new(content.clone(), self.template_type);
        if let Some(subject) = &self.subject {
            definition = definition.with_subject(subject.clone());
        }

        let mut template = Template::new(definition);
        if let Some(limit) = self.character_limit {
            template = template.with_content_character_limit(limit);
        }
        if let Some(prefix) = &self.prefix {
            template = template.with_prefix(prefix.clone());
        }
        Some(template)
    }

    /// Create RecipientCsvOptions from CLI arguments
    ///
    /// When no `--placeholder` is given but a template is, the template's own
    /// placeholders are required instead.
    ///
    /// # Returns
    ///
    /// `RecipientCsvOptions` with values from CLI arguments or defaults.
    pub fn to_options(&self) -> RecipientCsvOptions {
        let template = self.to_template();

        let placeholders = match (&template, self.placeholders.is_empty()) {
            (Some(template), true) => template.placeholders(),
            _ => self.placeholders.clone(),
        };

        let mut options = RecipientCsvOptions::default()
            .with_placeholders(placeholders)
            .with_whitelist(self.whitelist.iter().cloned())
            .with_max_errors_shown(self.max_errors_shown)
            .with_max_initial_rows_shown(self.max_initial_rows_shown);

        if let Some(remaining) = self.remaining_messages {
            options = options.with_remaining_messages(remaining);
        }
        if let Some(template) = template {
            options = options.with_template(template);
        }
        options
    }
}
