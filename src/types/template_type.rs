//! Delivery channel types
//!
//! A template is sent either by email or by SMS. The channel decides which
//! CSV column holds the recipient and how that recipient is validated.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Channel a template is delivered over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    Email,
    Sms,
}

impl TemplateType {
    /// Name of the CSV column holding the recipient for this channel
    pub fn recipient_column(self) -> &'static str {
        match self {
            TemplateType::Email => "email address",
            TemplateType::Sms => "phone number",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateType::Email => "email",
            TemplateType::Sms => "sms",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "email" => Ok(TemplateType::Email),
            "sms" => Ok(TemplateType::Sms),
            other => Err(format!("Invalid template type: '{}'", other)),
        }
    }
}
