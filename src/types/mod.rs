//! Types module
//!
//! Contains core data structures shared across the crate.
//! This module organizes types into logical submodules:
//! - `template_type`: Delivery channel of a template (email or sms)
//! - `error`: Error types for recipient validation and template rendering

pub mod error;
pub mod template_type;

pub use error::{PhoneError, RecipientError};
pub use template_type::TemplateType;
