//! Interfaces for collaborators that live outside this crate
//!
//! Rendering the final HTML email and restricting SMS text to a safe
//! character set are done by other components. Templates only need to hand
//! text to them, so they are modelled as traits.

/// Wraps a rendered email body in the full HTML email markup
pub trait HtmlEmailRenderer {
    /// Render `body` (already substituted, escaped and line-broken)
    ///
    /// `govuk_banner` controls whether the branded banner is shown.
    fn render(&self, body: &str, govuk_banner: bool) -> String;
}

/// Downgrades text to a character set the SMS channel can carry
pub trait TextEncoder {
    /// Return the text as it will be sent
    fn encode(&self, text: &str) -> String;
}
