//! Recipient CSV validator
//!
//! Command-line interface for checking a recipient list before sending.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- recipients.csv > report.csv
//! cargo run -- --type email --placeholder name recipients.csv > report.csv
//! cargo run -- --content "Hi ((name)), your code is ((code))" --character-limit 160 recipients.csv
//! RUST_LOG=debug cargo run -- --whitelist 07700900460 recipients.csv
//! ```
//!
//! The program reads the CSV file, validates every row against the chosen
//! channel and template, writes the rows to look at (rows with errors first)
//! to stdout and a one-line summary to stderr.
//!
//! # Exit Codes
//!
//! - 0: The list can be sent
//! - 1: Error (missing arguments, file not found, file not readable, etc.)
//! - 2: The list has validation errors

use recipient_csv::cli;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // Logs go to stderr so stdout stays a clean report
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let args = cli::parse_args();

    let mut output = std::io::stdout();
    let mut summary_output = std::io::stderr();
    match cli::run(&args, &mut output, &mut summary_output) {
        Ok(summary) => process::exit(cli::exit_code(&summary)),
        Err(e) => {
            tracing::error!(error = %e, "recipient list could not be processed");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
