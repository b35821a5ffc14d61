// CLI module
// Command-line interface, argument parsing and the run loop behind the binary

mod args;

pub use args::CliArgs;

use crate::core::recipient_csv::RecipientCsv;
use crate::io::report::{write_annotated_rows_csv, write_summary_csv, ReportSummary};
use crate::types::RecipientError;
use clap::Parser;
use std::fs;
use std::io::Write;
use tracing::info;

/// Exit code when the list has validation errors
pub const EXIT_VALIDATION_ERRORS: i32 = 2;

/// Parse command-line arguments using clap
///
/// If parsing fails (e.g., invalid arguments, missing required arguments, or
/// --help flag), clap displays an error message or help text and exits the
/// process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Validate the input file and write the report
///
/// Reads the whole file, builds a [`RecipientCsv`], writes the annotated rows
/// report to `output` and the summary to `summary_output`.
///
/// # Arguments
///
/// * `args` - Parsed command-line arguments
/// * `output` - Writer for the row report (stdout in the binary)
/// * `summary_output` - Writer for the summary (stderr in the binary)
///
/// # Returns
///
/// * `Ok(ReportSummary)` once both reports are written, whether or not the list has errors
/// * `Err(RecipientError)` if the file cannot be read or output cannot be written
pub fn run(
    args: &CliArgs,
    output: &mut dyn Write,
    summary_output: &mut dyn Write,
) -> Result<ReportSummary, RecipientError> {
    let file_data = fs::read_to_string(&args.input_file)?;
    let recipients = RecipientCsv::new(&file_data, args.template_type, args.to_options());

    write_annotated_rows_csv(&recipients, output)?;

    let summary = ReportSummary::from(&recipients);
    write_summary_csv(&summary, summary_output)?;

    info!(
        path = %args.input_file.display(),
        rows = summary.rows,
        has_errors = summary.has_errors,
        "validated recipient list"
    );
    Ok(summary)
}

/// Process exit code for a completed run
pub fn exit_code(summary: &ReportSummary) -> i32 {
    if summary.has_errors {
        EXIT_VALIDATION_ERRORS
    } else {
        0
    }
}
