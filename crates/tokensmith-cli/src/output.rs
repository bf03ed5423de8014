//! Output formatting for command results

use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliResult;

/// Render `value` in the selected format
///
/// # Errors
///
/// Returns [`CliError::Json`](crate::error::CliError::Json) if serialization fails.
pub fn render(format: OutputFormat, value: &Value) -> CliResult<String> {
    Ok(match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Json => serde_json::to_string(value)?,
    })
}

/// Print `value` to stdout in the selected format
///
/// # Errors
///
/// Same as [`render`].
pub fn display(format: OutputFormat, value: &Value) -> CliResult<()> {
    println!("{}", render(format, value)?);
    Ok(())
}
