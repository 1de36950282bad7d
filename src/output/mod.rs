use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::transcribe::OutputRecord;

pub mod formatters;

pub use formatters::*;

/// Render records in the requested format
pub fn render(records: &[OutputRecord], format: &OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Json => format_as_json(records)?,
        OutputFormat::Text => records
            .iter()
            .map(format_as_text)
            .collect::<Vec<_>>()
            .join("\n---\n\n"),
        OutputFormat::Srt => records
            .iter()
            .filter_map(|record| record.transcript.as_ref())
            .map(|transcript| transcript.srt_subtitle.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    };

    Ok(content)
}

/// Save rendered records to file
pub fn save_to_file(records: &[OutputRecord], path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(records, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print rendered records to stdout
pub fn print_to_console(records: &[OutputRecord], format: &OutputFormat) -> Result<()> {
    let content = render(records, format)?;
    println!("{}", content);
    Ok(())
}
