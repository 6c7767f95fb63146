//! Shareable renderings of an analysis: JSON and PDF files plus the terminal story.

pub mod json;
pub mod pdf;
pub mod story;

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::usage::AnalysisResult;

pub use json::ExportDocument;

const REPORT_FILE_PREFIX: &str = "ai-usage-report";

/// Export file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Json,
    Pdf,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

/// `ai-usage-report-<YYYY-MM-DD>.<ext>`
pub fn report_file_name(format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "{}-{}.{}",
        REPORT_FILE_PREFIX,
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Render the report in memory
pub fn render(
    analysis: &AnalysisResult,
    format: ExportFormat,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Json => json::render(analysis, generated_at),
        ExportFormat::Pdf => pdf::render(analysis, generated_at),
    }
}

/// Render and write the report into `dir`, returning the written path
pub fn write_report(
    analysis: &AnalysisResult,
    format: ExportFormat,
    dir: &Path,
    generated_at: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    let bytes = render(analysis, format, generated_at)?;
    let path = dir.join(report_file_name(format, generated_at.date_naive()));

    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    fs::write(&path, &bytes).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    debug!(path = %path.display(), bytes = bytes.len(), %format, "wrote report");
    Ok(path)
}
