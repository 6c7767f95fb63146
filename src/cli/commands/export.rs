use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use tracing::error;

use crate::cli::AppContext;
use crate::report::{write_report, ExportFormat};

/// Write the saved analysis as a JSON or PDF report
pub async fn run(ctx: &AppContext, format: ExportFormat, output: &Path, open: bool) -> Result<()> {
    let saved = ctx.require_saved()?;

    let path = write_report(&saved.analysis_data, format, output, Utc::now())
        .inspect_err(|e| error!(error = %e, %format, "export failed"))
        .with_context(|| format!("Failed to export {} report", format))?;

    println!("[usage] Report written: {}", path.display());

    if open {
        open::that(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    }
    Ok(())
}
