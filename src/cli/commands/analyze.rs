use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use super::dashboard;
use crate::cli::AppContext;
use crate::ingest::{ingest, IngestError};
use crate::usage::analyze;

/// Ingest the given files or folders, analyze them and save the result
pub async fn run(ctx: &AppContext, paths: &[PathBuf], no_save: bool, json: bool) -> Result<()> {
    let outcome = ingest(paths, &ctx.config.ingest_options(), |progress| {
        eprintln!(
            "[usage] {:>3}% ({}/{}) {}",
            progress.percent,
            progress.index,
            progress.total,
            progress.file.display()
        );
    })?;

    let analysis = analyze(
        &outcome.rows,
        outcome.files_analyzed,
        &ctx.config.analysis_options(),
    );
    info!(
        requests = analysis.total_requests,
        files = analysis.files_analyzed,
        "analysis complete"
    );

    if !no_save {
        let store = ctx.store();
        store.save(&analysis).context("Failed to save analysis")?;
        eprintln!(
            "[usage] Saved analysis to {}",
            store.inner().dir().display()
        );
    }

    if json {
        print_warnings(&outcome.warnings);
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        let warnings: Vec<String> = outcome.warnings.iter().map(|e| e.to_string()).collect();
        dashboard::print(&analysis, &warnings);
    }

    Ok(())
}

fn print_warnings(warnings: &[IngestError]) {
    for w in warnings {
        eprintln!("[usage] {} {}", "Skipped:".yellow(), w);
    }
}
