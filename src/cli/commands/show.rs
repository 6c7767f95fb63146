use anyhow::Result;
use colored::Colorize;

use super::dashboard;
use crate::cli::AppContext;

/// Print the saved analysis
pub async fn run(ctx: &AppContext, json: bool) -> Result<()> {
    let saved = ctx.require_saved()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&saved.analysis_data)?);
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "  Saved {}",
            saved.saved_at.format("%Y-%m-%d %H:%M UTC")
        )
        .dimmed()
    );
    dashboard::print(&saved.analysis_data, &[]);
    Ok(())
}
