use anyhow::{Context, Result};
use dialoguer::Confirm;

use crate::cli::AppContext;
use crate::storage::ANALYSIS_KEY;

/// Delete the saved analysis after confirmation
pub async fn run(ctx: &AppContext, yes: bool) -> Result<()> {
    let store = ctx.store();
    let path = store.inner().path_for(ANALYSIS_KEY);

    if !path.exists() {
        println!("[usage] Nothing to clear.");
        return Ok(());
    }

    println!("[usage] Saved analysis: {}", path.display());

    let confirmed = yes
        || Confirm::new()
            .with_prompt("[usage] Delete the saved analysis?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;

    if confirmed {
        store.clear()?;
        println!("[usage] Saved analysis deleted.");
    } else {
        println!("[usage] Clear cancelled.");
    }

    Ok(())
}
