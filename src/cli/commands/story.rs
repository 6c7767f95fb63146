use anyhow::Result;
use termimad::MadSkin;

use crate::cli::AppContext;
use crate::report::story::{build_slides, render_markdown};

/// Render the saved analysis as a story in the terminal
pub async fn run(ctx: &AppContext) -> Result<()> {
    let saved = ctx.require_saved()?;
    let slides = build_slides(&saved.analysis_data);

    let skin = MadSkin::default();
    skin.print_text(&render_markdown(&slides));
    Ok(())
}
