use anyhow::Result;
use clap::Parser;

use ai_usage_optimizer::cli::{self, Cli};
use ai_usage_optimizer::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    cli::run(args).await
}
