pub mod commands;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{load_config, Config};
use crate::report::ExportFormat;
use crate::storage::{AnalysisStore, FileStore, SavedAnalysis};

#[derive(Parser, Debug)]
#[command(
    name = "ai-usage-optimizer",
    version,
    about = "Analyze AI API usage exports and find ways to spend less"
)]
pub struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true, env = "AI_USAGE_OPTIMIZER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the saved analysis
    #[arg(long, global = true, env = "AI_USAGE_OPTIMIZER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze CSV files or folders of CSV files
    Analyze {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Do not replace the saved analysis
        #[arg(long)]
        no_save: bool,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the saved analysis
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Walk through the saved analysis as a story
    Story,

    /// Export the saved analysis as a report file
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        /// Directory to write the report into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Open the report afterwards
        #[arg(long)]
        open: bool,
    },

    /// Delete the saved analysis
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Inspect or reset the configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Overwrite the config file with defaults
    Reset,
}

/// Resolved configuration shared by the commands
pub struct AppContext {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub data_dir: PathBuf,
}

impl AppContext {
    pub fn load(config_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<Self> {
        let config = load_config(config_path.as_deref())?;
        let data_dir = config.data_dir(data_dir.as_deref())?;
        Ok(Self {
            config,
            config_path,
            data_dir,
        })
    }

    pub fn store(&self) -> AnalysisStore<FileStore> {
        AnalysisStore::new(FileStore::new(&self.data_dir))
    }

    /// The saved analysis, or an error telling the user to run `analyze`
    pub fn require_saved(&self) -> Result<SavedAnalysis> {
        match self.store().load()? {
            Some(saved) => Ok(saved),
            None => bail!("No saved analysis found. Run `ai-usage-optimizer analyze <PATH>` first."),
        }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::load(cli.config, cli.data_dir)?;

    match cli.command {
        Commands::Analyze {
            paths,
            no_save,
            json,
        } => commands::analyze::run(&ctx, &paths, no_save, json).await,
        Commands::Show { json } => commands::show::run(&ctx, json).await,
        Commands::Story => commands::story::run(&ctx).await,
        Commands::Export {
            format,
            output,
            open,
        } => commands::export::run(&ctx, format, &output, open).await,
        Commands::Clear { yes } => commands::clear::run(&ctx, yes).await,
        Commands::Config { action } => {
            commands::config::run(&ctx, action.unwrap_or(ConfigAction::Show)).await
        }
    }
}
