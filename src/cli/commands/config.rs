use anyhow::Result;

use crate::cli::{AppContext, ConfigAction};
use crate::config::{config_path, save_config, Config};

pub async fn run(ctx: &AppContext, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", ctx.config.to_toml()?);
            println!("# data dir: {}", ctx.data_dir.display());
        }
        ConfigAction::Path => {
            println!("{}", config_path(ctx.config_path.as_deref())?.display());
        }
        ConfigAction::Reset => {
            save_config(&Config::default(), ctx.config_path.as_deref())?;
            println!(
                "[usage] Config reset: {}",
                config_path(ctx.config_path.as_deref())?.display()
            );
        }
    }
    Ok(())
}
