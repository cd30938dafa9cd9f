use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::runtime::LoadedConfig;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as YAML
    Show,

    /// Validate the effective configuration
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, loaded: &LoadedConfig) -> Result<()> {
    let source = loaded
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    match args.action {
        ConfigAction::Show => {
            println!("# source: {source}");
            print!("{}", loaded.config.redacted().to_yaml()?);
        }
        ConfigAction::Validate => {
            loaded
                .config
                .validate()
                .with_context(|| format!("Configuration from {source} is invalid"))?;
            println!("Configuration OK ({source})");
        }
    }
    Ok(())
}
