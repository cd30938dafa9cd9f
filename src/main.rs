//! TabGuard - blocks distracting tabs once they settle.

mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, error};

use crate::cli::{
    cmd_classify, cmd_config, cmd_serve, init_logging, load_config, ClassifyArgs, ConfigArgs,
    LogFormat, ServeArgs,
};

#[derive(Parser)]
#[command(name = "tabguard")]
#[command(version = tabguard::VERSION)]
#[command(about = "Per-tab content gate backed by an LLM classifier")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "human")]
    log_format: LogFormat,

    /// Metrics server port used by `serve` (set to 0 to disable)
    #[arg(long, default_value_t = 9090)]
    metrics_port: u16,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gate and the extension bridge until Ctrl-C
    Serve(ServeArgs),

    /// Ask the oracle about a single page
    Classify(ClassifyArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_format)?;
    debug!("tabguard {}", tabguard::VERSION);

    let loaded = load_config(cli.config.as_ref()).await?;

    let result = match cli.command {
        Commands::Serve(args) => {
            let _metrics_server = tabguard::metrics::spawn_metrics_server(cli.metrics_port);
            cmd_serve(args, loaded.config).await
        }
        Commands::Classify(args) => cmd_classify(args, &loaded.config).await,
        Commands::Config(args) => cmd_config(args, &loaded).await,
    };

    if let Err(err) = result {
        error!("Command failed: {err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}
