use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use tabguard::Config;
use tabguard_core_types::{truncate_chars, ClassificationRequest, TabId};
use tabguard_oracle::{ChatOracle, OracleClient};

#[derive(Args, Clone, Debug)]
pub struct ClassifyArgs {
    /// Page URL to classify
    #[arg(long)]
    pub url: String,

    /// Visible page text sent with the URL
    #[arg(long, default_value = "")]
    pub content: String,
}

/// One oracle round trip. No cache, no redirect.
pub async fn cmd_classify(args: ClassifyArgs, config: &Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    if let Err(err) = config.gate_config().eligibility().check(Some(&args.url)) {
        bail!("{}: {err}", args.url);
    }

    let oracle = ChatOracle::new(config.oracle_config()?).context("Failed to build oracle client")?;
    let content = truncate_chars(&args.content, config.gate.max_content_chars);
    let request = ClassificationRequest::new(TabId(0), args.url.as_str(), content);
    let verdict = oracle
        .classify(&request)
        .await
        .context("Oracle call failed")?;

    info!(url = %args.url, decision = verdict.should_block, "classified");
    println!("{}", if verdict.should_block { "block" } else { "allow" });
    Ok(())
}
