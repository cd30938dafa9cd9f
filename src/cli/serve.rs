use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tabguard::{build_router, BridgeState, Config, Gate};
use tabguard_gate::SettleReport;

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Address for the extension bridge (overrides server.bind)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
}

pub async fn cmd_serve(args: ServeArgs, mut config: Config) -> Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config.validate().context("Invalid configuration")?;
    let addr = config.bind_addr()?;

    let gate = Arc::new(Gate::from_config(&config)?);
    let reporter = spawn_report_logger(gate.subscribe_reports());
    let app = build_router(BridgeState::new(gate.clone()), config.server.cors);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, endpoint = %config.oracle.endpoint, "extension bridge listening");

    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Bridge server failed");

    reporter.abort();
    gate.shutdown();
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

fn spawn_report_logger(mut reports: broadcast::Receiver<SettleReport>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match reports.recv().await {
                Ok(report) => debug!(
                    tab = %report.tab,
                    url = report.url.as_deref().unwrap_or(""),
                    outcome = report.outcome.label(),
                    redirected = report.outcome.redirected(),
                    "tab settled"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "settle report logger lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
