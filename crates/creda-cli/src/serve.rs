//! # serve — Run the Registry API
//!
//! Loads configuration, wires the service graph, and runs the axum
//! server. An optional background sweep re-attempts anchoring for
//! credentials left in `PENDING_ANCHOR` by ledger outages.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;

use creda_api::{app, ApiConfig, AppState};

/// Arguments for `creda serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "creda.yaml")]
    pub config: PathBuf,

    /// Override the configured bind address.
    #[arg(long)]
    pub bind: Option<std::net::SocketAddr>,
}

/// Run the service until interrupted.
pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = if args.config.exists() {
        ApiConfig::load(&args.config)
            .with_context(|| format!("loading {}", args.config.display()))?
    } else {
        tracing::warn!(
            path = %args.config.display(),
            "config file not found; starting with defaults and a mock ledger"
        );
        let mut config = ApiConfig::default();
        config.apply_env();
        config
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(serve(config))
}

async fn serve(config: ApiConfig) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr;
    let sweep_interval = config.retry_sweep_secs;

    let db_pool = creda_api::db::init_pool()
        .await
        .context("initializing database pool")?;
    let state = AppState::build(config, db_pool).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    if let Some(secs) = sweep_interval {
        let lifecycle = state.lifecycle.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
            // The first tick fires immediately; skip it so startup is quiet.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let anchored = lifecycle.retry_pending().await;
                if anchored > 0 {
                    tracing::info!(anchored, "anchoring retry sweep completed");
                }
            }
        });
        tracing::info!(interval_secs = secs, "anchoring retry sweep enabled");
    }

    let router = app(state);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "registry API listening");

    axum::serve(listener, router)
        .await
        .context("serving API")?;
    Ok(())
}
