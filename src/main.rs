//! Commitment Beacon
//!
//! Publishes one elliptic-curve commitment per period until the run time
//! elapses or the process is interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use commit_beacon::{
    telemetry, BeaconConfig, CommitmentGenerator, CommitmentStore, LedgerStore, MemoryStore,
    RoundScheduler, Secp256k1Source, VERSION,
};

#[derive(Parser)]
#[command(name = "commit-beacon")]
#[command(about = "Periodic elliptic-curve commitment beacon")]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Round period (e.g., "10s", "1m")
    #[arg(short, long)]
    period: Option<humantime::Duration>,

    /// Stop after this long (e.g., "25s"); runs until Ctrl-C when unset
    #[arg(short, long)]
    run_for: Option<humantime::Duration>,

    /// JSON ledger file; commitments stay in memory when unset
    #[arg(short, long)]
    ledger: Option<PathBuf>,

    /// Default log filter (RUST_LOG takes precedence)
    #[arg(long)]
    log: Option<String>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<BeaconConfig> {
        let mut config = match &self.config {
            Some(path) => BeaconConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => BeaconConfig::default(),
        };

        if let Some(period) = self.period {
            config = config.with_period(period.into());
        }
        if let Some(run_for) = self.run_for {
            config = config.with_run_for(run_for.into());
        }
        if let Some(ledger) = self.ledger {
            config = config.with_ledger_path(ledger);
        }
        if let Some(log) = self.log {
            config = config.with_log_filter(log);
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;
    telemetry::init(&config.log_filter)?;

    info!("Commitment beacon v{}", VERSION);
    info!("Period: {:?}", config.period);

    let store: Arc<dyn CommitmentStore> = match &config.ledger_path {
        Some(path) => {
            let ledger = LedgerStore::open(path)
                .await
                .with_context(|| format!("opening ledger {}", path.display()))?;
            Arc::new(ledger)
        }
        None => Arc::new(MemoryStore::new()),
    };
    info!("Recording to {} store", store.name());

    let generator = Arc::new(CommitmentGenerator::new(
        Arc::new(Secp256k1Source::new()),
        store,
    ));
    let scheduler = RoundScheduler::new(generator);
    scheduler.start(config.period)?;

    match config.run_for {
        Some(run_for) => {
            tokio::select! {
                _ = tokio::time::sleep(run_for) => {}
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }
        }
        None => {
            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
            info!("Interrupted");
        }
    }

    let summary = scheduler.stop().await?;
    println!(
        "Beacon stopped after {} rounds ({} committed, {} failed, {} abandoned)",
        summary.rounds_started, summary.committed, summary.failed, summary.abandoned
    );

    Ok(())
}
