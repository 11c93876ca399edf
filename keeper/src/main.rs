//! Tranche Settlement Keeper
//!
//! Off-chain service that drives a settlement engine through its lifecycle:
//! declares the loss severity once the settlement gap opens and executes a
//! schedule of deposits, migrations and claims.

mod actions;
mod clock;
mod config;
mod schedule;
mod service;
mod solvency;

use anyhow::Result;
use config::KeeperConfig;
use service::{Keeper, Progress};
use std::time::Duration;
use tokio::time;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // `settlement-keeper init [path]` writes the demo config and exits
    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("init") {
        let path = args.next().unwrap_or_else(|| "keeper-config.toml".to_string());
        return KeeperConfig::write_default(&path);
    }

    log::info!("Starting Tranche Settlement Keeper");

    // Load configuration
    let config = KeeperConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({:#}), using demo config", e);
        KeeperConfig::default_demo()
    });

    let b = config.engine.boundaries;
    log::info!(
        "Boundaries S={} T1={} T2={} T3={}",
        b.issuance_end,
        b.insurance_end,
        b.settlement_end,
        b.senior_claim_end
    );
    log::info!("Reporter: {}", config.engine.reporter);

    let poll = Duration::from_secs(config.poll_interval_secs.max(1));
    let mut keeper = Keeper::new(config)?;

    log::info!("Keeper started with {} scheduled actions", keeper.pending_actions());

    // Main event loop
    let mut interval = time::interval(poll);
    loop {
        interval.tick().await;

        if keeper.tick() == Progress::Done {
            break;
        }
    }

    log::info!("Final claims open and schedule complete: {}", keeper.report());
    for record in keeper.engine().adapter_history() {
        log::info!(
            "{} ({:?}) activated at {} with {}",
            record.adapter_id,
            record.venue,
            record.activated_at,
            record.custody_balance_at_activation
        );
    }
    Ok(())
}
