//! Shared ledger demo binary
//!
//! Spawns worker threads that all grab the shared ledger, deposit, withdraw,
//! and report the balance they observe.

use anyhow::Context;
use shared_ledger::{init_global, LedgerConfig};
use std::thread;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting shared ledger demo");

    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => LedgerConfig::from_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => LedgerConfig::from_env().context("loading config from environment")?,
    };
    let demo = config.demo.clone();

    init_global(config).context("initializing shared ledger")?;

    thread::scope(|s| -> anyhow::Result<()> {
        let workers: Vec<_> = (0..demo.workers)
            .map(|worker| {
                let demo = &demo;
                s.spawn(move || -> shared_ledger::Result<()> {
                    let ledger = shared_ledger::get_instance();
                    let label = format!("ACC{:03}", worker);

                    ledger.deposit(&label, demo.deposit_amount)?;
                    ledger.withdraw(&label, demo.withdraw_amount)?;

                    tracing::info!(worker, balance = %ledger.balance(), "Worker sees balance");
                    Ok(())
                })
            })
            .collect();

        for worker in workers {
            worker
                .join()
                .map_err(|_| anyhow::anyhow!("worker thread panicked"))??;
        }
        Ok(())
    })?;

    let snapshot = shared_ledger::get_instance().snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    tracing::info!("Shared ledger demo finished");
    Ok(())
}
