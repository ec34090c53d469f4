//! Chaingate scanning daemon.
//!
//! Spawns one deposit-scanner worker per configured chain and reports
//! the deposits they discover. Persisting deposits, crediting accounts,
//! and withdrawal issuance belong to the host exchange; this process is
//! only the polling side of the adapter layer.

mod config;
mod shutdown;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chaingate_core::blockchain::Blockchain;
use chaingate_core::events::scanned_deposit_channel;
use chaingate_core::processors::DepositScanner;
use chaingate_core::settings::{BlockchainSettings, FeatureFlags};
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::{ChainSection, FileConfig};

/// Chaingate - blockchain deposit scanner daemon
#[derive(Parser, Debug)]
#[command(name = "chaingate-scand")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./chaingate.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting chaingate-scand v{}", env!("CARGO_PKG_VERSION"));

    let raw = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading {:?}", args.config))?;
    let file: FileConfig =
        toml::from_str(&raw).with_context(|| format!("parsing {:?}", args.config))?;

    if file.chains.is_empty() {
        anyhow::bail!("no chains configured in {:?}", args.config);
    }
    tracing::info!(
        chains = file.chains.len(),
        "Configuration loaded from {:?}",
        args.config
    );

    let (deposit_tx, mut deposit_rx) = scanned_deposit_channel(file.scanner.channel_buffer);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_interval = Duration::from_secs(file.scanner.poll_interval_secs);

    let mut workers = Vec::new();
    for chain in &file.chains {
        let features = FeatureFlags {
            case_sensitive: chain.case_sensitive,
            cash_addr_format: chain.cash_addr_format,
        };
        let mut adapter = Blockchain::new(chain.protocol, features);
        adapter.configure(BlockchainSettings {
            server: Some(chain.server.clone()),
            currencies: currencies_of(chain),
        })?;

        let scanner = DepositScanner::new(
            adapter,
            chain.currency.clone(),
            chain.watch_address.clone(),
            chain.start_height,
            poll_interval,
            deposit_tx.clone(),
            shutdown_rx.clone(),
        );
        tracing::info!(
            currency = %chain.currency,
            protocol = ?chain.protocol,
            "starting scanner"
        );
        workers.push(tokio::spawn(scanner.run()));
    }
    drop(deposit_tx);

    // Stand-in for the persisting collaborator: the host exchange would
    // write these down; the daemon reports them.
    let consumer = tokio::spawn(async move {
        while let Some(deposit) = deposit_rx.recv().await {
            tracing::info!(
                currency = %deposit.currency,
                txid = %deposit.txid,
                address = %deposit.address,
                amount = %deposit.amount,
                height = deposit.block_height,
                output_index = deposit.output_index,
                "deposit scanned"
            );
        }
    });

    shutdown::shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    for worker in workers {
        let _ = worker.await;
    }
    let _ = consumer.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn currencies_of(chain: &ChainSection) -> Vec<String> {
    let mut currencies = vec![chain.currency.clone()];
    currencies.extend(chain.currencies.iter().cloned());
    currencies
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
