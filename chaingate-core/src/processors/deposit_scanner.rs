//! DepositScanner worker.
//!
//! The DepositScanner is responsible for:
//! - Polling the blockchain adapter for the latest height
//! - Walking every unscanned height with a target-filtered fetch
//! - Emitting one `ScannedDeposit` per retained entry
//! - Advancing its cursor only once a height has scanned cleanly
//!
//! The adapter underneath never retries; a failed cycle leaves the
//! cursor where it was, and the next tick re-attempts the same heights.
//! One worker owns one adapter instance, which is what makes the
//! adapter's lock-free mutable state safe.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::blockchain::{Blockchain, Error};
use crate::events::{ScannedDeposit, ScannedDepositSender};

/// Upper bound of heights walked per poll cycle, so a worker starting
/// far behind the chain tip does not hammer the backend.
const MAX_BLOCKS_PER_CYCLE: u64 = 100;

pub struct DepositScanner {
    chain: Blockchain,
    currency: String,
    watch_address: String,
    cursor: u64,
    poll_interval: Duration,
    deposit_tx: ScannedDepositSender,
    shutdown_rx: watch::Receiver<bool>,
}

impl DepositScanner {
    /// Create a worker that scans heights above `start_height`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: Blockchain,
        currency: impl Into<String>,
        watch_address: impl Into<String>,
        start_height: u64,
        poll_interval: Duration,
        deposit_tx: ScannedDepositSender,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            chain,
            currency: currency.into(),
            watch_address: watch_address.into(),
            cursor: start_height,
            poll_interval,
            deposit_tx,
            shutdown_rx,
        }
    }

    /// Run the worker until shutdown.
    pub async fn run(mut self) {
        info!(
            currency = %self.currency,
            cursor = self.cursor,
            "DepositScanner started"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!(currency = %self.currency, "DepositScanner shutting down");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    if let Err(e) = self.cycle().await {
                        // The cursor did not move; the next tick retries
                        // the same heights.
                        warn!(currency = %self.currency, error = %e, "scan cycle failed");
                    }
                }
            }
        }

        info!(
            currency = %self.currency,
            cursor = self.cursor,
            "DepositScanner stopped"
        );
    }

    async fn cycle(&mut self) -> Result<(), Error> {
        let latest = self.chain.latest_height().await?;
        if latest <= self.cursor {
            debug!(currency = %self.currency, latest, "no new blocks");
            return Ok(());
        }

        let upper = latest.min(self.cursor + MAX_BLOCKS_PER_CYCLE);
        for height in (self.cursor + 1)..=upper {
            let block = self
                .chain
                .fetch_block_for(height, &self.watch_address)
                .await?;

            for tx in &block.transactions {
                for entry in &tx.entries {
                    let deposit = ScannedDeposit {
                        currency: self.currency.clone(),
                        txid: tx.id.clone(),
                        address: entry.address.clone(),
                        amount: entry.amount,
                        block_height: height,
                        output_index: entry.output_index,
                    };
                    info!(
                        currency = %self.currency,
                        txid = %deposit.txid,
                        amount = %deposit.amount,
                        height,
                        "deposit found"
                    );
                    if self.deposit_tx.send(deposit).await.is_err() {
                        // Receiver gone: the host is tearing down. Stop
                        // without advancing past this height.
                        error!(currency = %self.currency, "deposit channel closed");
                        return Ok(());
                    }
                }
            }
            self.cursor = height;
        }
        Ok(())
    }
}
