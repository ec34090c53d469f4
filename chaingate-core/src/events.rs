//! Deposit event types and channel handles.
//!
//! Scanner workers emit one event per retained entry; the consuming
//! collaborator owns persistence and the durability of the scan cursor.
//! Events carry plain data only — a consumer needing more context
//! re-fetches through the adapter.

use rust_decimal::Decimal;
use tokio::sync::mpsc;

/// Default buffer for deposit channels: enough for bursts while keeping
/// memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// One address-matched credit discovered during a block scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDeposit {
    /// Currency the scanning worker is configured for.
    pub currency: String,
    /// Normalized transaction id.
    pub txid: String,
    /// Normalized credited address.
    pub address: String,
    /// Credited amount.
    pub amount: Decimal,
    /// Height of the containing block.
    pub block_height: u64,
    /// Output index within the backend transaction.
    pub output_index: u32,
}

/// Sender handle for ScannedDeposit events.
pub type ScannedDepositSender = mpsc::Sender<ScannedDeposit>;
/// Receiver handle for ScannedDeposit events.
pub type ScannedDepositReceiver = mpsc::Receiver<ScannedDeposit>;

/// Create a new ScannedDeposit channel.
pub fn scanned_deposit_channel(buffer: usize) -> (ScannedDepositSender, ScannedDepositReceiver) {
    mpsc::channel(buffer.max(1))
}
