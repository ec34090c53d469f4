//! Backend protocol variants.
//!
//! Each supported node/explorer family implements [`ChainBackend`], the
//! narrow strategy surface the scanner needs. Everything correctness-
//! critical (zero filtering, address matching, id normalization) stays
//! out of the variants in [`crate::scan`]; a variant only knows method
//! names, paths, and how to dig recipients out of its own output shape,
//! so a backend protocol revision touches exactly one file.

mod account_node;
mod core_rpc;
mod explorer_rest;

pub use account_node::AccountNodeBackend;
pub use core_rpc::CoreRpcBackend;
pub use explorer_rest::ExplorerRestBackend;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::client::{self, HttpClient};

/// Wire-protocol families this crate can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVariant {
    /// Bearer-token REST explorer with a flat output list.
    #[serde(rename = "explorer-rest")]
    ExplorerRest,
    /// Bitcoind-family JSON-RPC node with UTXO `vout` outputs.
    #[serde(rename = "core-rpc")]
    CoreRpc,
    /// Basic-auth REST ledger with account-indexed transfers.
    #[serde(rename = "account-node")]
    AccountNode,
}

impl ProtocolVariant {
    /// Build the strategy object for this variant against `server`.
    pub fn connect(
        self,
        server: &str,
        idle_timeout: Duration,
    ) -> Result<Box<dyn ChainBackend>, client::Error> {
        let client = HttpClient::new(server, idle_timeout)?;
        Ok(match self {
            ProtocolVariant::ExplorerRest => Box::new(ExplorerRestBackend::new(client)),
            ProtocolVariant::CoreRpc => Box::new(CoreRpcBackend::new(client)),
            ProtocolVariant::AccountNode => Box::new(AccountNodeBackend::new(client)),
        })
    }
}

/// A raw output as delivered by the backend, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    /// Exact value parsed from the backend's literal representation.
    pub value: Decimal,
    /// Recipient, when the output has a recognizable one. Data-only and
    /// bare-script outputs come through as `None` and are skipped
    /// upstream, not treated as errors.
    pub recipient: Option<String>,
    /// Position in the backend's output list.
    pub index: u32,
}

/// A raw transaction: the backend's id plus its ordered outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub id: String,
    pub outputs: Vec<RawOutput>,
}

/// Strategy surface a blockchain backend variant must cover.
#[async_trait]
pub trait ChainBackend: Send {
    /// Height of the newest block the backend knows.
    async fn latest_height(&mut self) -> Result<u64, client::Error>;

    /// Raw transactions of the block at `height`, outputs in backend
    /// order.
    async fn block_transactions(
        &mut self,
        height: u64,
    ) -> Result<Vec<RawTransaction>, client::Error>;

    /// Balance record for `address`, or `None` when the backend has no
    /// record at all. `None` is distinct from a zero balance and is
    /// mapped to a distinguished result upstream.
    async fn address_balance(
        &mut self,
        address: &str,
        currency_id: &str,
    ) -> Result<Option<Decimal>, client::Error>;
}
