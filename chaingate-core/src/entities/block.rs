//! Canonical ledger entities produced by block scanning.
//!
//! These are the shapes handed to collaborators (deposit accounting,
//! admin reporting). They are produced fresh on every fetch; nothing in
//! the adapter layer caches or persists them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One filtered, address-matched credit extracted from a transaction's
/// outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Credited amount. Always strictly positive: zero and negative
    /// backend outputs (change markers, fees, burns) are dropped during
    /// normalization and never surface as deposits.
    pub amount: Decimal,
    /// Normalized recipient address.
    pub address: String,
    /// Index of the originating output in the backend's output list.
    pub output_index: u32,
}

/// A normalized on-chain transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Normalized transaction id. Entries sharing a backend transaction
    /// all carry the same id string.
    pub id: String,
    /// Height of the containing block; absent for unconfirmed
    /// transactions.
    pub block_height: Option<u64>,
    /// Retained entries. Never empty — a transaction whose outputs are
    /// all filtered away is not emitted at all.
    pub entries: Vec<Entry>,
}

/// A scanned block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub transactions: Vec<Transaction>,
}
