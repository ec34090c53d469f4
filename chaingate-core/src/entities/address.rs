//! Address and withdrawal shapes exchanged with the wallet collaborator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A managed address as reported by the wallet backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Normalized address string.
    pub value: String,
    /// Verdict of the backend's own validation capability. The adapter
    /// never fabricates this: when the backend cannot answer, the call
    /// fails instead of guessing.
    pub is_valid: bool,
    /// Balance, where the lookup included one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Decimal>,
}

/// A withdrawal to issue against the wallet backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Source address of the configured wallet.
    pub from: String,
    /// Destination address.
    pub to: String,
    /// Exact transfer amount.
    pub amount: Decimal,
    /// Optional network fee override.
    #[serde(default)]
    pub fee: Option<Decimal>,
    /// Deduct the network fee from `amount` instead of the wallet
    /// balance. Variants that cannot honor this reject the request.
    #[serde(default)]
    pub subtract_fee_from_amount: bool,
}
