//! Bitcoind-family RPC wallet variant.
//!
//! Signing operations unlock the wallet with `walletpassphrase` right
//! before the call; the unlock window is kept short on purpose.
//! `sendtoaddress` carries the subtract-fee flag natively, so this
//! variant supports fee deduction.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use super::WalletBackend;
use crate::amount;
use crate::client::{self, HttpClient};
use crate::entities::WithdrawalRequest;

/// Seconds the wallet stays unlocked after `walletpassphrase`.
const UNLOCK_WINDOW_SECS: u64 = 10;

pub struct RpcWalletBackend {
    client: HttpClient,
}

impl RpcWalletBackend {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WalletBackend for RpcWalletBackend {
    async fn unlock(&mut self, secret: &str) -> Result<(), client::Error> {
        self.client
            .call("walletpassphrase", json!([secret, UNLOCK_WINDOW_SECS]))
            .await?;
        Ok(())
    }

    async fn create_address(&mut self) -> Result<String, client::Error> {
        let result = self.client.call("getnewaddress", json!([])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| client::Error::Unexpected("getnewaddress returned a non-string".into()))
    }

    fn supports_fee_deduction(&self) -> bool {
        true
    }

    async fn transfer(&mut self, request: &WithdrawalRequest) -> Result<String, client::Error> {
        if let Some(fee) = request.fee {
            self.client.call("settxfee", json!([fee])).await?;
        }
        let result = self
            .client
            .call(
                "sendtoaddress",
                json!([
                    request.to,
                    request.amount,
                    "",
                    "",
                    request.subtract_fee_from_amount,
                ]),
            )
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| client::Error::Unexpected("sendtoaddress returned a non-string".into()))
    }

    async fn validate_address(&mut self, address: &str) -> Result<bool, client::Error> {
        let result = self.client.call("validateaddress", json!([address])).await?;
        result.get("isvalid").and_then(Value::as_bool).ok_or_else(|| {
            client::Error::Unexpected("validateaddress reply carried no verdict".into())
        })
    }

    async fn wallet_balance(&mut self) -> Result<Decimal, client::Error> {
        let result = self.client.call("listaddressgroupings", json!([])).await?;
        sum_groupings(&result)
    }
}

/// `listaddressgroupings` nests `[address, amount, ..]` entries inside
/// grouping arrays; the wallet balance is the sum over all of them.
fn sum_groupings(result: &Value) -> Result<Decimal, client::Error> {
    let groups = result.as_array().ok_or_else(|| {
        client::Error::Unexpected("listaddressgroupings returned a non-array".into())
    })?;
    let mut total = Decimal::ZERO;
    for group in groups {
        let entries = group
            .as_array()
            .ok_or_else(|| client::Error::Unexpected("malformed address grouping".into()))?;
        for entry in entries {
            let raw = entry.get(1).ok_or_else(|| {
                client::Error::Unexpected("address grouping entry carried no amount".into())
            })?;
            total += amount::decimal_from_value(raw).map_err(client::Error::Unexpected)?;
        }
    }
    Ok(total)
}
