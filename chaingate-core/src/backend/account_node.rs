//! Basic-auth REST ledger variant with account-indexed transfers.
//!
//! The third output shape in the family: instead of spendable outputs,
//! blocks carry direct `{account, amount}` transfer pairs.
//! `GET /chain/height` → `{"height": n}`; `GET /blocks/<h>` →
//! `{"transactions": [{"hash", "transfers": [..]}]}`;
//! `GET /accounts/<a>/balance` → `{"balance": ..}` where a `null`
//! balance means the ledger holds no record for the account.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::{ChainBackend, RawOutput, RawTransaction};
use crate::amount;
use crate::client::{self, HttpClient};

pub struct AccountNodeBackend {
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct BlockReply {
    #[serde(default)]
    transactions: Vec<TxReply>,
}

#[derive(Debug, Deserialize)]
struct TxReply {
    hash: String,
    #[serde(default)]
    transfers: Vec<TransferReply>,
}

#[derive(Debug, Deserialize)]
struct TransferReply {
    #[serde(default)]
    account: Option<String>,
    #[serde(deserialize_with = "amount::deserialize")]
    amount: Decimal,
}

impl AccountNodeBackend {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn decode_block(reply: Value) -> Result<Vec<RawTransaction>, client::Error> {
        let block: BlockReply = serde_json::from_value(reply)
            .map_err(|e| client::Error::Unexpected(format!("malformed block reply: {e}")))?;
        Ok(block
            .transactions
            .into_iter()
            .map(|tx| RawTransaction {
                id: tx.hash,
                outputs: tx
                    .transfers
                    .into_iter()
                    .enumerate()
                    .map(|(index, transfer)| RawOutput {
                        value: transfer.amount,
                        recipient: transfer.account,
                        index: index as u32,
                    })
                    .collect(),
            })
            .collect())
    }

    fn decode_balance(reply: Value) -> Result<Option<Decimal>, client::Error> {
        let raw = reply
            .get("balance")
            .ok_or_else(|| client::Error::Unexpected("balance reply carried no balance".into()))?;
        if raw.is_null() {
            return Ok(None);
        }
        amount::decimal_from_value(raw)
            .map(Some)
            .map_err(client::Error::Unexpected)
    }
}

#[async_trait]
impl ChainBackend for AccountNodeBackend {
    async fn latest_height(&mut self) -> Result<u64, client::Error> {
        let reply = self.client.get("/chain/height").await?;
        reply
            .get("height")
            .and_then(Value::as_u64)
            .ok_or_else(|| client::Error::Unexpected("height reply carried no height".into()))
    }

    async fn block_transactions(
        &mut self,
        height: u64,
    ) -> Result<Vec<RawTransaction>, client::Error> {
        let reply = self.client.get(&format!("/blocks/{height}")).await?;
        Self::decode_block(reply)
    }

    async fn address_balance(
        &mut self,
        address: &str,
        _currency_id: &str,
    ) -> Result<Option<Decimal>, client::Error> {
        let reply = self
            .client
            .get(&format!(
                "/accounts/{}/balance",
                urlencoding::encode(address)
            ))
            .await?;
        Self::decode_balance(reply)
    }
}
