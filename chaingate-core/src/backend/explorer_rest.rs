//! Bearer-token REST explorer variant.
//!
//! Wire surface: `GET /get-height` → `{"height": n}`;
//! `GET /get-block?index=<h>` → `{"transactions": [{"id", "outputs":
//! [{"to", "value"}]}]}`; `GET /explorer-get-balance?address=<a>` →
//! an `["<address>", <balance>]` pair, or an empty reply when the
//! explorer has no record for the address.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::{ChainBackend, RawOutput, RawTransaction};
use crate::amount;
use crate::client::{self, HttpClient};

pub struct ExplorerRestBackend {
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct BlockReply {
    #[serde(default)]
    transactions: Vec<TxReply>,
}

#[derive(Debug, Deserialize)]
struct TxReply {
    id: String,
    #[serde(default)]
    outputs: Vec<OutputReply>,
}

#[derive(Debug, Deserialize)]
struct OutputReply {
    #[serde(default)]
    to: Option<String>,
    #[serde(deserialize_with = "amount::deserialize")]
    value: Decimal,
}

impl ExplorerRestBackend {
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
                id: tx.id,
                outputs: tx
                    .outputs
                    .into_iter()
                    .enumerate()
                    .map(|(index, output)| RawOutput {
                        value: output.value,
                        recipient: output.to,
                        index: index as u32,
                    })
                    .collect(),
            })
            .collect())
    }

    fn decode_balance(reply: Value) -> Result<Option<Decimal>, client::Error> {
        // The explorer answers with an `[address, balance]` pair, and an
        // empty reply for an address it has never seen.
        match reply {
            Value::Null => Ok(None),
            Value::Array(pair) if pair.is_empty() => Ok(None),
            Value::Array(pair) => {
                let raw = pair.get(1).ok_or_else(|| {
                    client::Error::Unexpected("balance pair missing its second element".into())
                })?;
                amount::decimal_from_value(raw)
                    .map(Some)
                    .map_err(client::Error::Unexpected)
            }
            other => Err(client::Error::Unexpected(format!(
                "unsupported balance reply: {other}"
            ))),
        }
    }
}

#[async_trait]
impl ChainBackend for ExplorerRestBackend {
    async fn latest_height(&mut self) -> Result<u64, client::Error> {
        let reply = self.client.get("/get-height").await?;
        reply
            .get("height")
            .and_then(Value::as_u64)
            .ok_or_else(|| client::Error::Unexpected("height reply carried no height".into()))
    }

    async fn block_transactions(
        &mut self,
        height: u64,
    ) -> Result<Vec<RawTransaction>, client::Error> {
        let reply = self.client.get(&format!("/get-block?index={height}")).await?;
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
                "/explorer-get-balance?address={}",
                urlencoding::encode(address)
            ))
            .await?;
        Self::decode_balance(reply)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_flat_output_blocks() {
        let reply = json!({
            "height": 100,
            "transactions": [
                {"id": "abc", "outputs": [
                    {"to": "X", "value": 0},
                    {"to": "Y", "value": "1.5"},
                ]},
                {"id": "def", "outputs": []},
            ],
        });
        let txs = ExplorerRestBackend::decode_block(reply).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].id, "abc");
        assert_eq!(txs[0].outputs[0].value, Decimal::ZERO);
        assert_eq!(txs[0].outputs[1].value, Decimal::new(15, 1));
        assert_eq!(txs[0].outputs[1].recipient.as_deref(), Some("Y"));
        assert_eq!(txs[0].outputs[1].index, 1);
        assert!(txs[1].outputs.is_empty());
    }

    #[test]
    fn test_output_without_recipient_survives_decoding() {
        let reply = json!({
            "transactions": [
                {"id": "abc", "outputs": [{"value": "2.0"}]},
            ],
        });
        let txs = ExplorerRestBackend::decode_block(reply).unwrap();
        assert_eq!(txs[0].outputs[0].recipient, None);
    }

    #[test]
    fn test_malformed_block_is_an_error() {
        let reply = json!({"transactions": [{"outputs": []}]});
        assert!(ExplorerRestBackend::decode_block(reply).is_err());
    }

    #[test]
    fn test_empty_balance_reply_means_no_record() {
        assert_eq!(ExplorerRestBackend::decode_balance(json!([])).unwrap(), None);
        assert_eq!(
            ExplorerRestBackend::decode_balance(Value::Null).unwrap(),
            None
        );
    }

    #[test]
    fn test_balance_pair_is_parsed_exactly() {
        let balance = ExplorerRestBackend::decode_balance(json!(["addr", "12.3"])).unwrap();
        assert_eq!(balance, Some(Decimal::new(123, 1)));
    }
}
