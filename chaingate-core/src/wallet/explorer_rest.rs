//! Token-authenticated REST wallet variant.
//!
//! Every privileged call is preceded by an `/unlock` exchange of the
//! wallet secret for a bearer token; the token lives in the transport
//! client and dies with it on reconfiguration. This family's
//! `/send-transaction` has no notion of deducting the fee from the
//! transfer amount, so fee deduction is unsupported.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use super::WalletBackend;
use crate::amount;
use crate::client::{self, HttpClient};
use crate::entities::WithdrawalRequest;

pub struct RestWalletBackend {
    client: HttpClient,
}

impl RestWalletBackend {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WalletBackend for RestWalletBackend {
    async fn unlock(&mut self, secret: &str) -> Result<(), client::Error> {
        self.client.unlock(secret).await?;
        Ok(())
    }

    async fn create_address(&mut self) -> Result<String, client::Error> {
        let reply = self
            .client
            .post("/generate-child-wallet", &json!({}))
            .await?;
        reply
            .get("address")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                client::Error::Unexpected("generate-child-wallet reply carried no address".into())
            })
    }

    fn supports_fee_deduction(&self) -> bool {
        false
    }

    async fn transfer(&mut self, request: &WithdrawalRequest) -> Result<String, client::Error> {
        let mut body = json!({
            "from": request.from,
            "address": request.to,
            "value": request.amount,
        });
        if let (Some(fee), Some(map)) = (request.fee, body.as_object_mut()) {
            map.insert("fee".into(), json!(fee));
        }
        let reply = self.client.post("/send-transaction", &body).await?;
        reply
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                client::Error::Unexpected("send-transaction reply carried no id".into())
            })
    }

    async fn validate_address(&mut self, address: &str) -> Result<bool, client::Error> {
        let reply = self
            .client
            .get(&format!(
                "/validate-address?address={}",
                urlencoding::encode(address)
            ))
            .await?;
        reply
            .get("valid")
            .and_then(Value::as_bool)
            .ok_or_else(|| {
                client::Error::Unexpected("validate-address reply carried no verdict".into())
            })
    }

    async fn wallet_balance(&mut self) -> Result<Decimal, client::Error> {
        let reply = self.client.get("/get-addresses").await?;
        let addresses = reply.get("addresses").cloned().ok_or_else(|| {
            client::Error::Unexpected("get-addresses reply carried no addresses".into())
        })?;
        let reply = self
            .client
            .post("/get-balance-sum", &json!({ "addresses": addresses }))
            .await?;
        decode_balance_sum(&reply)
    }
}

/// The balance sum arrives either bare or wrapped in `{"sum": ..}`.
fn decode_balance_sum(reply: &Value) -> Result<Decimal, client::Error> {
    let raw = reply.get("sum").unwrap_or(reply);
    amount::decimal_from_value(raw).map_err(client::Error::Unexpected)
}
