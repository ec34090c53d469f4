//! Wallet adapter: address issuance, balance aggregation, withdrawal
//! issuance.
//!
//! The adapter unlocks the backend with the configured wallet secret
//! immediately before privileged operations and never logs or persists
//! the secret beyond the call. Like the scanner adapter, one instance
//! belongs to one worker; every operation takes `&mut self`.

mod core_rpc;
mod explorer_rest;

pub use core_rpc::RpcWalletBackend;
pub use explorer_rest::RestWalletBackend;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::{self, HttpClient};
use crate::entities::{Address, WithdrawalRequest};
use crate::normalize::Normalizer;
use crate::settings::{FeatureFlags, WalletSettings};

/// Request timeout for wallet backends. Signing can be slow.
const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors a wallet adapter exposes to collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend call failed; wraps the transport-level cause.
    #[error("wallet client error: {0}")]
    Client(#[from] client::Error),

    /// A required setting is absent. Raised at configure time, never
    /// deferred to first use.
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    /// The withdrawal asked to deduct the fee from the amount, but this
    /// backend variant cannot; the request is rejected rather than the
    /// flag silently dropped.
    #[error("backend cannot deduct the fee from the transfer amount")]
    FeeDeductionUnsupported,
}

/// Wallet protocol variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletVariant {
    /// Token-authenticated REST wallet: `/unlock`, then signed calls.
    #[serde(rename = "explorer-rest")]
    ExplorerRest,
    /// Bitcoind-family RPC wallet: `walletpassphrase`, then
    /// `sendtoaddress`.
    #[serde(rename = "core-rpc")]
    CoreRpc,
}

/// Strategy surface a wallet backend variant must cover.
#[async_trait]
pub trait WalletBackend: Send {
    /// Unlock the wallet for the privileged operations that follow.
    async fn unlock(&mut self, secret: &str) -> Result<(), client::Error>;

    /// Request a fresh managed address.
    async fn create_address(&mut self) -> Result<String, client::Error>;

    /// Whether the variant can deduct the network fee from the transfer
    /// amount.
    fn supports_fee_deduction(&self) -> bool;

    /// Issue the transfer; returns the backend's transaction id.
    async fn transfer(&mut self, request: &WithdrawalRequest) -> Result<String, client::Error>;

    /// Ask the backend to validate `address`.
    async fn validate_address(&mut self, address: &str) -> Result<bool, client::Error>;

    /// Total balance across every address the backend reports as
    /// belonging to this wallet.
    async fn wallet_balance(&mut self) -> Result<Decimal, client::Error>;
}

struct Configured {
    uri: String,
    address: String,
    secret: String,
    currency_id: String,
}

pub struct Wallet {
    variant: WalletVariant,
    normalizer: Normalizer,
    configured: Option<Configured>,
    backend: Option<Box<dyn WalletBackend>>,
}

impl Wallet {
    /// Create an unconfigured adapter for one wallet variant.
    pub fn new(variant: WalletVariant, features: FeatureFlags) -> Self {
        Self {
            variant,
            normalizer: Normalizer::new(features),
            configured: None,
            backend: None,
        }
    }

    /// Apply a configuration, validating every required key eagerly.
    ///
    /// Destructive: the held backend client and any bearer token are
    /// discarded first. Each missing key fails with [`Error::MissingSetting`]
    /// naming it, before any network call is attempted.
    pub fn configure(&mut self, settings: WalletSettings) -> Result<(), Error> {
        self.backend = None;

        let wallet = settings.wallet.ok_or(Error::MissingSetting("wallet"))?;
        let uri = wallet.uri.ok_or(Error::MissingSetting("uri"))?;
        let address = wallet.address.ok_or(Error::MissingSetting("address"))?;
        let secret = wallet.secret.ok_or(Error::MissingSetting("secret"))?;

        let currency = settings.currency.ok_or(Error::MissingSetting("currency"))?;
        let currency_id = currency.id.ok_or(Error::MissingSetting("currency.id"))?;

        self.configured = Some(Configured {
            uri,
            address: self.normalizer.address(&address),
            secret,
            currency_id,
        });
        Ok(())
    }

    /// The configured source address, once configured.
    pub fn configured_address(&self) -> Option<&str> {
        self.configured.as_ref().map(|c| c.address.as_str())
    }

    /// The configured currency id, once configured.
    pub fn currency_id(&self) -> Option<&str> {
        self.configured.as_ref().map(|c| c.currency_id.as_str())
    }

    /// Request a new managed address from the backend.
    pub async fn create_address(&mut self) -> Result<Address, Error> {
        let secret = self.secret()?.to_string();
        let backend = self.backend()?;
        backend.unlock(&secret).await?;
        let raw = backend.create_address().await?;
        Ok(Address {
            value: self.normalizer.address(&raw),
            is_valid: true,
            balance: None,
        })
    }

    /// Issue a withdrawal; returns the normalized transaction id.
    ///
    /// The unlock step runs immediately before the transfer call, with
    /// the configured wallet secret. A fee-deduction request against a
    /// variant that cannot honor it fails closed — the flag is never
    /// silently ignored.
    pub async fn create_withdrawal(&mut self, request: &WithdrawalRequest) -> Result<String, Error> {
        let secret = self.secret()?.to_string();
        let backend = self.backend()?;
        if request.subtract_fee_from_amount && !backend.supports_fee_deduction() {
            return Err(Error::FeeDeductionUnsupported);
        }
        backend.unlock(&secret).await?;
        let txid = backend.transfer(request).await?;
        Ok(self.normalizer.txid(&txid))
    }

    /// Delegate validation of `address` to the backend.
    ///
    /// A backend that cannot answer yields `Client`; no verdict is ever
    /// fabricated here.
    pub async fn inspect_address(&mut self, address: &str) -> Result<Address, Error> {
        let value = self.normalizer.address(address);
        let is_valid = self.backend()?.validate_address(&value).await?;
        Ok(Address {
            value,
            is_valid,
            balance: None,
        })
    }

    /// Total balance across the wallet's managed addresses.
    pub async fn load_balance(&mut self) -> Result<Decimal, Error> {
        Ok(self.backend()?.wallet_balance().await?)
    }

    fn secret(&self) -> Result<&str, Error> {
        self.configured
            .as_ref()
            .map(|c| c.secret.as_str())
            .ok_or(Error::MissingSetting("secret"))
    }

    // Lazily (re)built on first use after a configure.
    fn backend(&mut self) -> Result<&mut Box<dyn WalletBackend>, Error> {
        if self.backend.is_none() {
            let configured = self
                .configured
                .as_ref()
                .ok_or(Error::MissingSetting("wallet"))?;
            let client = HttpClient::new(&configured.uri, IDLE_TIMEOUT)?;
            self.backend = Some(match self.variant {
                WalletVariant::ExplorerRest => Box::new(RestWalletBackend::new(client)),
                WalletVariant::CoreRpc => Box::new(RpcWalletBackend::new(client)),
            });
        }
        match self.backend.as_mut() {
            Some(backend) => Ok(backend),
            None => Err(Error::MissingSetting("wallet")),
        }
    }
}
