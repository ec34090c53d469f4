//! Blockchain scanner adapter.
//!
//! One instance serves one configured chain and is owned by exactly one
//! scanning worker: the memoized backend client is instance state with
//! no internal locking, which is why every operation takes `&mut self`.
//! The adapter holds no scan cursor — that belongs to the scheduler
//! driving it — and never retries; failures propagate to the caller,
//! whose polling cadence is the retry policy.

use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::backend::{ChainBackend, ProtocolVariant};
use crate::client;
use crate::entities::Block;
use crate::normalize::Normalizer;
use crate::scan;
use crate::settings::{BlockchainSettings, FeatureFlags};

/// Request timeout for node/explorer calls.
const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors a blockchain adapter exposes to collaborators.
///
/// Transport and protocol failures never escape unmapped: everything
/// that is not a domain-specific result crosses the boundary as
/// `Client`, so collaborators never branch on transport internals.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend call failed; wraps the transport-level cause.
    #[error("blockchain client error: {0}")]
    Client(#[from] client::Error),

    /// The backend holds no balance record for the address. Not a
    /// failure of the call itself, and distinct from a zero balance.
    #[error("no balance record for address {0}")]
    UnavailableAddressBalance(String),

    /// A required setting is absent. Raised at configure time, never
    /// deferred to first use.
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),
}

pub struct Blockchain {
    variant: ProtocolVariant,
    normalizer: Normalizer,
    settings: Option<BlockchainSettings>,
    backend: Option<Box<dyn ChainBackend>>,
}

impl Blockchain {
    /// Create an unconfigured adapter for one protocol variant.
    pub fn new(variant: ProtocolVariant, features: FeatureFlags) -> Self {
        Self {
            variant,
            normalizer: Normalizer::new(features),
            settings: None,
            backend: None,
        }
    }

    /// Apply a configuration.
    ///
    /// Destructive: the memoized backend client — and with it any bearer
    /// token — is discarded before the new settings take effect, so a
    /// successor configuration can never reuse a predecessor's
    /// authenticated session.
    pub fn configure(&mut self, settings: BlockchainSettings) -> Result<(), Error> {
        self.backend = None;
        if settings.server.is_none() {
            return Err(Error::MissingSetting("server"));
        }
        self.settings = Some(settings);
        Ok(())
    }

    /// Height of the newest block the backend knows.
    pub async fn latest_height(&mut self) -> Result<u64, Error> {
        let height = self.backend()?.latest_height().await?;
        debug!(height, "fetched latest height");
        Ok(height)
    }

    /// Fetch and normalize the block at `height`.
    ///
    /// Safe to call repeatedly for the same height: nothing is mutated
    /// remotely, and an unchanged backend yields an equal block.
    pub async fn fetch_block(&mut self, height: u64) -> Result<Block, Error> {
        self.fetch_filtered(height, None).await
    }

    /// Fetch the block at `height`, retaining only entries credited to
    /// `address`.
    pub async fn fetch_block_for(&mut self, height: u64, address: &str) -> Result<Block, Error> {
        let target = self.normalizer.address(address);
        self.fetch_filtered(height, Some(target)).await
    }

    /// Balance of `address` as the backend reports it.
    ///
    /// A backend without any record for the address yields
    /// [`Error::UnavailableAddressBalance`]; a recorded balance of zero
    /// is a valid result and comes back as `Ok(0)`.
    pub async fn load_balance(&mut self, address: &str, currency_id: &str) -> Result<Decimal, Error> {
        let normalized = self.normalizer.address(address);
        let balance = self
            .backend()?
            .address_balance(&normalized, currency_id)
            .await?;
        balance.ok_or(Error::UnavailableAddressBalance(normalized))
    }

    async fn fetch_filtered(&mut self, height: u64, target: Option<String>) -> Result<Block, Error> {
        let normalizer = self.normalizer;
        let raw = self.backend()?.block_transactions(height).await?;
        let block = scan::scan_block(height, raw, &normalizer, target.as_deref());
        debug!(
            height,
            transactions = block.transactions.len(),
            "scanned block"
        );
        Ok(block)
    }

    // Lazily (re)built on first use after a configure.
    fn backend(&mut self) -> Result<&mut Box<dyn ChainBackend>, Error> {
        if self.backend.is_none() {
            let settings = self
                .settings
                .as_ref()
                .ok_or(Error::MissingSetting("server"))?;
            let server = settings
                .server
                .as_deref()
                .ok_or(Error::MissingSetting("server"))?;
            self.backend = Some(self.variant.connect(server, IDLE_TIMEOUT)?);
        }
        match self.backend.as_mut() {
            Some(backend) => Ok(backend),
            None => Err(Error::MissingSetting("server")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::backend::{RawOutput, RawTransaction};
    use async_trait::async_trait;

    /// Fixed backend: one block 100 with tx `ABC`, a zero output to X
    /// and a 1.5 output to Y; no balance record for "unknown".
    struct FixtureBackend;

    #[async_trait]
    impl ChainBackend for FixtureBackend {
        async fn latest_height(&mut self) -> Result<u64, client::Error> {
            Ok(100)
        }

        async fn block_transactions(
            &mut self,
            _height: u64,
        ) -> Result<Vec<RawTransaction>, client::Error> {
            Ok(vec![RawTransaction {
                id: "ABC".into(),
                outputs: vec![
                    RawOutput {
                        value: "0".parse().unwrap(),
                        recipient: Some("X".into()),
                        index: 0,
                    },
                    RawOutput {
                        value: "1.5".parse().unwrap(),
                        recipient: Some("Y".into()),
                        index: 1,
                    },
                ],
            }])
        }

        async fn address_balance(
            &mut self,
            address: &str,
            _currency_id: &str,
        ) -> Result<Option<Decimal>, client::Error> {
            if address == "unknown" {
                Ok(None)
            } else {
                Ok(Some(Decimal::ZERO))
            }
        }
    }

    fn adapter_with_fixture() -> Blockchain {
        let mut adapter = Blockchain::new(ProtocolVariant::ExplorerRest, FeatureFlags::default());
        adapter
            .configure(BlockchainSettings {
                server: Some("http://127.0.0.1:3001".into()),
                currencies: vec!["coin".into()],
            })
            .unwrap();
        adapter.backend = Some(Box::new(FixtureBackend));
        adapter
    }

    #[tokio::test]
    async fn test_unconfigured_adapter_fails_fast() {
        let mut adapter = Blockchain::new(ProtocolVariant::ExplorerRest, FeatureFlags::default());
        match adapter.latest_height().await {
            Err(Error::MissingSetting(key)) => assert_eq!(key, "server"),
            other => panic!("expected MissingSetting, got {other:?}"),
        }
    }

    #[test]
    fn test_configure_requires_a_server() {
        let mut adapter = Blockchain::new(ProtocolVariant::CoreRpc, FeatureFlags::default());
        match adapter.configure(BlockchainSettings::default()) {
            Err(Error::MissingSetting(key)) => assert_eq!(key, "server"),
            other => panic!("expected MissingSetting, got {other:?}"),
        }
    }

    #[test]
    fn test_reconfigure_discards_the_memoized_backend() {
        let mut adapter = adapter_with_fixture();
        assert!(adapter.backend.is_some());
        adapter
            .configure(BlockchainSettings {
                server: Some("http://127.0.0.1:3002".into()),
                currencies: vec![],
            })
            .unwrap();
        assert!(adapter.backend.is_none());
    }

    #[tokio::test]
    async fn test_target_scan_end_to_end() {
        let mut adapter = adapter_with_fixture();

        let for_y = adapter.fetch_block_for(100, "Y").await.unwrap();
        assert_eq!(for_y.transactions.len(), 1);
        let tx = &for_y.transactions[0];
        assert_eq!(tx.id, "abc");
        assert_eq!(tx.entries.len(), 1);
        assert_eq!(tx.entries[0].amount, "1.5".parse().unwrap());
        assert_eq!(tx.entries[0].address, "Y");
        assert_eq!(tx.entries[0].output_index, 1);

        let for_x = adapter.fetch_block_for(100, "X").await.unwrap();
        assert!(for_x.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_block_is_idempotent() {
        let mut adapter = adapter_with_fixture();
        let first = adapter.fetch_block(100).await.unwrap();
        let second = adapter.fetch_block(100).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_balance_record_is_distinguished_from_zero() {
        let mut adapter = adapter_with_fixture();

        match adapter.load_balance("unknown", "coin").await {
            Err(Error::UnavailableAddressBalance(address)) => assert_eq!(address, "unknown"),
            other => panic!("expected UnavailableAddressBalance, got {other:?}"),
        }

        let zero = adapter.load_balance("known", "coin").await.unwrap();
        assert_eq!(zero, Decimal::ZERO);
    }
}
