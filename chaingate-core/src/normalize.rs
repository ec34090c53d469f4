//! Address and transaction-id canonicalization.
//!
//! Matching and deduplication happen only on normalized strings: two
//! representations that normalize identically are the same address for
//! every comparison in this crate. Normalization is idempotent, so
//! values read back from storage can be passed through again safely.

use crate::settings::FeatureFlags;

/// String canonicalizer configured from the adapter's feature flags.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    case_sensitive: bool,
    cash_addr_format: bool,
}

impl Normalizer {
    pub fn new(features: FeatureFlags) -> Self {
        Self {
            case_sensitive: features.case_sensitive,
            cash_addr_format: features.cash_addr_format,
        }
    }

    /// Canonical form of a backend address.
    ///
    /// Chains using the prefixed address format (`tag:payload`) define
    /// addresses case-insensitively, so the network tag is dropped and
    /// the payload folded. Otherwise the value is kept as delivered,
    /// folded to lowercase unless the chain treats addresses as
    /// case-sensitive.
    pub fn address(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if self.cash_addr_format {
            let payload = trimmed.split_once(':').map_or(trimmed, |(_, p)| p);
            return payload.to_lowercase();
        }
        if self.case_sensitive {
            trimmed.to_string()
        } else {
            trimmed.to_lowercase()
        }
    }

    /// Canonical form of a transaction id.
    ///
    /// Ids are hex strings; their case carries no information regardless
    /// of how the chain treats address case. A `0x` tag folds with the
    /// rest.
    pub fn txid(&self, raw: &str) -> String {
        raw.trim().to_lowercase()
    }
}
