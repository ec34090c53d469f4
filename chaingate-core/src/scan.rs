//! The shared normalization pass.
//!
//! Every backend variant reduces its block shape to [`RawTransaction`]s;
//! this module turns those into canonical [`Block`]s. Zero filtering,
//! target matching, and id normalization live here — once — so a
//! backend revision can only break a variant's extraction step, never
//! the correctness rules.

use rust_decimal::Decimal;

use crate::backend::RawTransaction;
use crate::entities::{Block, Entry, Transaction};
use crate::normalize::Normalizer;

/// Normalize one block's raw transactions.
///
/// Outputs with non-positive values are dropped: backends represent
/// change markers, fees, and burns as zero or negative entries, and none
/// of those may surface as deposits. Outputs without a recognizable
/// recipient are skipped. With a `target` given (already normalized),
/// only entries whose normalized address equals it are retained; others
/// are dropped, never merged or summed. A raw transaction retaining no
/// entries is not emitted at all.
pub fn scan_block(
    height: u64,
    raw_transactions: Vec<RawTransaction>,
    normalizer: &Normalizer,
    target: Option<&str>,
) -> Block {
    let transactions = raw_transactions
        .into_iter()
        .filter_map(|raw| scan_transaction(raw, height, normalizer, target))
        .collect();
    Block {
        height,
        transactions,
    }
}

fn scan_transaction(
    raw: RawTransaction,
    height: u64,
    normalizer: &Normalizer,
    target: Option<&str>,
) -> Option<Transaction> {
    let entries: Vec<Entry> = raw
        .outputs
        .into_iter()
        .filter_map(|output| {
            if output.value <= Decimal::ZERO {
                return None;
            }
            let address = normalizer.address(output.recipient.as_deref()?);
            if let Some(target) = target {
                if address != target {
                    return None;
                }
            }
            Some(Entry {
                amount: output.value,
                address,
                output_index: output.index,
            })
        })
        .collect();

    if entries.is_empty() {
        return None;
    }

    Some(Transaction {
        id: normalizer.txid(&raw.id),
        block_height: Some(height),
        entries,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::RawOutput;
    use crate::settings::FeatureFlags;

    fn normalizer() -> Normalizer {
        Normalizer::new(FeatureFlags::default())
    }

    fn output(value: &str, recipient: Option<&str>, index: u32) -> RawOutput {
        RawOutput {
            value: value.parse().unwrap(),
            recipient: recipient.map(str::to_string),
            index,
        }
    }

    #[test]
    fn test_non_positive_outputs_are_never_emitted() {
        let raw = vec![RawTransaction {
            id: "abc".into(),
            outputs: vec![
                output("0", Some("X"), 0),
                output("-1.2", Some("X"), 1),
                output("2.5", Some("X"), 2),
            ],
        }];
        let block = scan_block(9, raw, &normalizer(), None);
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(block.transactions[0].entries.len(), 1);
        assert_eq!(block.transactions[0].entries[0].output_index, 2);
    }

    #[test]
    fn test_fully_filtered_transactions_are_not_emitted() {
        let raw = vec![RawTransaction {
            id: "abc".into(),
            outputs: vec![output("0", Some("X"), 0), output("1", None, 1)],
        }];
        let block = scan_block(9, raw, &normalizer(), None);
        assert!(block.transactions.is_empty());
    }

    #[test]
    fn test_recipient_less_outputs_are_skipped_not_fatal() {
        let raw = vec![RawTransaction {
            id: "abc".into(),
            outputs: vec![output("1", None, 0), output("1", Some("X"), 1)],
        }];
        let block = scan_block(9, raw, &normalizer(), None);
        assert_eq!(block.transactions[0].entries.len(), 1);
        assert_eq!(block.transactions[0].entries[0].address, "X");
    }

    #[test]
    fn test_target_scan_drops_other_recipients() {
        // Block 100: one UTXO transaction `abc` with a zero output to X
        // and a 1.5 output to Y.
        let raw = || {
            vec![RawTransaction {
                id: "abc".into(),
                outputs: vec![output("0", Some("X"), 0), output("1.5", Some("Y"), 1)],
            }]
        };

        let for_y = scan_block(100, raw(), &normalizer(), Some("Y"));
        assert_eq!(for_y.transactions.len(), 1);
        let tx = &for_y.transactions[0];
        assert_eq!(tx.id, "abc");
        assert_eq!(tx.block_height, Some(100));
        assert_eq!(
            tx.entries,
            vec![Entry {
                amount: "1.5".parse().unwrap(),
                address: "Y".into(),
                output_index: 1,
            }]
        );

        let for_x = scan_block(100, raw(), &normalizer(), Some("X"));
        assert!(for_x.transactions.is_empty());
    }

    #[test]
    fn test_target_matching_uses_normalized_addresses() {
        let n = Normalizer::new(FeatureFlags {
            case_sensitive: false,
            cash_addr_format: false,
        });
        let raw = vec![RawTransaction {
            id: "DEF".into(),
            outputs: vec![output("3", Some("0xAbCd"), 0)],
        }];
        let block = scan_block(5, raw, &n, Some("0xabcd"));
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(block.transactions[0].id, "def");
        assert_eq!(block.transactions[0].entries[0].address, "0xabcd");
    }

    #[test]
    fn test_entries_are_never_merged() {
        // Two credits to the same address stay two entries.
        let raw = vec![RawTransaction {
            id: "abc".into(),
            outputs: vec![output("1", Some("Y"), 0), output("2", Some("Y"), 3)],
        }];
        let block = scan_block(9, raw, &normalizer(), Some("Y"));
        let entries = &block.transactions[0].entries;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].output_index, 0);
        assert_eq!(entries[1].output_index, 3);
    }

    #[test]
    fn test_scanning_is_deterministic() {
        let raw = vec![RawTransaction {
            id: "abc".into(),
            outputs: vec![output("1.5", Some("Y"), 1)],
        }];
        let first = scan_block(100, raw.clone(), &normalizer(), Some("Y"));
        let second = scan_block(100, raw, &normalizer(), Some("Y"));
        assert_eq!(first, second);
    }
}
