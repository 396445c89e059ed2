//! Block scanner: contract-creation extraction.
//!
//! Leases pending blocks, fetches their transaction lists and records
//! every transaction with a null `to` field (a contract creation). The
//! whole batch lives in one transaction: a provider failure rolls
//! everything back and the blocks return to pending.

use std::sync::Arc;

use claimdex_core::status::processing;
use claimdex_providers::BlockchainClient;
use claimdex_storage::BlockRepository;
use futures::future::join_all;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;

pub struct BlockScanner {
    repository: BlockRepository,
    client: Arc<dyn BlockchainClient>,
    batch_size: i64,
}

/// Pull `(block_id, chain_id, tx_hash)` tuples for every contract
/// creation in a block payload. A transaction with no `to` key counts
/// the same as an explicit null.
fn extract_creation_txs(block_id: i64, chain_id: i64, block: &Value) -> Vec<(i64, i64, String)> {
    let mut found = Vec::new();
    let txs = match block.get("transactions").and_then(Value::as_array) {
        Some(txs) => txs,
        None => return found,
    };
    for tx in txs {
        if tx.get("to").map_or(true, Value::is_null) {
            if let Some(hash) = tx.get("hash").and_then(Value::as_str) {
                found.push((block_id, chain_id, hash.to_string()));
            }
        }
    }
    found
}

impl BlockScanner {
    pub fn new(
        repository: BlockRepository,
        client: Arc<dyn BlockchainClient>,
        batch_size: i64,
    ) -> Self {
        Self {
            repository,
            client,
            batch_size,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let mut tx = self.repository.pool().begin().await?;

        let blocks = self.repository.lease_pending(&mut tx, self.batch_size).await?;
        if blocks.is_empty() {
            info!("no unprocessed blocks found");
            tx.commit().await?;
            return Ok(());
        }
        info!("processing {} blocks", blocks.len());

        let block_ids: Vec<i64> = blocks.iter().map(|b| b.id).collect();
        self.repository
            .set_status(&mut tx, &block_ids, processing::IN_PROGRESS)
            .await?;

        let fetches = blocks
            .iter()
            .map(|b| self.client.block_by_number(b.evm_network_chain_id, b.block_number as u64));
        let results = join_all(fetches).await;

        let mut creations = Vec::new();
        for (block, result) in blocks.iter().zip(results) {
            // Any provider failure aborts the batch; the dropped
            // transaction rolls the leased blocks back to pending.
            let data = result?;
            let data = match data {
                Some(d) => d,
                None => {
                    warn!(
                        "no data for block id={} (chain {}, number {}), marking completed",
                        block.id, block.evm_network_chain_id, block.block_number
                    );
                    continue;
                }
            };
            creations.extend(extract_creation_txs(block.id, block.evm_network_chain_id, &data));
        }

        if !creations.is_empty() {
            info!("found {} contract creation(s) in this batch", creations.len());
            self.repository.insert_creation_txs(&mut tx, &creations).await?;
        }

        self.repository.mark_done(&mut tx, &block_ids).await?;
        tx.commit().await?;

        info!("successfully processed batch of {} blocks", blocks.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_null_to_transactions_are_creations() {
        let block = json!({
            "transactions": [
                {"to": null, "hash": "0xabc"},
                {"to": "0x2222222222222222222222222222222222222222", "hash": "0xdef"}
            ]
        });
        assert_eq!(
            extract_creation_txs(7, 1, &block),
            vec![(7, 1, "0xabc".to_string())]
        );
    }

    #[test]
    fn missing_to_field_counts_as_creation() {
        let block = json!({"transactions": [{"hash": "0xabc"}]});
        assert_eq!(extract_creation_txs(1, 1, &block).len(), 1);
    }

    #[test]
    fn creations_without_a_hash_are_dropped() {
        let block = json!({"transactions": [{"to": null}]});
        assert!(extract_creation_txs(1, 1, &block).is_empty());
    }

    #[test]
    fn blocks_without_transactions_yield_nothing() {
        assert!(extract_creation_txs(1, 1, &json!({})).is_empty());
        assert!(extract_creation_txs(1, 1, &json!({"transactions": []})).is_empty());
        assert!(extract_creation_txs(1, 1, &json!({"transactions": "0x0"})).is_empty());
    }
}
