//! Network scanner: per-chain block discovery.
//!
//! For each active network, discovers new finalized blocks and inserts
//! them into `evm_block`. The network row doubles as the lock
//! (`processing_status = 1` while a scan is running), so only one
//! worker advances a chain at a time and the high-water mark moves
//! strictly forward.

use std::sync::Arc;

use claimdex_providers::BlockchainClient;
use claimdex_storage::{Network, NetworkRepository};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::Result;

pub struct NetworkScanner {
    repository: NetworkRepository,
    client: Arc<dyn BlockchainClient>,
    catch_up_threshold: u64,
    catch_up_batch_size: u64,
    follow_batch_size: u64,
}

/// Inclusive block range still to be scanned, or `None` when the
/// scanner is already at the safe head. On a cold start only the safe
/// head itself is ingested.
fn scan_range(
    last_discovered: Option<i64>,
    latest_on_chain: u64,
    finality_depth: u64,
) -> Option<(u64, u64)> {
    let safe_latest = latest_on_chain.saturating_sub(finality_depth);
    let start = match last_discovered {
        Some(last) => last as u64 + 1,
        None => safe_latest,
    };
    if start > safe_latest {
        return None;
    }
    Some((start, safe_latest))
}

/// Split `[start, end]` into contiguous batches of at most `batch_size`.
fn plan_batches(start: u64, end: u64, batch_size: u64) -> Vec<(u64, u64)> {
    let mut batches = Vec::new();
    let mut current = start;
    while current <= end {
        let batch_end = (current + batch_size - 1).min(end);
        batches.push((current, batch_end));
        current = batch_end + 1;
    }
    batches
}

impl NetworkScanner {
    pub fn new(
        repository: NetworkRepository,
        client: Arc<dyn BlockchainClient>,
        catch_up_threshold: u64,
        catch_up_batch_size: u64,
        follow_batch_size: u64,
    ) -> Self {
        Self {
            repository,
            client,
            catch_up_threshold,
            catch_up_batch_size,
            follow_batch_size,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let networks = self.repository.active_networks().await?;
        if networks.is_empty() {
            info!("no active networks to scan");
            return Ok(());
        }

        join_all(networks.iter().map(|n| self.process_network(n))).await;
        Ok(())
    }

    async fn process_network(&self, network: &Network) {
        let chain_id = network.chain_id;
        info!("processing network chain_id={}", chain_id);

        // Lock the network in a short transaction of its own.
        let locked = async {
            let mut tx = self.repository.pool().begin().await?;
            self.repository.begin_processing(&mut tx, chain_id).await?;
            tx.commit().await
        }
        .await;
        if let Err(e) = locked {
            error!("[chain {}] failed to lock network: {}", chain_id, e);
            return;
        }

        if let Err(e) = self.scan_network(network).await {
            error!("[chain {}] failed to process network: {}", chain_id, e);
        }

        // Unlock in another short transaction, even after a failed scan.
        let unlocked = async {
            let mut tx = self.repository.pool().begin().await?;
            self.repository.finish_processing(&mut tx, chain_id).await?;
            tx.commit().await
        }
        .await;
        match unlocked {
            Ok(()) => info!("[chain {}] network unlocked", chain_id),
            Err(e) => error!("[chain {}] CRITICAL: failed to unlock network: {}", chain_id, e),
        }
    }

    async fn scan_network(&self, network: &Network) -> Result<()> {
        let chain_id = network.chain_id;
        let latest = self.client.latest_block_number(chain_id).await?;

        let (start, safe_latest) = match scan_range(
            network.last_discovered_block_number,
            latest,
            network.finality_depth as u64,
        ) {
            Some(range) => range,
            None => {
                info!(
                    "[chain {}] no new blocks to scan (safe head {})",
                    chain_id,
                    latest.saturating_sub(network.finality_depth as u64)
                );
                return Ok(());
            }
        };

        let block_count = safe_latest - start + 1;
        let batch_size = if block_count > self.catch_up_threshold {
            info!("[chain {}] entering catch-up mode", chain_id);
            self.catch_up_batch_size
        } else {
            info!("[chain {}] entering follow-the-head mode", chain_id);
            self.follow_batch_size
        };
        info!(
            "[chain {}] scanning blocks {} to {} ({} blocks)",
            chain_id, start, safe_latest, block_count
        );

        // Each batch commits on its own; the first failure aborts the
        // loop so later ranges are not attempted with a gap in between.
        for (batch_start, batch_end) in plan_batches(start, safe_latest, batch_size) {
            self.process_batch(chain_id, batch_start, batch_end).await?;
        }

        info!("[chain {}] saved blocks up to {}", chain_id, safe_latest);
        Ok(())
    }

    /// Fetch and persist one contiguous batch in a single transaction:
    /// block rows and the advanced high-water mark commit together.
    async fn process_batch(&self, chain_id: i64, start: u64, end: u64) -> Result<()> {
        debug!("[chain {}] processing batch {}-{}", chain_id, start, end);

        let mut tx = self.repository.pool().begin().await?;

        let fetches = (start..=end).map(|number| self.client.block_by_number(chain_id, number));
        let results = join_all(fetches).await;

        let mut blocks = Vec::new();
        for result in results {
            match result? {
                Some(block) => match parse_block_header(chain_id, &block) {
                    Some(row) => blocks.push(row),
                    None => warn!("[chain {}] received invalid block data: {}", chain_id, block),
                },
                None => warn!("[chain {}] provider returned no block data", chain_id),
            }
        }

        self.repository.insert_blocks(&mut tx, &blocks).await?;
        // The mark advances to the batch end even when individual
        // blocks were skipped as invalid; they will not be retried.
        self.repository
            .update_last_block(&mut tx, chain_id, end as i64)
            .await?;
        tx.commit().await?;

        info!("[chain {}] committed batch {}-{}", chain_id, start, end);
        Ok(())
    }
}

fn parse_block_header(chain_id: i64, block: &Value) -> Option<(i64, i64, String)> {
    let number = block.get("number").and_then(Value::as_str)?;
    let number = i64::from_str_radix(number.trim_start_matches("0x"), 16).ok()?;
    let hash = block.get("hash").and_then(Value::as_str)?;
    Some((chain_id, number, hash.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cold_start_ingests_exactly_the_safe_head() {
        // latest=100, finality=10 -> only block 90.
        assert_eq!(scan_range(None, 100, 10), Some((90, 90)));
    }

    #[test]
    fn warm_start_resumes_after_the_high_water_mark() {
        assert_eq!(scan_range(Some(90), 10090, 10), Some((91, 10080)));
    }

    #[test]
    fn no_range_when_caught_up() {
        assert_eq!(scan_range(Some(90), 100, 10), None);
        assert_eq!(scan_range(Some(95), 100, 10), None);
    }

    #[test]
    fn finality_deeper_than_the_chain_clamps_to_genesis() {
        assert_eq!(scan_range(None, 5, 10), Some((0, 0)));
    }

    #[test]
    fn batches_are_contiguous_and_bounded() {
        assert_eq!(
            plan_batches(91, 10080, 50)[..3],
            [(91, 140), (141, 190), (191, 240)]
        );
        let batches = plan_batches(91, 10080, 50);
        assert_eq!(batches.last(), Some(&(10041, 10080)));
        // Consecutive batches leave no gaps.
        for pair in batches.windows(2) {
            assert_eq!(pair[0].1 + 1, pair[1].0);
        }
    }

    #[test]
    fn single_block_range_is_one_batch() {
        assert_eq!(plan_batches(90, 90, 50), vec![(90, 90)]);
    }

    #[test]
    fn block_header_parsing() {
        let block = json!({"number": "0x5a", "hash": "0xabc"});
        assert_eq!(
            parse_block_header(1, &block),
            Some((1, 90, "0xabc".to_string()))
        );
        assert_eq!(parse_block_header(1, &json!({"hash": "0xabc"})), None);
        assert_eq!(parse_block_header(1, &json!({"number": "0x5a"})), None);
        assert_eq!(parse_block_header(1, &json!({"number": "zz", "hash": "0xabc"})), None);
    }
}
