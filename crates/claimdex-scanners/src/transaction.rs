//! Transaction scanner: receipt resolution and source fetching.
//!
//! For each pending creation transaction, resolves the deployed
//! contract address from the receipt, fetches source and ABI, and
//! routes the contract into a verified record (with its canonical
//! source bundle) or an unverified one.

use std::sync::Arc;

use claimdex_analysis::canonicalize_source;
use claimdex_core::status::processing;
use claimdex_providers::BlockchainClient;
use claimdex_storage::{PendingCreationTx, TransactionRepository};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;

pub struct TransactionScanner {
    repository: TransactionRepository,
    client: Arc<dyn BlockchainClient>,
    batch_size: i64,
}

impl TransactionScanner {
    pub fn new(
        repository: TransactionRepository,
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

        let rows = self.repository.lease_pending(&mut tx, self.batch_size).await?;
        if rows.is_empty() {
            info!("no unprocessed contract transactions found");
            tx.commit().await?;
            return Ok(());
        }
        info!("processing {} transactions", rows.len());

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        self.repository
            .set_status(&mut tx, &ids, processing::IN_PROGRESS)
            .await?;

        // One failed row aborts and rolls back the whole batch.
        for row in &rows {
            self.process_transaction(&mut tx, row).await?;
        }

        tx.commit().await?;
        info!("successfully processed batch of {} transactions", rows.len());
        Ok(())
    }

    async fn process_transaction(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        row: &PendingCreationTx,
    ) -> Result<()> {
        let chain_id = row.evm_network_chain_id;
        debug!("processing tx_id={} (hash: {})", row.id, row.transaction_hash);

        let receipt = self
            .client
            .transaction_receipt(chain_id, &row.transaction_hash)
            .await?;
        let contract_address = receipt
            .as_ref()
            .and_then(|r| r.get("contractAddress"))
            .and_then(Value::as_str)
            .filter(|a| !a.is_empty())
            .map(str::to_owned);

        let contract_address = match contract_address {
            Some(address) => address,
            None => {
                warn!(
                    "no contractAddress in receipt for tx_hash={}, marking as failed",
                    row.transaction_hash
                );
                self.repository
                    .set_status(tx, &[row.id], processing::DONE)
                    .await?;
                return Ok(());
            }
        };

        let source = self.client.contract_source(chain_id, &contract_address).await?;
        let source = match source {
            Some(s) => s,
            None => {
                warn!("source lookup returned no data for {}", contract_address);
                self.repository
                    .save_unverified_contract(tx, row.id, chain_id, &contract_address)
                    .await?;
                return Ok(());
            }
        };

        if source.source_code.trim().is_empty() {
            info!("found UNVERIFIED contract {} (tx_id={})", contract_address, row.id);
            self.repository
                .save_unverified_contract(tx, row.id, chain_id, &contract_address)
                .await?;
            return Ok(());
        }

        info!("found VERIFIED contract {} (tx_id={})", contract_address, row.id);
        // A source that looks like JSON but does not parse is a
        // structural error: propagate and roll the batch back.
        let canonical = canonicalize_source(&source.source_code)?;
        self.repository
            .save_contract_and_source(
                tx,
                row.id,
                chain_id,
                &contract_address,
                source.contract_name.as_deref(),
                &canonical,
                &source.abi,
            )
            .await?;
        Ok(())
    }
}
