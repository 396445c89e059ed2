//! Repository for the block scanner.

use sqlx::postgres::PgPool;

use super::PgTx;
use crate::models::PendingBlock;

#[derive(Clone)]
pub struct BlockRepository {
    pool: PgPool,
}

impl BlockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Lease a batch of unprocessed blocks. `SKIP LOCKED` lets a second
    /// pipeline instance lease a disjoint batch without blocking.
    pub async fn lease_pending(
        &self,
        tx: &mut PgTx<'_>,
        batch_size: i64,
    ) -> Result<Vec<PendingBlock>, sqlx::Error> {
        sqlx::query_as::<_, PendingBlock>(
            r#"
            SELECT id, evm_network_chain_id, block_number
            FROM evm_block
            WHERE processing_status = 0
            ORDER BY id
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        "#,
        )
        .bind(batch_size)
        .fetch_all(&mut **tx)
        .await
    }

    pub async fn set_status(
        &self,
        tx: &mut PgTx<'_>,
        block_ids: &[i64],
        status: i16,
    ) -> Result<(), sqlx::Error> {
        if block_ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE evm_block SET processing_status = $1 WHERE id = ANY($2)")
            .bind(status)
            .bind(block_ids)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Bulk insert the contract-creation transactions found in a batch,
    /// ignoring hashes already recorded.
    pub async fn insert_creation_txs(
        &self,
        tx: &mut PgTx<'_>,
        txs: &[(i64, i64, String)],
    ) -> Result<(), sqlx::Error> {
        for (block_id, chain_id, tx_hash) in txs {
            sqlx::query(
                r#"
                INSERT INTO evm_block_create_contract_transaction
                    (evm_block_id, evm_network_chain_id, transaction_hash)
                VALUES ($1, $2, $3)
                ON CONFLICT (evm_network_chain_id, transaction_hash) DO NOTHING
            "#,
            )
            .bind(block_id)
            .bind(chain_id)
            .bind(tx_hash)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    pub async fn mark_done(
        &self,
        tx: &mut PgTx<'_>,
        block_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        if block_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            r#"
            UPDATE evm_block
            SET processing_status = 2, discovered_at = NOW()
            WHERE id = ANY($1)
        "#,
        )
        .bind(block_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
