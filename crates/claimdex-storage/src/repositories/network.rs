//! Repository for the network scanner.

use sqlx::postgres::PgPool;

use super::PgTx;
use crate::models::Network;

#[derive(Clone)]
pub struct NetworkRepository {
    pool: PgPool,
}

impl NetworkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Networks that are active and not currently being scanned.
    pub async fn active_networks(&self) -> Result<Vec<Network>, sqlx::Error> {
        sqlx::query_as::<_, Network>(
            r#"
            SELECT chain_id, last_discovered_block_number, finality_depth
            FROM evm_network
            WHERE active_status = 1 AND processing_status = 0
        "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Mark a network as being scanned (`processing_status = 1`).
    pub async fn begin_processing(
        &self,
        tx: &mut PgTx<'_>,
        chain_id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE evm_network SET processing_status = 1 WHERE chain_id = $1")
            .bind(chain_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Release the network lock and refresh its scan timestamp. Runs
    /// whether or not the scan succeeded.
    pub async fn finish_processing(
        &self,
        tx: &mut PgTx<'_>,
        chain_id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE evm_network
            SET processing_status = 0, discovered_at = NOW()
            WHERE chain_id = $1
        "#,
        )
        .bind(chain_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Advance the high-water mark. Committed atomically with the
    /// batch's block inserts, so the mark never runs ahead of the rows.
    pub async fn update_last_block(
        &self,
        tx: &mut PgTx<'_>,
        chain_id: i64,
        last_block_number: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE evm_network
            SET last_discovered_block_number = $1, discovered_at = NOW()
            WHERE chain_id = $2
        "#,
        )
        .bind(last_block_number)
        .bind(chain_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Insert discovered blocks, ignoring duplicates.
    pub async fn insert_blocks(
        &self,
        tx: &mut PgTx<'_>,
        blocks: &[(i64, i64, String)],
    ) -> Result<(), sqlx::Error> {
        for (chain_id, block_number, block_hash) in blocks {
            sqlx::query(
                r#"
                INSERT INTO evm_block (evm_network_chain_id, block_number, block_hash)
                VALUES ($1, $2, $3)
                ON CONFLICT (evm_network_chain_id, block_number) DO NOTHING
            "#,
            )
            .bind(chain_id)
            .bind(block_number)
            .bind(block_hash)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}
