//! Repository for the transaction scanner.

use sqlx::postgres::PgPool;
use sqlx::Row;

use super::PgTx;
use crate::models::PendingCreationTx;

#[derive(Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn lease_pending(
        &self,
        tx: &mut PgTx<'_>,
        batch_size: i64,
    ) -> Result<Vec<PendingCreationTx>, sqlx::Error> {
        sqlx::query_as::<_, PendingCreationTx>(
            r#"
            SELECT id, evm_network_chain_id, transaction_hash
            FROM evm_block_create_contract_transaction
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
        tx_ids: &[i64],
        status: i16,
    ) -> Result<(), sqlx::Error> {
        if tx_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "UPDATE evm_block_create_contract_transaction \
             SET processing_status = $1 WHERE id = ANY($2)",
        )
        .bind(status)
        .bind(tx_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Record a verified contract: the contract row, its source row and
    /// the terminal transaction status, all in the caller's transaction.
    #[allow(clippy::too_many_arguments)]
    pub async fn save_contract_and_source(
        &self,
        tx: &mut PgTx<'_>,
        tx_id: i64,
        chain_id: i64,
        contract_address: &str,
        contract_name: Option<&str>,
        source_code: &str,
        abi: &str,
    ) -> Result<(), sqlx::Error> {
        let row = sqlx::query(
            r#"
            INSERT INTO evm_contract
                (evm_block_create_contract_transaction_id, evm_network_chain_id,
                 contract_address, source_code_verified_status, processing_status)
            VALUES ($1, $2, $3, 1, 2)
            RETURNING id
        "#,
        )
        .bind(tx_id)
        .bind(chain_id)
        .bind(contract_address)
        .fetch_one(&mut **tx)
        .await?;
        let contract_id: i64 = row.get("id");

        sqlx::query(
            r#"
            INSERT INTO evm_contract_source
                (evm_contract_id, evm_network_chain_id, contract_address,
                 contract_name, source_code, abi)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#,
        )
        .bind(contract_id)
        .bind(chain_id)
        .bind(contract_address)
        .bind(contract_name)
        .bind(source_code)
        .bind(abi)
        .execute(&mut **tx)
        .await?;

        self.complete_tx(tx, tx_id).await
    }

    /// Record an unverified contract (no source row) and complete the
    /// transaction.
    pub async fn save_unverified_contract(
        &self,
        tx: &mut PgTx<'_>,
        tx_id: i64,
        chain_id: i64,
        contract_address: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO evm_contract
                (evm_block_create_contract_transaction_id, evm_network_chain_id,
                 contract_address, source_code_verified_status, processing_status)
            VALUES ($1, $2, $3, 0, 2)
        "#,
        )
        .bind(tx_id)
        .bind(chain_id)
        .bind(contract_address)
        .execute(&mut **tx)
        .await?;

        self.complete_tx(tx, tx_id).await
    }

    async fn complete_tx(&self, tx: &mut PgTx<'_>, tx_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE evm_block_create_contract_transaction
            SET processing_status = 2, discovered_at = NOW()
            WHERE id = $1
        "#,
        )
        .bind(tx_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
