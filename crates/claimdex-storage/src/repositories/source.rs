//! Repository for the source scanner.

use sqlx::postgres::PgPool;
use tracing::error;

use super::PgTx;
use crate::models::{NewAirdropContract, PendingSource};

#[derive(Clone)]
pub struct SourceRepository {
    pool: PgPool,
}

impl SourceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Lease verified sources that have not been analyzed yet.
    pub async fn lease_pending(
        &self,
        tx: &mut PgTx<'_>,
        batch_size: i64,
    ) -> Result<Vec<PendingSource>, sqlx::Error> {
        sqlx::query_as::<_, PendingSource>(
            r#"
            SELECT id, evm_network_chain_id, contract_address,
                   contract_name, source_code, abi
            FROM evm_contract_source
            WHERE processing_status = 0 AND security_analysis_status = 0
            ORDER BY id
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        "#,
        )
        .bind(batch_size)
        .fetch_all(&mut **tx)
        .await
    }

    pub async fn set_processing_status(
        &self,
        tx: &mut PgTx<'_>,
        source_ids: &[i64],
        status: i16,
    ) -> Result<(), sqlx::Error> {
        if source_ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE evm_contract_source SET processing_status = $1 WHERE id = ANY($2)")
            .bind(status)
            .bind(source_ids)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Persist the static-analysis classification and report. A report
    /// that is not valid JSON is dropped rather than stored; the
    /// classification itself is always written.
    pub async fn save_security_report(
        &self,
        tx: &mut PgTx<'_>,
        source_id: i64,
        security_status: i16,
        report_json: &str,
    ) -> Result<(), sqlx::Error> {
        if serde_json::from_str::<serde_json::Value>(report_json).is_err() {
            error!(
                "invalid JSON in analyzer report for source_id={}, storing status only",
                source_id
            );
            sqlx::query(
                "UPDATE evm_contract_source SET security_analysis_status = $1 WHERE id = $2",
            )
            .bind(security_status)
            .bind(source_id)
            .execute(&mut **tx)
            .await?;
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE evm_contract_source
            SET security_analysis_status = $1, security_analysis_report = $2
            WHERE id = $3
        "#,
        )
        .bind(security_status)
        .bind(report_json)
        .bind(source_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Insert the confirmed eligibility contract and mark its source as
    /// done, atomically within the caller's transaction.
    pub async fn save_airdrop_contract(
        &self,
        tx: &mut PgTx<'_>,
        row: &NewAirdropContract,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO evm_airdrop_eligibility_contract
                (evm_network_chain_id, evm_contract_source_id, contract_address,
                 contract_name, eligibility_function_abi, get_token_function_abi,
                 claim_start_getter_abi, claim_end_getter_abi,
                 claim_start_timestamp, claim_end_timestamp,
                 token_address, token_ticker, token_decimals,
                 token_analysis_status, token_security_report, active_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                    to_timestamp($9), to_timestamp($10),
                    $11, $12, $13, $14, $15, $16)
        "#,
        )
        .bind(row.evm_network_chain_id)
        .bind(row.evm_contract_source_id)
        .bind(&row.contract_address)
        .bind(&row.contract_name)
        .bind(&row.eligibility_function_abi)
        .bind(&row.get_token_function_abi)
        .bind(&row.claim_start_getter_abi)
        .bind(&row.claim_end_getter_abi)
        .bind(row.claim_start_timestamp)
        .bind(row.claim_end_timestamp)
        .bind(&row.token_address)
        .bind(&row.token_ticker)
        .bind(row.token_decimals)
        .bind(row.token_analysis_status)
        .bind(&row.token_security_report)
        .bind(row.active_status)
        .execute(&mut **tx)
        .await?;

        sqlx::query("UPDATE evm_contract_source SET processing_status = 2 WHERE id = $1")
            .bind(row.evm_contract_source_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
