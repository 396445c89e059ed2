//! Repository for the date and token reconciliation scanners, plus the
//! agent-facing read of confirmed eligibility contracts.

use sqlx::postgres::PgPool;

use super::PgTx;
use crate::models::{ClaimBound, ClaimCheckRow, CodeCheckRow, EligibleContract, TokenCheckRow};

#[derive(Clone)]
pub struct AirdropRepository {
    pool: PgPool,
}

impl AirdropRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Deactivate every contract whose claim window has closed. One
    /// statement, no provider calls involved.
    pub async fn deactivate_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE evm_airdrop_eligibility_contract
            SET active_status = 0
            WHERE active_status = 1
              AND claim_end_timestamp IS NOT NULL
              AND claim_end_timestamp <= NOW()
        "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Active contracts with no known claim end, candidates for the
    /// destroyed-code check.
    pub async fn contracts_for_code_check(
        &self,
        tx: &mut PgTx<'_>,
        batch_size: i64,
    ) -> Result<Vec<CodeCheckRow>, sqlx::Error> {
        sqlx::query_as::<_, CodeCheckRow>(
            r#"
            SELECT id, evm_network_chain_id, contract_address
            FROM evm_airdrop_eligibility_contract
            WHERE active_status = 1
              AND claim_end_timestamp IS NULL
            ORDER BY id
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        "#,
        )
        .bind(batch_size)
        .fetch_all(&mut **tx)
        .await
    }

    /// Active contracts whose claim-window getter has not been resolved
    /// into a timestamp yet.
    pub async fn contracts_for_claim_check(
        &self,
        tx: &mut PgTx<'_>,
        bound: ClaimBound,
        batch_size: i64,
    ) -> Result<Vec<ClaimCheckRow>, sqlx::Error> {
        let sql = match bound {
            ClaimBound::Start => {
                r#"
                SELECT id, evm_network_chain_id, contract_address,
                       claim_start_getter_abi AS getter_abi
                FROM evm_airdrop_eligibility_contract
                WHERE active_status = 1
                  AND claim_start_timestamp IS NULL
                  AND claim_start_getter_abi IS NOT NULL
                ORDER BY id
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            "#
            }
            ClaimBound::End => {
                r#"
                SELECT id, evm_network_chain_id, contract_address,
                       claim_end_getter_abi AS getter_abi
                FROM evm_airdrop_eligibility_contract
                WHERE active_status = 1
                  AND claim_end_timestamp IS NULL
                  AND claim_end_getter_abi IS NOT NULL
                ORDER BY id
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            "#
            }
        };
        sqlx::query_as::<_, ClaimCheckRow>(sql)
            .bind(batch_size)
            .fetch_all(&mut **tx)
            .await
    }

    pub async fn deactivate_batch(
        &self,
        tx: &mut PgTx<'_>,
        contract_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        if contract_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "UPDATE evm_airdrop_eligibility_contract SET active_status = 0 WHERE id = ANY($1)",
        )
        .bind(contract_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Record a resolved claim-start timestamp.
    pub async fn set_claim_start(
        &self,
        tx: &mut PgTx<'_>,
        contract_id: i64,
        timestamp: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE evm_airdrop_eligibility_contract
            SET claim_start_timestamp = to_timestamp($1)
            WHERE id = $2
        "#,
        )
        .bind(timestamp)
        .bind(contract_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Record a resolved claim-end timestamp together with the activity
    /// recomputed from it (an already-closed window deactivates).
    pub async fn set_claim_end(
        &self,
        tx: &mut PgTx<'_>,
        contract_id: i64,
        timestamp: i64,
        active_status: i16,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE evm_airdrop_eligibility_contract
            SET claim_end_timestamp = to_timestamp($1), active_status = $2
            WHERE id = $3
        "#,
        )
        .bind(timestamp)
        .bind(active_status)
        .bind(contract_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Null out a getter ABI that keeps producing garbage so the row is
    /// not selected again.
    pub async fn clear_claim_abi(
        &self,
        tx: &mut PgTx<'_>,
        bound: ClaimBound,
        contract_id: i64,
    ) -> Result<(), sqlx::Error> {
        let sql = match bound {
            ClaimBound::Start => {
                "UPDATE evm_airdrop_eligibility_contract \
                 SET claim_start_getter_abi = NULL WHERE id = $1"
            }
            ClaimBound::End => {
                "UPDATE evm_airdrop_eligibility_contract \
                 SET claim_end_getter_abi = NULL WHERE id = $1"
            }
        };
        sqlx::query(sql).bind(contract_id).execute(&mut **tx).await?;
        Ok(())
    }

    /// Active contracts whose airdropped token has not been audited.
    pub async fn tokens_for_analysis(
        &self,
        tx: &mut PgTx<'_>,
        batch_size: i64,
    ) -> Result<Vec<TokenCheckRow>, sqlx::Error> {
        sqlx::query_as::<_, TokenCheckRow>(
            r#"
            SELECT id, evm_network_chain_id, token_address, token_security_report
            FROM evm_airdrop_eligibility_contract
            WHERE active_status = 1
              AND token_analysis_status = 0
              AND token_address IS NOT NULL
            ORDER BY id
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        "#,
        )
        .bind(batch_size)
        .fetch_all(&mut **tx)
        .await
    }

    /// Persist a token audit verdict. Statuses 1-3 (compile failure,
    /// unsafe, suspicious) also deactivate the contract.
    pub async fn set_token_analysis(
        &self,
        tx: &mut PgTx<'_>,
        contract_id: i64,
        security_status: i16,
        token_security_report: &str,
    ) -> Result<(), sqlx::Error> {
        let active_status: i16 = if (1..=3).contains(&security_status) { 0 } else { 1 };
        sqlx::query(
            r#"
            UPDATE evm_airdrop_eligibility_contract
            SET token_analysis_status = $1,
                token_security_report = $2,
                active_status = $3
            WHERE id = $4
        "#,
        )
        .bind(security_status)
        .bind(token_security_report)
        .bind(active_status)
        .bind(contract_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// The agent-facing projection: active contracts whose token audit
    /// did not flag them (statuses 1-3 are excluded, 0/4/5 pass).
    pub async fn eligible_contracts(&self) -> Result<Vec<EligibleContract>, sqlx::Error> {
        sqlx::query_as::<_, EligibleContract>(
            r#"
            SELECT evm_network_chain_id AS chain_id, contract_address, contract_name,
                   eligibility_function_abi, claim_start_timestamp, claim_end_timestamp,
                   token_address, token_ticker, token_decimals, token_analysis_status
            FROM evm_airdrop_eligibility_contract
            WHERE active_status = 1
              AND token_analysis_status NOT IN (1, 2, 3)
        "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
