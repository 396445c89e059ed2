//! Pool construction and schema bootstrap.

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// Shared PostgreSQL storage handle.
#[derive(Clone)]
pub struct Storage {
    pool: PgPool,
}

impl Storage {
    /// Connect to PostgreSQL. The pool is deliberately small: scanners
    /// serialize their database work per batch, so a handful of
    /// connections covers all six loops.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create the pipeline tables and indexes if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS evm_network (
                chain_id BIGINT PRIMARY KEY,
                network_name VARCHAR(64),
                active_status SMALLINT NOT NULL DEFAULT 1,
                processing_status SMALLINT NOT NULL DEFAULT 0,
                last_discovered_block_number BIGINT,
                finality_depth BIGINT NOT NULL DEFAULT 10,
                discovered_at TIMESTAMPTZ
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS evm_block (
                id BIGSERIAL PRIMARY KEY,
                evm_network_chain_id BIGINT NOT NULL,
                block_number BIGINT NOT NULL,
                block_hash VARCHAR(66) NOT NULL,
                processing_status SMALLINT NOT NULL DEFAULT 0,
                discovered_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (evm_network_chain_id, block_number)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS evm_block_create_contract_transaction (
                id BIGSERIAL PRIMARY KEY,
                evm_block_id BIGINT NOT NULL,
                evm_network_chain_id BIGINT NOT NULL,
                transaction_hash VARCHAR(66) NOT NULL,
                processing_status SMALLINT NOT NULL DEFAULT 0,
                discovered_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (evm_network_chain_id, transaction_hash)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS evm_contract (
                id BIGSERIAL PRIMARY KEY,
                evm_block_create_contract_transaction_id BIGINT NOT NULL,
                evm_network_chain_id BIGINT NOT NULL,
                contract_address VARCHAR(42) NOT NULL,
                source_code_verified_status SMALLINT NOT NULL DEFAULT 0,
                processing_status SMALLINT NOT NULL DEFAULT 0,
                discovered_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (evm_network_chain_id, contract_address)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS evm_contract_source (
                id BIGSERIAL PRIMARY KEY,
                evm_contract_id BIGINT NOT NULL,
                evm_network_chain_id BIGINT NOT NULL,
                contract_address VARCHAR(42) NOT NULL,
                contract_name VARCHAR(255),
                source_code TEXT NOT NULL,
                abi TEXT NOT NULL,
                processing_status SMALLINT NOT NULL DEFAULT 0,
                security_analysis_status SMALLINT NOT NULL DEFAULT 0,
                security_analysis_report TEXT
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS evm_airdrop_eligibility_contract (
                id BIGSERIAL PRIMARY KEY,
                evm_contract_source_id BIGINT NOT NULL,
                evm_network_chain_id BIGINT NOT NULL,
                contract_address VARCHAR(42) NOT NULL,
                contract_name VARCHAR(255),
                eligibility_function_abi TEXT NOT NULL,
                get_token_function_abi TEXT,
                claim_start_getter_abi TEXT,
                claim_end_getter_abi TEXT,
                claim_start_timestamp TIMESTAMPTZ,
                claim_end_timestamp TIMESTAMPTZ,
                token_address VARCHAR(42),
                token_ticker VARCHAR(32),
                token_decimals INT,
                token_analysis_status SMALLINT NOT NULL DEFAULT 0,
                token_security_report TEXT,
                active_status SMALLINT NOT NULL DEFAULT 1
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_block_pending \
             ON evm_block (processing_status)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_create_tx_pending \
             ON evm_block_create_contract_transaction (processing_status)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_source_pending \
             ON evm_contract_source (processing_status, security_analysis_status)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_airdrop_active \
             ON evm_airdrop_eligibility_contract (active_status)",
        )
        .execute(&self.pool)
        .await?;

        info!("database schema is in place");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
