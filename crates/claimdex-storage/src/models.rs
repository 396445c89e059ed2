//! Row models for the pipeline tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A network eligible for block discovery.
#[derive(Debug, Clone, FromRow)]
pub struct Network {
    pub chain_id: i64,
    pub last_discovered_block_number: Option<i64>,
    pub finality_depth: i64,
}

/// A block leased for contract-creation extraction.
#[derive(Debug, Clone, FromRow)]
pub struct PendingBlock {
    pub id: i64,
    pub evm_network_chain_id: i64,
    pub block_number: i64,
}

/// A contract-creation transaction leased for source fetching.
#[derive(Debug, Clone, FromRow)]
pub struct PendingCreationTx {
    pub id: i64,
    pub evm_network_chain_id: i64,
    pub transaction_hash: String,
}

/// A verified source leased for airdrop classification.
#[derive(Debug, Clone, FromRow)]
pub struct PendingSource {
    pub id: i64,
    pub evm_network_chain_id: i64,
    pub contract_address: String,
    pub contract_name: Option<String>,
    pub source_code: String,
    pub abi: String,
}

/// An eligibility contract selected for the destroyed-code check.
#[derive(Debug, Clone, FromRow)]
pub struct CodeCheckRow {
    pub id: i64,
    pub evm_network_chain_id: i64,
    pub contract_address: String,
}

/// An eligibility contract with a claim-window getter still to resolve.
/// The getter column (`claim_start_getter_abi` or `claim_end_getter_abi`)
/// is aliased to `getter_abi` by the selecting query.
#[derive(Debug, Clone, FromRow)]
pub struct ClaimCheckRow {
    pub id: i64,
    pub evm_network_chain_id: i64,
    pub contract_address: String,
    pub getter_abi: String,
}

/// An eligibility contract whose token source has not been audited yet.
#[derive(Debug, Clone, FromRow)]
pub struct TokenCheckRow {
    pub id: i64,
    pub evm_network_chain_id: i64,
    pub token_address: String,
    pub token_security_report: Option<String>,
}

/// Which claim-window boundary a reconciliation pass is resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimBound {
    Start,
    End,
}

/// A fully assembled eligibility row ready for insertion.
///
/// Timestamps are unix seconds; the repository converts them to
/// `TIMESTAMPTZ` on write.
#[derive(Debug, Clone)]
pub struct NewAirdropContract {
    pub evm_contract_source_id: i64,
    pub evm_network_chain_id: i64,
    pub contract_address: String,
    pub contract_name: Option<String>,
    pub eligibility_function_abi: String,
    pub get_token_function_abi: Option<String>,
    pub claim_start_getter_abi: Option<String>,
    pub claim_end_getter_abi: Option<String>,
    pub claim_start_timestamp: Option<i64>,
    pub claim_end_timestamp: Option<i64>,
    pub token_address: Option<String>,
    pub token_ticker: Option<String>,
    pub token_decimals: Option<i32>,
    pub token_analysis_status: i16,
    pub token_security_report: String,
    pub active_status: i16,
}

/// The agent-facing projection of an eligibility contract.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EligibleContract {
    pub chain_id: i64,
    pub contract_address: String,
    pub contract_name: Option<String>,
    pub eligibility_function_abi: String,
    pub claim_start_timestamp: Option<DateTime<Utc>>,
    pub claim_end_timestamp: Option<DateTime<Utc>>,
    pub token_address: Option<String>,
    pub token_ticker: Option<String>,
    pub token_decimals: Option<i32>,
    pub token_analysis_status: i16,
}
