//! The blockchain-client capability.
//!
//! A single trait covers every external read the pipeline performs.
//! Concrete providers implement the subset they support and answer the
//! rest with [`ProviderError::Unsupported`], so a scanner wired to the
//! wrong client fails loudly instead of silently returning nothing.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider API error: {0}")]
    Api(String),

    #[error("malformed provider payload: {0}")]
    Payload(String),

    #[error("operation not supported by this provider: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Verified source code and ABI as returned by the source provider.
#[derive(Debug, Clone)]
pub struct ContractSource {
    pub source_code: String,
    pub abi: String,
    pub contract_name: Option<String>,
}

/// Token metadata as returned by the metadata provider.
#[derive(Debug, Clone)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: i32,
    pub possible_spam: bool,
    pub verified_contract: bool,
    pub security_score: Option<f64>,
}

/// Read-only chain access used by every scanner.
#[async_trait]
pub trait BlockchainClient: Send + Sync {
    /// Head block number of the chain.
    async fn latest_block_number(&self, chain_id: i64) -> Result<u64>;

    /// Full block (with its `transactions` array) or `None` when the
    /// provider does not know the block.
    async fn block_by_number(&self, chain_id: i64, block_number: u64) -> Result<Option<Value>>;

    /// Transaction receipt (carrying `contractAddress` for creations).
    async fn transaction_receipt(&self, chain_id: i64, tx_hash: &str) -> Result<Option<Value>>;

    /// Verified source for an address, `None` when nothing is on file.
    async fn contract_source(&self, chain_id: i64, address: &str)
        -> Result<Option<ContractSource>>;

    /// Read-only contract call. Providers map their own call failures
    /// to `Ok(None)` so a single bad contract cannot poison a batch.
    async fn eth_call(&self, chain_id: i64, to: &str, data: &str) -> Result<Option<String>>;

    /// Bytecode at an address; `"0x"` means none.
    async fn eth_get_code(&self, chain_id: i64, address: &str) -> Result<Option<String>>;

    /// ERC-20 metadata extension.
    async fn token_metadata(&self, chain_id: i64, address: &str)
        -> Result<Option<TokenMetadata>>;
}
