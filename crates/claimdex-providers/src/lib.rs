//! Claimdex providers
//!
//! All chain access goes through HTTP providers: an Etherscan-v2
//! compatible query surface for chain reads, a Moralis-compatible
//! endpoint for token metadata, and an OpenAI-compatible chat endpoint
//! for the LLM analysis. Each client owns a rate gate that serializes
//! its requests and enforces a minimum inter-request delay.

pub mod client;
pub mod etherscan;
pub mod llm;
pub mod moralis;
pub mod rate_gate;

pub use client::{BlockchainClient, ContractSource, ProviderError, TokenMetadata};
pub use etherscan::EtherscanClient;
pub use llm::LlmClient;
pub use moralis::MoralisClient;
pub use rate_gate::RateGate;
