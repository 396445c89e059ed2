//! Claimdex core
//!
//! Domain vocabulary shared by every stage of the airdrop discovery
//! pipeline: row status codes, ABI helpers (selectors, call data,
//! return-value decoding) and the normalized candidate record produced
//! by the LLM contract analysis.

pub mod abi;
pub mod candidate;
pub mod status;

pub use candidate::{AirdropCandidate, ClaimField};
