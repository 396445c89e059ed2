//! Claimdex analysis
//!
//! The classification stages the source scanner runs over a verified
//! contract: the cheap ABI keyword filter, the static-analyzer
//! subprocess, and the LLM semantic analysis. Also home to the
//! canonical source-bundle handling the transaction scanner relies on.

pub mod abi_filter;
pub mod error;
pub mod llm_analyzer;
pub mod source_bundle;
pub mod static_analysis;

pub use abi_filter::AbiKeywordFilter;
pub use error::AnalysisError;
pub use llm_analyzer::LlmAnalyzer;
pub use source_bundle::{canonicalize_source, flatten_source};
pub use static_analysis::StaticAnalyzer;
