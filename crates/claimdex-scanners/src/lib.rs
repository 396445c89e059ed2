//! Claimdex scanners
//!
//! Six cooperating, independently paced scanners share one PostgreSQL
//! database as both queue and store:
//!
//! ```text
//! evm_network -> [NetworkScanner] -> evm_block
//!                                        |
//!                              [BlockScanner] -> evm_block_create_contract_transaction
//!                                                    |
//!                                     [TransactionScanner] -> evm_contract (+ source)
//!                                                                  |
//!                                                  [SourceScanner] -> evm_airdrop_eligibility_contract
//!                                                                          ^         ^
//!                                                  [DateScanner] ----------+         |
//!                                                  [TokenScanner] -------------------+
//! ```
//!
//! Each scanner leases a bounded batch with row-level locking, fans out
//! rate-limited provider calls, and advances per-row state machines
//! atomically.

pub mod block;
pub mod config;
pub mod date;
pub mod error;
pub mod network;
pub mod runner;
pub mod services;
pub mod source;
pub mod token;
pub mod transaction;

pub use block::BlockScanner;
pub use config::Config;
pub use date::DateScanner;
pub use error::{Result, ScanError};
pub use network::NetworkScanner;
pub use runner::run_scanner_loop;
pub use services::ServiceRegistry;
pub use source::SourceScanner;
pub use token::TokenScanner;
pub use transaction::TransactionScanner;
