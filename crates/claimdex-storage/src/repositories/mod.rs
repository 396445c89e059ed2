//! One repository per scanner.
//!
//! Repositories encapsulate every SQL statement in the system. Methods
//! that must be atomic with the caller's other writes take a
//! `&mut Transaction`; methods that are a complete unit of work on
//! their own take the pool.

mod airdrop;
mod block;
mod network;
mod source;
mod transaction;

pub use airdrop::AirdropRepository;
pub use block::BlockRepository;
pub use network::NetworkRepository;
pub use source::SourceRepository;
pub use transaction::TransactionRepository;

/// Alias for the transaction type every repository method leases work in.
pub type PgTx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;
