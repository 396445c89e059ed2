//! Claimdex storage
//!
//! PostgreSQL layer for the airdrop pipeline: connection pool, schema
//! bootstrap, row models and one repository per scanner. Every
//! `processing_status` transition in the system goes through a
//! repository method here; scanners never issue raw SQL.

pub mod db;
pub mod models;
pub mod repositories;

pub use db::Storage;
pub use models::*;
pub use repositories::{
    AirdropRepository, BlockRepository, NetworkRepository, SourceRepository,
    TransactionRepository,
};
