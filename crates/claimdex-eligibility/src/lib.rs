//! Claimdex eligibility
//!
//! The read side of the pipeline: given a wallet address, call the
//! eligibility function of every confirmed, active airdrop contract
//! and report nonzero claimable amounts with their claim window and a
//! token-security annotation. Consumers load the contract set via
//! [`claimdex_storage::AirdropRepository::eligible_contracts`].

mod checker;

pub use checker::{EligibilityChecker, EligibilityHit, WalletReport};
