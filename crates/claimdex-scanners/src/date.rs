//! Date scanner: claim-window reconciliation.
//!
//! Four sequential steps per run: expire closed windows, deactivate
//! destroyed contracts, resolve missing claim-end timestamps, resolve
//! missing claim-start timestamps.
//!
//! Unlike the ingest scanners, this one never holds a database
//! transaction across a provider call: work is picked in a short
//! transaction, the connection is released for the fan-out, and results
//! are written back in a fresh short commit transaction. Providers can
//! stall for seconds and an idle-in-transaction timeout would otherwise
//! drop the connection mid-batch.

use std::sync::Arc;

use chrono::Utc;
use claimdex_core::abi::{decode_timestamp, function_selector, is_code_empty};
use claimdex_providers::BlockchainClient;
use claimdex_storage::{AirdropRepository, ClaimBound, ClaimCheckRow};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::Result;

pub struct DateScanner {
    repository: AirdropRepository,
    client: Arc<dyn BlockchainClient>,
    batch_size: i64,
}

impl DateScanner {
    pub fn new(
        repository: AirdropRepository,
        client: Arc<dyn BlockchainClient>,
        batch_size: i64,
    ) -> Self {
        Self {
            repository,
            client,
            batch_size,
        }
    }

    /// Steps are independent: a failure in one is logged and the next
    /// still runs.
    pub async fn run(&self) -> Result<()> {
        match self.repository.deactivate_expired().await {
            Ok(count) if count > 0 => info!("deactivated {} expired airdrop contracts", count),
            Ok(_) => {}
            Err(e) => error!("failed to deactivate expired contracts: {}", e),
        }

        if let Err(e) = self.deactivate_destroyed().await {
            error!("destroyed-contract check failed: {}", e);
        }
        if let Err(e) = self.check_claim_bound(ClaimBound::End).await {
            error!("claim-end check failed: {}", e);
        }
        if let Err(e) = self.check_claim_bound(ClaimBound::Start).await {
            error!("claim-start check failed: {}", e);
        }

        Ok(())
    }

    /// Step 2: `eth_getCode` over active contracts with no known claim
    /// end; provably empty code deactivates. A provider error leaves
    /// the row unchanged for the next cycle.
    async fn deactivate_destroyed(&self) -> Result<()> {
        debug!("running destroyed-contract check");

        let mut pick = self.repository.pool().begin().await?;
        let contracts = self
            .repository
            .contracts_for_code_check(&mut pick, self.batch_size)
            .await?;
        pick.commit().await?;

        if contracts.is_empty() {
            debug!("no contracts for the code check");
            return Ok(());
        }
        info!("checking bytecode for {} contracts", contracts.len());

        let results = join_all(contracts.iter().map(|c| {
            self.client
                .eth_get_code(c.evm_network_chain_id, &c.contract_address)
        }))
        .await;

        let mut dead = Vec::new();
        for (contract, result) in contracts.iter().zip(results) {
            match result {
                Err(e) => {
                    error!("eth_getCode failed for id={}: {}", contract.id, e);
                    continue;
                }
                Ok(code) => {
                    if is_code_empty(code.as_deref()) {
                        info!(
                            "contract id={} is destroyed ({:?}), deactivating",
                            contract.id, code
                        );
                        dead.push(contract.id);
                    }
                }
            }
        }

        if dead.is_empty() {
            return Ok(());
        }
        info!("deactivating {} destroyed contracts", dead.len());
        let mut commit = self.repository.pool().begin().await?;
        self.repository.deactivate_batch(&mut commit, &dead).await?;
        commit.commit().await?;
        Ok(())
    }

    /// Steps 3 and 4: derive the getter selector, call the contract,
    /// decode the timestamp. Getters that cannot produce a usable
    /// timestamp are nulled out so the row stops being reselected.
    async fn check_claim_bound(&self, bound: ClaimBound) -> Result<()> {
        debug!("running claim check for {:?}", bound);

        let mut pick = self.repository.pool().begin().await?;
        let contracts = self
            .repository
            .contracts_for_claim_check(&mut pick, bound, self.batch_size)
            .await?;

        // Rows whose stored ABI cannot even yield a selector are
        // invalidated inside the pick transaction.
        let mut calls: Vec<(ClaimCheckRow, String)> = Vec::new();
        for contract in contracts {
            let selector = serde_json::from_str::<Value>(&contract.getter_abi)
                .ok()
                .as_ref()
                .and_then(function_selector);
            match selector {
                Some(selector) => calls.push((contract, selector)),
                None => {
                    self.repository
                        .clear_claim_abi(&mut pick, bound, contract.id)
                        .await?;
                }
            }
        }
        pick.commit().await?;

        if calls.is_empty() {
            debug!("no contracts for the {:?} claim check", bound);
            return Ok(());
        }
        info!("checking {:?} claim bound for {} contracts", bound, calls.len());

        let results = join_all(calls.iter().map(|(contract, selector)| {
            self.client
                .eth_call(contract.evm_network_chain_id, &contract.contract_address, selector)
        }))
        .await;

        let now = Utc::now().timestamp();
        let mut commit = self.repository.pool().begin().await?;
        for ((contract, _), result) in calls.iter().zip(results) {
            let call_result = match result {
                Err(e) => {
                    error!("eth_call failed for id={}: {}", contract.id, e);
                    continue;
                }
                Ok(r) => r,
            };

            match call_result.as_deref().and_then(decode_timestamp) {
                None | Some(0) => {
                    warn!(
                        "unusable {:?} timestamp for id={} (result: {:?}), invalidating ABI",
                        bound, contract.id, call_result
                    );
                    self.repository
                        .clear_claim_abi(&mut commit, bound, contract.id)
                        .await?;
                }
                Some(timestamp) => match bound {
                    ClaimBound::Start => {
                        info!("found claim start {} for id={}", timestamp, contract.id);
                        self.repository
                            .set_claim_start(&mut commit, contract.id, timestamp)
                            .await?;
                    }
                    ClaimBound::End => {
                        let active: i16 = if timestamp <= now {
                            info!(
                                "contract id={} is now inactive (claim end {} <= now {})",
                                contract.id, timestamp, now
                            );
                            0
                        } else {
                            1
                        };
                        info!("found claim end {} for id={}", timestamp, contract.id);
                        self.repository
                            .set_claim_end(&mut commit, contract.id, timestamp, active)
                            .await?;
                    }
                },
            }
        }
        commit.commit().await?;
        Ok(())
    }
}
