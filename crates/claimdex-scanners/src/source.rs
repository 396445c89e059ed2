//! Source scanner: the airdrop classification pipeline.
//!
//! Six stages per verified source, all inside one batch transaction:
//! ABI keyword filter, static analysis, LLM semantic analysis, token
//! address resolution, token metadata, and the final insert into
//! `evm_airdrop_eligibility_contract`. Rejection at any stage marks
//! the source done with no downstream artifact.

use std::sync::Arc;

use chrono::Utc;
use claimdex_analysis::{AbiKeywordFilter, LlmAnalyzer, StaticAnalyzer};
use claimdex_core::status::{active, processing, security, token};
use claimdex_core::AirdropCandidate;
use claimdex_providers::{BlockchainClient, TokenMetadata};
use claimdex_storage::{NewAirdropContract, PendingSource, SourceRepository};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::Result;

pub struct SourceScanner {
    repository: SourceRepository,
    abi_filter: Arc<AbiKeywordFilter>,
    static_analyzer: Arc<StaticAnalyzer>,
    llm_analyzer: Arc<LlmAnalyzer>,
    call_client: Arc<dyn BlockchainClient>,
    metadata_client: Arc<dyn BlockchainClient>,
    batch_size: i64,
}

impl SourceScanner {
    pub fn new(
        repository: SourceRepository,
        abi_filter: Arc<AbiKeywordFilter>,
        static_analyzer: Arc<StaticAnalyzer>,
        llm_analyzer: Arc<LlmAnalyzer>,
        call_client: Arc<dyn BlockchainClient>,
        metadata_client: Arc<dyn BlockchainClient>,
        batch_size: i64,
    ) -> Self {
        Self {
            repository,
            abi_filter,
            static_analyzer,
            llm_analyzer,
            call_client,
            metadata_client,
            batch_size,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let mut tx = self.repository.pool().begin().await?;

        let sources = self.repository.lease_pending(&mut tx, self.batch_size).await?;
        if sources.is_empty() {
            info!("no new contract sources found for analysis");
            tx.commit().await?;
            return Ok(());
        }
        info!("processing {} contract sources", sources.len());

        let ids: Vec<i64> = sources.iter().map(|s| s.id).collect();
        self.repository
            .set_processing_status(&mut tx, &ids, processing::IN_PROGRESS)
            .await?;

        for source in &sources {
            self.process_source(&mut tx, source).await?;
        }

        tx.commit().await?;
        info!("successfully processed batch of {} sources", sources.len());
        Ok(())
    }

    async fn process_source(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        source: &PendingSource,
    ) -> Result<()> {
        let source_id = source.id;
        let chain_id = source.evm_network_chain_id;
        debug!("analyzing source_id={} ({})", source_id, source.contract_address);

        // Stage 1: keyword filter.
        if !self.abi_filter.matches(&source.abi) {
            info!("source_id={}: filtered out by ABI whitelist", source_id);
            self.repository
                .set_processing_status(tx, &[source_id], processing::DONE)
                .await?;
            return Ok(());
        }

        // Stage 2: static analysis.
        let report = self.static_analyzer.analyze(&source.source_code).await;
        let (security_status, report_str) = self.static_analyzer.classify(&report);
        self.repository
            .save_security_report(tx, source_id, security_status, &report_str)
            .await?;
        if !matches!(security_status, security::LOW_RISK | security::CLEAN) {
            info!(
                "source_id={}: skipping LLM analysis, static analysis status {}",
                source_id, security_status
            );
            self.repository
                .set_processing_status(tx, &[source_id], processing::DONE)
                .await?;
            return Ok(());
        }

        // Stage 3: LLM semantic analysis.
        debug!("source_id={}: passed static analysis, running LLM", source_id);
        let candidate = self
            .llm_analyzer
            .analyze(&source.source_code, &source.abi)
            .await?;
        let mut candidate = match candidate {
            Some(c) => c,
            None => {
                info!("source_id={}: LLM says this is not an airdrop contract", source_id);
                self.repository
                    .set_processing_status(tx, &[source_id], processing::DONE)
                    .await?;
                return Ok(());
            }
        };

        // Stage 4: resolve the token address on-chain when the LLM
        // only found a getter.
        if candidate.token_address.is_none() {
            if let Some(getter) = candidate.get_token_function_abi.clone() {
                self.resolve_token_address(chain_id, source, &getter, &mut candidate)
                    .await?;
            }
        }

        // Stage 5: token metadata.
        let metadata = match &candidate.token_address {
            Some(token_address) => {
                debug!("source_id={}: fetching metadata for {}", source_id, token_address);
                self.metadata_client
                    .token_metadata(chain_id, token_address)
                    .await?
            }
            None => {
                warn!("source_id={}: no token address, skipping metadata fetch", source_id);
                None
            }
        };

        // Stage 6: persist.
        info!("source_id={}: found an airdrop contract, saving", source_id);
        let row = build_airdrop_row(source, &candidate, metadata.as_ref(), Utc::now().timestamp());
        self.repository.save_airdrop_contract(tx, &row).await?;
        Ok(())
    }

    async fn resolve_token_address(
        &self,
        chain_id: i64,
        source: &PendingSource,
        getter: &Value,
        candidate: &mut AirdropCandidate,
    ) -> Result<()> {
        debug!("source_id={}: resolving token address via eth_call", source.id);
        let selector = match claimdex_core::abi::function_selector(getter) {
            Some(s) => s,
            None => {
                warn!(
                    "source_id={}: could not derive a selector from {}",
                    source.id, getter
                );
                return Ok(());
            }
        };

        let result = self
            .call_client
            .eth_call(chain_id, &source.contract_address, &selector)
            .await?;
        match result.as_deref().and_then(claimdex_core::abi::decode_address) {
            Some(address) => {
                info!("source_id={}: token address resolved to {}", source.id, address);
                candidate.token_address = Some(address);
            }
            None => warn!(
                "source_id={}: token getter call failed or returned no address",
                source.id
            ),
        }
        Ok(())
    }
}

/// Assemble the eligibility row from the classification results. Pure
/// so the activity/status rules stay testable without a database.
fn build_airdrop_row(
    source: &PendingSource,
    candidate: &AirdropCandidate,
    metadata: Option<&TokenMetadata>,
    now: i64,
) -> NewAirdropContract {
    let mut token_ticker = candidate.token_ticker.clone();
    let mut token_decimals = candidate.token_decimals;
    let mut token_analysis_status = token::NOT_ANALYZED;
    let mut active_status = active::ACTIVE;
    let mut reports: Vec<Value> = Vec::new();

    if let Some(md) = metadata {
        if token_ticker.is_none() {
            token_ticker = Some(md.symbol.clone());
        }
        if token_decimals.is_none() {
            token_decimals = Some(md.decimals);
        }
        reports.push(json!({
            "security_score": md.security_score,
            "possible_spam": md.possible_spam,
            "verified_contract": md.verified_contract,
            "provider": "TokenMetadataProvider(Moralis)",
        }));
        if md.possible_spam {
            warn!(
                "source_id={} marked inactive, metadata flags the token as possible spam",
                source.id
            );
            active_status = active::INACTIVE;
            token_analysis_status = token::UNSAFE;
        }
    }

    let claim_start_timestamp = candidate.claim_start.timestamp();
    let claim_end_timestamp = candidate.claim_end.timestamp();
    // A window that already closed never goes active.
    if active_status == active::ACTIVE
        && claim_end_timestamp.map_or(false, |ts| ts != 0 && ts < now)
    {
        active_status = active::INACTIVE;
    }

    NewAirdropContract {
        evm_contract_source_id: source.id,
        evm_network_chain_id: source.evm_network_chain_id,
        contract_address: source.contract_address.clone(),
        contract_name: source.contract_name.clone(),
        eligibility_function_abi: candidate.eligibility_function_abi.to_string(),
        get_token_function_abi: candidate
            .get_token_function_abi
            .as_ref()
            .map(|v| v.to_string()),
        claim_start_getter_abi: candidate.claim_start.getter_abi().map(str::to_owned),
        claim_end_getter_abi: candidate.claim_end.getter_abi().map(str::to_owned),
        claim_start_timestamp,
        claim_end_timestamp,
        token_address: candidate.token_address.clone(),
        token_ticker,
        token_decimals,
        token_analysis_status,
        token_security_report: Value::Array(reports).to_string(),
        active_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimdex_core::ClaimField;

    fn sample_source() -> PendingSource {
        PendingSource {
            id: 11,
            evm_network_chain_id: 1,
            contract_address: "0x3333333333333333333333333333333333333333".to_string(),
            contract_name: Some("MerkleDrop".to_string()),
            source_code: "{\"source\":\"contract X {}\"}".to_string(),
            abi: "[]".to_string(),
        }
    }

    fn sample_candidate() -> AirdropCandidate {
        AirdropCandidate {
            eligibility_function_abi: json!({
                "type": "function", "name": "claimable", "inputs": [{"type": "address"}]
            }),
            get_token_function_abi: None,
            token_address: Some("0x4444444444444444444444444444444444444444".to_string()),
            token_ticker: None,
            token_decimals: None,
            claim_start: ClaimField::Unset,
            claim_end: ClaimField::Unset,
        }
    }

    fn sample_metadata(possible_spam: bool) -> TokenMetadata {
        TokenMetadata {
            symbol: "DROP".to_string(),
            decimals: 18,
            possible_spam,
            verified_contract: true,
            security_score: Some(87.0),
        }
    }

    #[test]
    fn metadata_fills_missing_ticker_and_decimals() {
        let row = build_airdrop_row(
            &sample_source(),
            &sample_candidate(),
            Some(&sample_metadata(false)),
            1_700_000_000,
        );
        assert_eq!(row.token_ticker.as_deref(), Some("DROP"));
        assert_eq!(row.token_decimals, Some(18));
        assert_eq!(row.active_status, active::ACTIVE);
        assert_eq!(row.token_analysis_status, token::NOT_ANALYZED);

        let reports: Vec<Value> = serde_json::from_str(&row.token_security_report).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0]["provider"].as_str(),
            Some("TokenMetadataProvider(Moralis)")
        );
    }

    #[test]
    fn spam_flag_deactivates_and_marks_unsafe() {
        let row = build_airdrop_row(
            &sample_source(),
            &sample_candidate(),
            Some(&sample_metadata(true)),
            1_700_000_000,
        );
        assert_eq!(row.active_status, active::INACTIVE);
        assert_eq!(row.token_analysis_status, token::UNSAFE);
    }

    #[test]
    fn already_closed_window_inserts_inactive() {
        let mut candidate = sample_candidate();
        candidate.claim_end = ClaimField::Timestamp(1_600_000_000);
        let row = build_airdrop_row(&sample_source(), &candidate, None, 1_700_000_000);
        assert_eq!(row.active_status, active::INACTIVE);
        assert_eq!(row.claim_end_timestamp, Some(1_600_000_000));
    }

    #[test]
    fn open_window_stays_active() {
        let mut candidate = sample_candidate();
        candidate.claim_end = ClaimField::Timestamp(1_800_000_000);
        let row = build_airdrop_row(&sample_source(), &candidate, None, 1_700_000_000);
        assert_eq!(row.active_status, active::ACTIVE);
    }

    #[test]
    fn getter_abi_fields_are_persisted_as_json_strings() {
        let mut candidate = sample_candidate();
        let getter = json!({"type": "function", "name": "claimEnd", "inputs": []});
        candidate.claim_end = ClaimField::Getter(getter.to_string());
        let row = build_airdrop_row(&sample_source(), &candidate, None, 1_700_000_000);
        assert_eq!(row.claim_end_getter_abi.as_deref(), Some(getter.to_string().as_str()));
        assert_eq!(row.claim_end_timestamp, None);
        // No metadata fetched -> an empty report array, not NULL.
        assert_eq!(row.token_security_report, "[]");
    }
}
