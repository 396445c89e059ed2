//! Token scanner: audits the airdropped token itself.
//!
//! Eligibility rows start with `token_analysis_status = 0`. This
//! scanner fetches the token contract's verified source, runs it
//! through the same canonicalization and static analysis as the drop
//! contract, appends the verdict to the row's security report, and
//! records the status the agent filter keys on. Tokens with no
//! verified source stay pending for a later cycle.

use std::sync::Arc;

use claimdex_analysis::{canonicalize_source, StaticAnalyzer};
use claimdex_providers::BlockchainClient;
use claimdex_storage::{AirdropRepository, TokenCheckRow};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::Result;

pub struct TokenScanner {
    repository: AirdropRepository,
    client: Arc<dyn BlockchainClient>,
    static_analyzer: Arc<StaticAnalyzer>,
    batch_size: i64,
}

impl TokenScanner {
    pub fn new(
        repository: AirdropRepository,
        client: Arc<dyn BlockchainClient>,
        static_analyzer: Arc<StaticAnalyzer>,
        batch_size: i64,
    ) -> Self {
        Self {
            repository,
            client,
            static_analyzer,
            batch_size,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let mut tx = self.repository.pool().begin().await?;

        let tokens = self.repository.tokens_for_analysis(&mut tx, self.batch_size).await?;
        if tokens.is_empty() {
            info!("no new tokens found for analysis");
            tx.commit().await?;
            return Ok(());
        }
        info!("processing {} tokens", tokens.len());

        for token in &tokens {
            self.process_token(&mut tx, token).await?;
        }

        tx.commit().await?;
        info!("successfully processed batch of {} tokens", tokens.len());
        Ok(())
    }

    async fn process_token(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        token: &TokenCheckRow,
    ) -> Result<()> {
        debug!("analyzing token id={} ({})", token.id, token.token_address);

        let source = self
            .client
            .contract_source(token.evm_network_chain_id, &token.token_address)
            .await?;
        let source = match source {
            Some(s) => s,
            None => {
                warn!("source lookup returned no data for token {}", token.token_address);
                return Ok(());
            }
        };

        if source.source_code.trim().is_empty() {
            info!(
                "token {} is unverified, leaving for a later cycle",
                token.token_address
            );
            return Ok(());
        }

        let canonical = canonicalize_source(&source.source_code)?;
        let report = self.static_analyzer.analyze(&canonical).await;
        let (security_status, _) = self.static_analyzer.classify(&report);

        let mut reports: Vec<Value> = token
            .token_security_report
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();
        reports.push(json!({
            "error": report.get("error").cloned().unwrap_or_else(|| json!("")),
            "results": report.get("results").cloned().unwrap_or_else(|| json!({})),
            "success": report.get("success").cloned().unwrap_or_else(|| json!(false)),
            "provider": "Slither",
        }));

        info!(
            "token id={} classified with status {}",
            token.id, security_status
        );
        self.repository
            .set_token_analysis(tx, token.id, security_status, &Value::Array(reports).to_string())
            .await?;
        Ok(())
    }
}
