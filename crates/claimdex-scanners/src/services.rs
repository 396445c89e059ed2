//! Service registry.
//!
//! Builds every shared singleton once at startup: the storage pool,
//! the rate gates (shared or per-client, per the configured mode), the
//! provider clients, the analyzers, and the six scanners wired
//! together. Passed by reference from the binary; nothing here is a
//! global.

use std::sync::Arc;

use claimdex_analysis::{AbiKeywordFilter, LlmAnalyzer, StaticAnalyzer};
use claimdex_providers::{
    BlockchainClient, EtherscanClient, LlmClient, MoralisClient, RateGate,
};
use claimdex_storage::{
    AirdropRepository, BlockRepository, NetworkRepository, SourceRepository, Storage,
    TransactionRepository,
};
use tracing::info;

use crate::block::BlockScanner;
use crate::config::{Config, ProviderSettings};
use crate::date::DateScanner;
use crate::error::Result;
use crate::network::NetworkScanner;
use crate::source::SourceScanner;
use crate::token::TokenScanner;
use crate::transaction::TransactionScanner;

pub struct ServiceRegistry {
    pub storage: Storage,
    pub config: Config,
    pub airdrop_repository: AirdropRepository,
    pub network_scanner: Arc<NetworkScanner>,
    pub block_scanner: Arc<BlockScanner>,
    pub transaction_scanner: Arc<TransactionScanner>,
    pub source_scanner: Arc<SourceScanner>,
    pub date_scanner: Arc<DateScanner>,
    pub token_scanner: Arc<TokenScanner>,
}

fn chain_client(
    settings: &ProviderSettings,
    gate: Arc<RateGate>,
) -> Result<Arc<dyn BlockchainClient>> {
    let client = EtherscanClient::new(
        &settings.base_url,
        &settings.api_key,
        gate,
        settings.timeout,
        settings.proxy_url.as_deref(),
    )?;
    Ok(Arc::new(client))
}

impl ServiceRegistry {
    pub async fn build(config: Config) -> Result<Self> {
        let storage = Storage::connect(&config.database_url).await?;
        storage.ensure_schema().await?;
        info!("connected to PostgreSQL");

        // One gate shared by every chain client, or one gate each.
        let gate_for_chain_clients: Box<dyn Fn() -> Arc<RateGate>> =
            if config.parallel_provider_mode {
                info!("provider gates in parallel mode (one per client)");
                let delay = config.request_delay;
                Box::new(move || RateGate::new(delay))
            } else {
                info!("provider gates in shared mode (global serialization)");
                let shared = RateGate::new(config.request_delay);
                Box::new(move || shared.clone())
            };

        let network_client = chain_client(&config.network_provider, gate_for_chain_clients())?;
        let block_client = chain_client(&config.block_provider, gate_for_chain_clients())?;
        let transaction_client =
            chain_client(&config.transaction_provider, gate_for_chain_clients())?;
        let date_client = chain_client(&config.date_provider, gate_for_chain_clients())?;
        let call_client = chain_client(&config.call_provider, gate_for_chain_clients())?;

        // The metadata and LLM providers always gate independently;
        // their limits have nothing to do with the chain provider's.
        let metadata_client: Arc<dyn BlockchainClient> = Arc::new(MoralisClient::new(
            &config.metadata_provider.base_url,
            &config.metadata_provider.api_key,
            RateGate::new(config.request_delay),
            config.metadata_provider.timeout,
            config.metadata_provider.proxy_url.as_deref(),
        )?);
        let llm_client = Arc::new(LlmClient::new(
            &config.llm.base_url,
            &config.llm.api_key,
            &config.llm.model,
            RateGate::new(std::time::Duration::ZERO),
            config.llm.timeout,
            config.llm.proxy_url.as_deref(),
        )?);

        let pool = storage.pool().clone();
        let network_repository = NetworkRepository::new(pool.clone());
        let block_repository = BlockRepository::new(pool.clone());
        let transaction_repository = TransactionRepository::new(pool.clone());
        let source_repository = SourceRepository::new(pool.clone());
        let airdrop_repository = AirdropRepository::new(pool);

        let abi_filter = Arc::new(AbiKeywordFilter::new(&config.abi_keywords));
        let static_analyzer = Arc::new(StaticAnalyzer::with_command(
            &config.static_analyzer_command,
        ));
        let llm_analyzer = Arc::new(LlmAnalyzer::new(llm_client));

        let network_scanner = Arc::new(NetworkScanner::new(
            network_repository,
            network_client,
            config.catch_up_threshold,
            config.catch_up_batch_size,
            config.follow_batch_size,
        ));
        let block_scanner = Arc::new(BlockScanner::new(
            block_repository,
            block_client,
            config.block_scanner.batch_size,
        ));
        let transaction_scanner = Arc::new(TransactionScanner::new(
            transaction_repository,
            transaction_client.clone(),
            config.transaction_scanner.batch_size,
        ));
        let source_scanner = Arc::new(SourceScanner::new(
            source_repository,
            abi_filter,
            static_analyzer.clone(),
            llm_analyzer,
            call_client.clone(),
            metadata_client,
            config.source_scanner.batch_size,
        ));
        let date_scanner = Arc::new(DateScanner::new(
            airdrop_repository.clone(),
            date_client,
            config.date_scanner.batch_size,
        ));
        let token_scanner = Arc::new(TokenScanner::new(
            airdrop_repository.clone(),
            call_client,
            static_analyzer,
            config.token_scanner.batch_size,
        ));

        Ok(Self {
            storage,
            config,
            airdrop_repository,
            network_scanner,
            block_scanner,
            transaction_scanner,
            source_scanner,
            date_scanner,
            token_scanner,
        })
    }
}
