//! Etherscan-v2 compatible client.
//!
//! One query surface serves every chain: GET with `chainid`, `module`,
//! `action` and action-specific parameters. A payload with
//! `status == "0"` is an error even when the HTTP layer succeeded.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, warn};

use crate::client::{BlockchainClient, ContractSource, ProviderError, Result, TokenMetadata};
use crate::rate_gate::RateGate;

pub struct EtherscanClient {
    base_url: String,
    api_key: String,
    gate: Arc<RateGate>,
    http: reqwest::Client,
}

impl EtherscanClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        gate: Arc<RateGate>,
        timeout: Duration,
        proxy_url: Option<&str>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(proxy) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            gate,
            http: builder.build()?,
        })
    }

    /// Perform one gated GET and unwrap the provider envelope.
    async fn request(&self, mut params: Vec<(&'static str, String)>) -> Result<Value> {
        params.push(("apikey", self.api_key.clone()));

        let _permit = self.gate.acquire().await;
        let response = self
            .http
            .get(&self.base_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;
        let data: Value = response.json().await?;

        if data.get("status").and_then(Value::as_str) == Some("0") {
            let message = format!(
                "{} - {}",
                data.get("message").and_then(Value::as_str).unwrap_or(""),
                data.get("result").cloned().unwrap_or(Value::Null)
            );
            warn!("provider rejected the request: {}", message);
            return Err(ProviderError::Api(message));
        }
        if data.get("result").is_none() {
            return Err(ProviderError::Payload(format!(
                "'result' missing from response: {}",
                data
            )));
        }
        Ok(data)
    }
}

#[async_trait]
impl BlockchainClient for EtherscanClient {
    async fn latest_block_number(&self, chain_id: i64) -> Result<u64> {
        let data = self
            .request(vec![
                ("chainid", chain_id.to_string()),
                ("module", "proxy".to_string()),
                ("action", "eth_blockNumber".to_string()),
            ])
            .await?;
        let hex = data
            .get("result")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Payload("block number is not a string".into()))?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| ProviderError::Payload(format!("bad block number {}: {}", hex, e)))
    }

    async fn block_by_number(&self, chain_id: i64, block_number: u64) -> Result<Option<Value>> {
        let data = self
            .request(vec![
                ("chainid", chain_id.to_string()),
                ("module", "proxy".to_string()),
                ("action", "eth_getBlockByNumber".to_string()),
                ("tag", format!("0x{:x}", block_number)),
                ("boolean", "true".to_string()),
            ])
            .await?;
        let result = data.get("result").cloned().unwrap_or(Value::Null);
        Ok(if result.is_null() { None } else { Some(result) })
    }

    async fn transaction_receipt(&self, chain_id: i64, tx_hash: &str) -> Result<Option<Value>> {
        let data = self
            .request(vec![
                ("chainid", chain_id.to_string()),
                ("module", "proxy".to_string()),
                ("action", "eth_getTransactionReceipt".to_string()),
                ("txhash", tx_hash.to_string()),
            ])
            .await?;
        let result = data.get("result").cloned().unwrap_or(Value::Null);
        Ok(if result.is_null() { None } else { Some(result) })
    }

    async fn contract_source(
        &self,
        chain_id: i64,
        address: &str,
    ) -> Result<Option<ContractSource>> {
        let data = self
            .request(vec![
                ("chainid", chain_id.to_string()),
                ("module", "contract".to_string()),
                ("action", "getsourcecode".to_string()),
                ("address", address.to_string()),
            ])
            .await?;

        let first = match data.get("result").and_then(Value::as_array) {
            Some(list) if !list.is_empty() => &list[0],
            other => {
                warn!(
                    "no source on file for {} on chain {}: {:?}",
                    address, chain_id, other
                );
                return Ok(None);
            }
        };

        Ok(Some(ContractSource {
            source_code: first
                .get("SourceCode")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            abi: first
                .get("ABI")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            contract_name: first
                .get("ContractName")
                .and_then(Value::as_str)
                .filter(|n| !n.is_empty())
                .map(str::to_owned),
        }))
    }

    async fn eth_call(&self, chain_id: i64, to: &str, data: &str) -> Result<Option<String>> {
        let params = vec![
            ("chainid", chain_id.to_string()),
            ("module", "proxy".to_string()),
            ("action", "eth_call".to_string()),
            ("to", to.to_string()),
            ("data", data.to_string()),
            ("tag", "latest".to_string()),
        ];
        // Call failures are expected for individual contracts; they are
        // logged and reported as "no result" rather than failing the
        // caller's whole batch.
        match self.request(params).await {
            Ok(payload) => {
                let result = payload.get("result").and_then(Value::as_str);
                match result {
                    Some(hex) if hex.starts_with("0x") && hex.len() > 2 => {
                        Ok(Some(hex.to_string()))
                    }
                    other => {
                        warn!("eth_call to {} returned an unusable result: {:?}", to, other);
                        Ok(None)
                    }
                }
            }
            Err(e) => {
                error!("eth_call to {} failed: {}", to, e);
                Ok(None)
            }
        }
    }

    async fn eth_get_code(&self, chain_id: i64, address: &str) -> Result<Option<String>> {
        let params = vec![
            ("chainid", chain_id.to_string()),
            ("module", "proxy".to_string()),
            ("action", "eth_getCode".to_string()),
            ("address", address.to_string()),
            ("tag", "latest".to_string()),
        ];
        match self.request(params).await {
            Ok(payload) => match payload.get("result").and_then(Value::as_str) {
                Some(hex) if hex.starts_with("0x") => Ok(Some(hex.to_string())),
                other => {
                    warn!(
                        "eth_getCode for {} returned an unusable result: {:?}",
                        address, other
                    );
                    Ok(None)
                }
            },
            Err(e) => {
                error!("eth_getCode for {} failed: {}", address, e);
                Ok(None)
            }
        }
    }

    async fn token_metadata(&self, _chain_id: i64, _address: &str) -> Result<Option<TokenMetadata>> {
        Err(ProviderError::Unsupported("token_metadata"))
    }
}
