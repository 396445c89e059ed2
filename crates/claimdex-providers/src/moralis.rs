//! Moralis-compatible token-metadata client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::client::{BlockchainClient, ContractSource, ProviderError, Result, TokenMetadata};
use crate::rate_gate::RateGate;

pub struct MoralisClient {
    base_url: String,
    api_key: String,
    gate: Arc<RateGate>,
    http: reqwest::Client,
}

impl MoralisClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        gate: Arc<RateGate>,
        timeout: Duration,
        proxy_url: Option<&str>,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(ProviderError::Api("a metadata API key is required".into()));
        }
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(proxy) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            gate,
            http: builder.build()?,
        })
    }

    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);

        let _permit = self.gate.acquire().await;
        let response = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .header("X-API-Key", &self.api_key)
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        let data: Value = response.json().await?;

        // Error payloads come back as a bare {message, code, ...} object.
        if let Some(obj) = data.as_object() {
            if obj.contains_key("message")
                && obj
                    .keys()
                    .all(|k| matches!(k.as_str(), "message" | "name" | "description" | "code"))
            {
                let message = format!(
                    "{} (code: {})",
                    obj.get("message").and_then(Value::as_str).unwrap_or(""),
                    obj.get("code").cloned().unwrap_or(Value::Null)
                );
                warn!("metadata provider rejected the request: {}", message);
                return Err(ProviderError::Api(message));
            }
        }
        Ok(data)
    }
}

fn parse_decimals(value: Option<&Value>) -> Option<i32> {
    match value? {
        Value::Number(n) => n.as_i64().map(|d| d as i32),
        Value::String(s) => s.parse::<i32>().ok(),
        _ => None,
    }
}

#[async_trait]
impl BlockchainClient for MoralisClient {
    async fn latest_block_number(&self, _chain_id: i64) -> Result<u64> {
        Err(ProviderError::Unsupported("latest_block_number"))
    }

    async fn block_by_number(&self, _chain_id: i64, _block_number: u64) -> Result<Option<Value>> {
        Err(ProviderError::Unsupported("block_by_number"))
    }

    async fn transaction_receipt(&self, _chain_id: i64, _tx_hash: &str) -> Result<Option<Value>> {
        Err(ProviderError::Unsupported("transaction_receipt"))
    }

    async fn contract_source(
        &self,
        _chain_id: i64,
        _address: &str,
    ) -> Result<Option<ContractSource>> {
        Err(ProviderError::Unsupported("contract_source"))
    }

    async fn eth_call(&self, _chain_id: i64, _to: &str, _data: &str) -> Result<Option<String>> {
        Err(ProviderError::Unsupported("eth_call"))
    }

    async fn eth_get_code(&self, _chain_id: i64, _address: &str) -> Result<Option<String>> {
        Err(ProviderError::Unsupported("eth_get_code"))
    }

    async fn token_metadata(&self, chain_id: i64, address: &str) -> Result<Option<TokenMetadata>> {
        let params = [
            ("chain", format!("0x{:x}", chain_id)),
            ("addresses[0]", address.to_string()),
        ];
        let data = self.get("/erc20/metadata", &params).await?;

        let first = match data.as_array() {
            Some(list) if !list.is_empty() => &list[0],
            _ => {
                warn!("empty metadata response for token {}", address);
                return Ok(None);
            }
        };

        let symbol = first
            .get("symbol")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        let decimals = parse_decimals(first.get("decimals"));
        let (symbol, decimals) = match (symbol, decimals) {
            (Some(s), Some(d)) => (s.to_string(), d),
            _ => {
                warn!(
                    "metadata for {} is missing symbol or decimals: {}",
                    address, first
                );
                return Ok(None);
            }
        };

        Ok(Some(TokenMetadata {
            symbol,
            decimals,
            possible_spam: first
                .get("possible_spam")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            verified_contract: first
                .get("verified_contract")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            security_score: first
                .get("verified_contract_security_score")
                .and_then(Value::as_f64),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decimals_parse_both_shapes() {
        assert_eq!(parse_decimals(Some(&json!(18))), Some(18));
        assert_eq!(parse_decimals(Some(&json!("6"))), Some(6));
        assert_eq!(parse_decimals(Some(&json!(null))), None);
        assert_eq!(parse_decimals(Some(&json!("many"))), None);
        assert_eq!(parse_decimals(None), None);
    }
}
