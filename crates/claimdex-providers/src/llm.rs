//! OpenAI-compatible chat-completions client.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::info;

use crate::client::{ProviderError, Result};
use crate::rate_gate::RateGate;

pub struct LlmClient {
    base_url: String,
    model: String,
    gate: Arc<RateGate>,
    http: reqwest::Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        gate: Arc<RateGate>,
        timeout: Duration,
        proxy_url: Option<&str>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(proxy) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        info!("LLM client initialized for model {} at {}", model, base_url);
        Ok(Self {
            base_url: base_url.to_string(),
            model: model.to_string(),
            gate,
            http: builder.build()?,
            api_key: api_key.to_string(),
        })
    }

    /// Send a chat payload (`messages`, `response_format`, ...); the
    /// configured model is injected before dispatch. Returns the
    /// trimmed assistant message, or `None` when the model answered
    /// with empty content.
    pub async fn query(&self, mut payload: Value) -> Result<Option<String>> {
        payload["model"] = Value::String(self.model.clone());

        let _permit = self.gate.acquire().await;
        let response = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        let data: Value = response.json().await?;

        let content = data
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| {
                ProviderError::Payload(format!("invalid LLM response structure: {}", data))
            })?
            .get("content")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned);

        Ok(content)
    }
}
