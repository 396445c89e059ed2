//! LLM semantic analysis of candidate contracts.
//!
//! Contracts that pass the keyword filter and the static analyzer are
//! handed to the model together with their ABI; the model either
//! returns the strict candidate object or `{}` for "not an airdrop".

use std::sync::Arc;

use claimdex_core::AirdropCandidate;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::AnalysisError;
use crate::source_bundle::flatten_source;
use claimdex_providers::LlmClient;

const SYSTEM_PROMPT: &str = r#"You are an expert smart contract security and logic analyst.
Your task is to analyze the provided Solidity source code and ABI to identify if it is an Airdrop contract.

You MUST respond ONLY with a single, minified JSON object. Do NOT include markdown ticks (`json ... `), notes, or any conversational text.

If the contract is NOT an Airdrop contract OR if you cannot find the primary eligibility function, you MUST return an empty JSON object: {}

If it IS an Airdrop contract, you MUST return a JSON object with the following structure.

REQUIRED field (MUST be present):
- "eligibility_function_abi": The full JSON ABI object for the function that checks if an address is eligible for the airdrop (e.g., a function named `isEligible`, `getClaimableAmount`, or one that takes a Merkle proof).

OPTIONAL fields (return null if not found):
- "get_token_function_abi": The JSON ABI object for the function that *returns* the address of the airdropped token (e.g., a function named `token()` or `rewardToken()` and etc).
- "token_address": The string address of the token being airdropped (if found directly, or if `get_token_function_abi` is not present).
- "token_ticker": The string ticker symbol of the token (e.g., "TOKEN").
- "token_decimals": The integer number of decimals for the token.
- "claim_start_getter_abi": The JSON ABI object for the function that returns the claim start time, OR the timestamp (integer) if it's a hardcoded block.timestamp or number.
- "claim_end_getter_abi": The JSON ABI object for the function that returns the claim end time, OR the timestamp (integer) if it's a hardcoded block.timestamp or number.

Your entire response must be ONLY the JSON object.
"#;

pub struct LlmAnalyzer {
    client: Arc<LlmClient>,
}

impl LlmAnalyzer {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }

    /// Build the chat payload for one contract.
    fn prepare_payload(canonical_source: &str, abi: &str) -> Value {
        let flat_source = flatten_source(canonical_source);
        let user_content = format!(
            "Here is the smart contract source code:\n\
             ```solidity\n{}\n```\n\n\
             Here is the smart contract ABI:\n\
             ```json\n{}\n```\n\n\
             Analyze the contract based on your instructions and provide ONLY the JSON response.",
            flat_source, abi
        );

        json!({
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_content }
            ],
            "response_format": { "type": "json_object" }
        })
    }

    /// Ask the model whether this contract is an airdrop. `Ok(None)`
    /// means a definitive "no" (empty object, missing eligibility
    /// function, or unusable response); transport errors propagate so
    /// the caller's batch rolls back and retries.
    pub async fn analyze(
        &self,
        canonical_source: &str,
        abi: &str,
    ) -> Result<Option<AirdropCandidate>, AnalysisError> {
        let payload = Self::prepare_payload(canonical_source, abi);
        let response = self.client.query(payload).await?;

        let response = match response {
            Some(text) => text,
            None => {
                warn!("LLM returned an empty response");
                return Ok(None);
            }
        };

        Ok(AirdropCandidate::from_response(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_source_abi_and_format_constraint() {
        let payload = LlmAnalyzer::prepare_payload(
            r#"{"source": "contract Drop {}"}"#,
            r#"[{"type":"function","name":"claim"}]"#,
        );

        assert_eq!(payload["response_format"]["type"].as_str(), Some("json_object"));
        let messages = payload["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"].as_str(), Some("system"));

        let user = messages[1]["content"].as_str().unwrap();
        assert!(user.contains("contract Drop {}"));
        assert!(user.contains(r#""name":"claim""#));
    }

    #[test]
    fn multi_file_sources_are_flattened_into_the_prompt() {
        let payload = LlmAnalyzer::prepare_payload(
            r#"{"sources":{"A.sol":{"content":"aaa"}}}"#,
            "[]",
        );
        let user = payload["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("// --- File: A.sol ---"));
        assert!(user.contains("aaa"));
    }
}
