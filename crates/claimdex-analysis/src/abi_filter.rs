//! ABI keyword pre-filter.
//!
//! The cheapest stage: a contract whose ABI mentions none of the
//! configured keywords ("claim", "airdrop", "merkle", ...) is not worth
//! a static-analysis run. Fails closed: malformed ABI JSON is a miss.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{info, warn};

pub struct AbiKeywordFilter {
    keywords: HashSet<String>,
}

impl AbiKeywordFilter {
    /// Keywords are matched lowercase, as substrings of item names.
    pub fn new(keywords: &[String]) -> Self {
        info!("ABI filter initialized with keywords: {:?}", keywords);
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// `true` when any named ABI item (function, event, ...) contains a
    /// configured keyword.
    pub fn matches(&self, abi_str: &str) -> bool {
        if abi_str.is_empty() {
            return false;
        }

        let items: Vec<Value> = match serde_json::from_str(abi_str) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                warn!("ABI is not a JSON array: {:.200}", abi_str);
                return false;
            }
            Err(_) => {
                warn!("failed to decode ABI JSON: {:.200}", abi_str);
                return false;
            }
        };

        for item in &items {
            if let Some(name) = item.get("name").and_then(Value::as_str) {
                let name = name.to_lowercase();
                if self.keywords.iter().any(|k| name.contains(k)) {
                    info!("ABI filter hit on '{}'", name);
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> AbiKeywordFilter {
        AbiKeywordFilter::new(&[
            "claim".to_string(),
            "airdrop".to_string(),
            "merkle".to_string(),
        ])
    }

    #[test]
    fn hits_on_function_and_event_names() {
        let abi = r#"[
            {"type": "function", "name": "claimTokens", "inputs": []},
            {"type": "function", "name": "owner", "inputs": []}
        ]"#;
        assert!(filter().matches(abi));

        let abi = r#"[{"type": "event", "name": "MerkleRootUpdated"}]"#;
        assert!(filter().matches(abi));
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let abi = r#"[{"type": "function", "name": "AIRDROP", "inputs": []}]"#;
        assert!(filter().matches(abi));
    }

    #[test]
    fn misses_without_keywords() {
        let abi = r#"[
            {"type": "function", "name": "transfer", "inputs": []},
            {"type": "function", "name": "approve", "inputs": []}
        ]"#;
        assert!(!filter().matches(abi));
    }

    #[test]
    fn fails_closed_on_malformed_abi() {
        assert!(!filter().matches(""));
        assert!(!filter().matches("not json"));
        assert!(!filter().matches(r#"{"name": "claim"}"#));
        // Items without names are skipped, not errors.
        assert!(!filter().matches(r#"[{"type": "fallback"}]"#));
    }
}
