//! Normalized airdrop-candidate record.
//!
//! The LLM contract analysis returns a loosely-typed JSON object; this
//! module decodes it into a strict [`AirdropCandidate`] so the rest of
//! the pipeline never touches raw `Value`s. The claim-window fields are
//! the loosest part of the contract: the model may answer with a getter
//! ABI object, a JSON string of one, or a bare integer timestamp.

use serde_json::Value;
use tracing::{info, warn};

/// One claim-window boundary as reported by the LLM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimField {
    /// A getter-function ABI, stored as its JSON string.
    Getter(String),
    /// A hardcoded unix timestamp.
    Timestamp(i64),
    /// Nothing usable was reported.
    Unset,
}

impl ClaimField {
    /// Interpret a raw LLM field value: integers become timestamps,
    /// JSON objects (or strings that parse to JSON) become getter ABIs,
    /// anything else is dropped.
    pub fn from_value(value: Option<&Value>) -> Self {
        let value = match value {
            Some(v) if !v.is_null() => v,
            _ => return ClaimField::Unset,
        };

        match value {
            Value::Number(n) => match n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)) {
                Some(ts) => ClaimField::Timestamp(ts),
                None => ClaimField::Unset,
            },
            Value::Object(_) | Value::Array(_) => ClaimField::Getter(value.to_string()),
            Value::String(s) => {
                if let Ok(ts) = s.parse::<i64>() {
                    return ClaimField::Timestamp(ts);
                }
                match serde_json::from_str::<Value>(s) {
                    Ok(_) => ClaimField::Getter(s.clone()),
                    Err(_) => ClaimField::Unset,
                }
            }
            _ => ClaimField::Unset,
        }
    }

    pub fn getter_abi(&self) -> Option<&str> {
        match self {
            ClaimField::Getter(abi) => Some(abi),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<i64> {
        match self {
            ClaimField::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// A contract the LLM confirmed as an airdrop, with everything needed
/// to check and annotate wallet eligibility.
#[derive(Debug, Clone)]
pub struct AirdropCandidate {
    /// ABI of the function that answers "how much can this address
    /// claim". Always present; rows without it are not candidates.
    pub eligibility_function_abi: Value,
    /// ABI of the getter returning the airdropped token's address.
    pub get_token_function_abi: Option<Value>,
    pub token_address: Option<String>,
    pub token_ticker: Option<String>,
    pub token_decimals: Option<i32>,
    pub claim_start: ClaimField,
    pub claim_end: ClaimField,
}

impl AirdropCandidate {
    /// Decode and validate an LLM response. Returns `None` when the
    /// response is not JSON, not an object, the empty object (the
    /// model's "not an airdrop" answer), or missing the eligibility
    /// function.
    pub fn from_response(response: &str) -> Option<Self> {
        let data: Value = match serde_json::from_str(response) {
            Ok(v) => v,
            Err(_) => {
                warn!("LLM response was not valid JSON: {:.200}", response);
                return None;
            }
        };

        let obj = match data.as_object() {
            Some(o) => o,
            None => {
                warn!("LLM response was not a JSON object: {}", data);
                return None;
            }
        };
        if obj.is_empty() {
            info!("LLM returned an empty object, contract is not an airdrop");
            return None;
        }

        let eligibility = match obj.get("eligibility_function_abi") {
            Some(v) if !v.is_null() => v.clone(),
            _ => {
                warn!("LLM response is missing 'eligibility_function_abi': {}", data);
                return None;
            }
        };

        let get_token = match ClaimField::from_value(obj.get("get_token_function_abi")) {
            ClaimField::Getter(abi) => serde_json::from_str(&abi).ok(),
            _ => None,
        };

        let token_decimals = obj.get("token_decimals").and_then(|v| match v {
            Value::Number(n) => n.as_i64().map(|d| d as i32),
            Value::String(s) => s.parse::<i32>().ok(),
            _ => None,
        });

        Some(Self {
            eligibility_function_abi: eligibility,
            get_token_function_abi: get_token,
            token_address: obj
                .get("token_address")
                .and_then(Value::as_str)
                .map(str::to_owned),
            token_ticker: obj
                .get("token_ticker")
                .and_then(Value::as_str)
                .map(str::to_owned),
            token_decimals,
            claim_start: ClaimField::from_value(obj.get("claim_start_getter_abi")),
            claim_end: ClaimField::from_value(obj.get("claim_end_getter_abi")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_means_not_an_airdrop() {
        assert!(AirdropCandidate::from_response("{}").is_none());
        assert!(AirdropCandidate::from_response("not json").is_none());
        assert!(AirdropCandidate::from_response("[1, 2]").is_none());
    }

    #[test]
    fn eligibility_function_is_required() {
        let response = json!({"token_address": "0x1111111111111111111111111111111111111111"});
        assert!(AirdropCandidate::from_response(&response.to_string()).is_none());
    }

    #[test]
    fn full_candidate_decodes() {
        let response = json!({
            "eligibility_function_abi": {
                "type": "function",
                "name": "claimable",
                "inputs": [{"type": "address"}]
            },
            "get_token_function_abi": {"type": "function", "name": "token", "inputs": []},
            "token_address": "0x2222222222222222222222222222222222222222",
            "token_ticker": "DROP",
            "token_decimals": 18,
            "claim_start_getter_abi": 1700000000,
            "claim_end_getter_abi": {"type": "function", "name": "claimEnd", "inputs": []}
        });

        let candidate = AirdropCandidate::from_response(&response.to_string()).unwrap();
        assert_eq!(
            candidate.eligibility_function_abi["name"].as_str(),
            Some("claimable")
        );
        assert!(candidate.get_token_function_abi.is_some());
        assert_eq!(candidate.token_decimals, Some(18));
        assert_eq!(candidate.claim_start, ClaimField::Timestamp(1700000000));
        assert!(candidate.claim_end.getter_abi().is_some());
    }

    #[test]
    fn time_fields_tolerate_every_shape() {
        // Integers and numeric strings are timestamps.
        assert_eq!(
            ClaimField::from_value(Some(&json!(1700000000))),
            ClaimField::Timestamp(1700000000)
        );
        assert_eq!(
            ClaimField::from_value(Some(&json!("1700000000"))),
            ClaimField::Timestamp(1700000000)
        );
        // Objects and JSON strings of objects are getter ABIs.
        let abi = json!({"type": "function", "name": "claimStart", "inputs": []});
        assert!(matches!(
            ClaimField::from_value(Some(&abi)),
            ClaimField::Getter(_)
        ));
        assert!(matches!(
            ClaimField::from_value(Some(&json!(abi.to_string()))),
            ClaimField::Getter(_)
        ));
        // Everything else is dropped.
        assert_eq!(ClaimField::from_value(None), ClaimField::Unset);
        assert_eq!(ClaimField::from_value(Some(&Value::Null)), ClaimField::Unset);
        assert_eq!(
            ClaimField::from_value(Some(&json!("sometime next week"))),
            ClaimField::Unset
        );
        assert_eq!(ClaimField::from_value(Some(&json!(true))), ClaimField::Unset);
    }

    #[test]
    fn decimals_accepts_string_form() {
        let response = json!({
            "eligibility_function_abi": {
                "type": "function",
                "name": "isEligible",
                "inputs": [{"type": "address"}]
            },
            "token_decimals": "6"
        });
        let candidate = AirdropCandidate::from_response(&response.to_string()).unwrap();
        assert_eq!(candidate.token_decimals, Some(6));
    }
}
