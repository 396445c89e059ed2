//! Wallet eligibility checking.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use claimdex_core::abi::{call_data_with_address, checksum_address, decode_uint256};
use claimdex_providers::BlockchainClient;
use claimdex_storage::EligibleContract;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

/// One contract a wallet can claim from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityHit {
    pub contract: Option<String>,
    pub contract_address: String,
    pub chain_id: i64,
    pub amount: String,
    pub claim_start_date: String,
    pub claim_end_date: String,
    pub token_security: String,
}

/// Everything found for one wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletReport {
    pub wallet: String,
    pub results: Vec<EligibilityHit>,
}

pub struct EligibilityChecker {
    contracts: Vec<EligibleContract>,
    client: Arc<dyn BlockchainClient>,
}

impl EligibilityChecker {
    pub fn new(contracts: Vec<EligibleContract>, client: Arc<dyn BlockchainClient>) -> Self {
        Self { contracts, client }
    }

    /// Check every contract for the given wallet. An invalid wallet
    /// address yields an empty report; individual contract failures
    /// are skipped.
    pub async fn check_wallet(&self, user_address: &str) -> WalletReport {
        let wallet = match checksum_address(user_address) {
            Some(address) => address,
            None => {
                error!("invalid user address provided: {}", user_address);
                return WalletReport {
                    wallet: user_address.to_string(),
                    results: Vec::new(),
                };
            }
        };

        let queries = self.contracts.iter().map(|c| self.query_contract(c, &wallet));
        let results = join_all(queries).await.into_iter().flatten().collect();

        WalletReport { wallet, results }
    }

    async fn query_contract(
        &self,
        contract: &EligibleContract,
        wallet: &str,
    ) -> Option<EligibilityHit> {
        let name = contract.contract_name.as_deref().unwrap_or("<unnamed>");

        let function_abi = match validate_eligibility_abi(&contract.eligibility_function_abi) {
            Some(abi) => abi,
            None => {
                warn!("[{}] eligibility ABI is not a one-address function, skipped", name);
                return None;
            }
        };

        let call_data = call_data_with_address(&function_abi, wallet)?;
        let result = match self
            .client
            .eth_call(contract.chain_id, &contract.contract_address, &call_data)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!("[{} @ chain {}] eth_call failed: {}", name, contract.chain_id, e);
                return None;
            }
        };

        let value = result.as_deref().and_then(decode_uint256)?;
        if value == 0 {
            info!("[{}] returned a zero amount, skipped", name);
            return None;
        }

        let decimals = contract.token_decimals.unwrap_or(18);
        let amount = format_amount(value, decimals);
        let ticker = contract.token_ticker.as_deref().unwrap_or("");
        info!("[{} @ chain {}] eligible for {} {}", name, contract.chain_id, amount, ticker);

        Some(EligibilityHit {
            contract: contract.contract_name.clone(),
            contract_address: contract.contract_address.clone(),
            chain_id: contract.chain_id,
            amount: format!("{} {}", amount, ticker).trim_end().to_string(),
            claim_start_date: format_timestamp_utc(contract.claim_start_timestamp.as_ref()),
            claim_end_date: format_timestamp_utc(contract.claim_end_timestamp.as_ref()),
            token_security: format_security_status(contract.token_analysis_status).to_string(),
        })
    }
}

/// The eligibility function must be a function ABI object taking
/// exactly one `address` argument; anything else is skipped.
fn validate_eligibility_abi(abi_string: &str) -> Option<Value> {
    let abi: Value = serde_json::from_str(abi_string).ok()?;
    if abi.get("type").and_then(Value::as_str) != Some("function") {
        return None;
    }
    let inputs = abi.get("inputs").and_then(Value::as_array)?;
    if inputs.len() != 1 {
        return None;
    }
    if inputs[0].get("type").and_then(Value::as_str) != Some("address") {
        return None;
    }
    Some(abi)
}

/// Scale a raw uint256 amount by the token decimals and render it with
/// up to six fractional digits, trailing zeros trimmed.
fn format_amount(value: u128, decimals: i32) -> String {
    let scaled = value as f64 / 10f64.powi(decimals);
    let formatted = format!("{:.6}", scaled);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn format_timestamp_utc(timestamp: Option<&DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => ts.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => "Could not find".to_string(),
    }
}

fn format_security_status(status: i16) -> &'static str {
    match status {
        0 => "The token's source code has not been audited",
        1 => "Contract code did not compile",
        2 => "Suspicious",
        3 => "Unsafe",
        4 => "Caution",
        5 => "Verified Safe",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn abi_validation_requires_one_address_input() {
        let good = json!({
            "type": "function",
            "name": "claimable",
            "inputs": [{"type": "address", "name": "account"}]
        });
        assert!(validate_eligibility_abi(&good.to_string()).is_some());

        let two_inputs = json!({
            "type": "function",
            "name": "claimable",
            "inputs": [{"type": "address"}, {"type": "uint256"}]
        });
        assert!(validate_eligibility_abi(&two_inputs.to_string()).is_none());

        let wrong_type = json!({
            "type": "function",
            "name": "claimable",
            "inputs": [{"type": "uint256"}]
        });
        assert!(validate_eligibility_abi(&wrong_type.to_string()).is_none());

        let event = json!({"type": "event", "inputs": [{"type": "address"}]});
        assert!(validate_eligibility_abi(&event.to_string()).is_none());

        assert!(validate_eligibility_abi("not json").is_none());
        assert!(validate_eligibility_abi("[]").is_none());
    }

    #[test]
    fn amounts_scale_and_trim() {
        assert_eq!(format_amount(1_000_000_000_000_000_000, 18), "1");
        assert_eq!(format_amount(1_500_000, 6), "1.5");
        assert_eq!(format_amount(1_234_567, 6), "1.234567");
        assert_eq!(format_amount(42, 0), "42");
        // Below display precision rounds away rather than panicking.
        assert_eq!(format_amount(1, 18), "0");
    }

    #[test]
    fn timestamps_render_or_admit_absence() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(format_timestamp_utc(Some(&ts)), "2026-03-01 12:30 UTC");
        assert_eq!(format_timestamp_utc(None), "Could not find");
    }

    #[test]
    fn security_annotations() {
        assert_eq!(
            format_security_status(0),
            "The token's source code has not been audited"
        );
        assert_eq!(format_security_status(1), "Contract code did not compile");
        assert_eq!(format_security_status(2), "Suspicious");
        assert_eq!(format_security_status(3), "Unsafe");
        assert_eq!(format_security_status(4), "Caution");
        assert_eq!(format_security_status(5), "Verified Safe");
        assert_eq!(format_security_status(9), "Unknown");
    }

    #[test]
    fn call_data_round_trip_against_fixture() {
        // A fixture "contract" that returns 2.5 tokens (6 decimals)
        // for any queried address.
        let abi = json!({
            "type": "function",
            "name": "claimable",
            "inputs": [{"type": "address"}]
        });
        let data = call_data_with_address(&abi, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
            .unwrap();
        assert!(data.starts_with("0x"));
        assert_eq!(data.len(), 2 + 8 + 64);

        let fixture_return = format!("0x{:064x}", 2_500_000u64);
        let decoded = decode_uint256(&fixture_return).unwrap();
        assert_eq!(format_amount(decoded, 6), "2.5");
    }
}
