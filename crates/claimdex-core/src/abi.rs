//! Contract ABI helpers.
//!
//! Selector derivation, call-data encoding and return-value decoding for
//! the read-only contract calls the pipeline performs. All inputs come
//! from untrusted sources (LLM output, provider payloads), so every
//! function here degrades to `None` instead of panicking.

use serde_json::Value;
use sha3::{Digest, Keccak256};
use tracing::{debug, warn};

/// Timestamps above this are not plausible claim-window dates
/// (10^10 seconds is May 2286) and are treated as garbage.
const MAX_PLAUSIBLE_TIMESTAMP: u64 = 10_000_000_000;

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Build the canonical signature `name(type1,type2,...)` from a function
/// ABI object. Returns `None` when the object is not a function ABI.
fn function_signature(func_abi: &Value) -> Option<String> {
    if func_abi.get("type").and_then(Value::as_str) != Some("function") {
        warn!("ABI item is not a function: {}", func_abi);
        return None;
    }

    let name = match func_abi.get("name").and_then(Value::as_str) {
        Some(n) if !n.is_empty() => n,
        _ => {
            warn!("function ABI missing 'name': {}", func_abi);
            return None;
        }
    };

    let mut input_types = Vec::new();
    if let Some(inputs) = func_abi.get("inputs") {
        let items = match inputs.as_array() {
            Some(items) => items,
            None => {
                warn!("function ABI has invalid 'inputs' format: {}", inputs);
                return None;
            }
        };
        for input in items {
            match input.get("type").and_then(Value::as_str) {
                Some(ty) => input_types.push(ty),
                None => {
                    warn!("invalid input item in ABI: {}", input);
                    return None;
                }
            }
        }
    }

    Some(format!("{}({})", name, input_types.join(",")))
}

/// Derive the 4-byte selector (`0x`-prefixed hex) from a function ABI
/// object, e.g. `{"type":"function","name":"token","inputs":[]}`.
pub fn function_selector(func_abi: &Value) -> Option<String> {
    let signature = function_signature(func_abi)?;
    debug!("derived function signature: {}", signature);
    let selector = &keccak256(signature.as_bytes())[..4];
    Some(format!("0x{}", hex::encode(selector)))
}

/// Build `eth_call` data for a function taking exactly one `address`
/// argument: selector followed by the 32-byte left-padded address.
pub fn call_data_with_address(func_abi: &Value, address: &str) -> Option<String> {
    let signature = function_signature(func_abi)?;
    let selector = &keccak256(signature.as_bytes())[..4];

    let raw = address.strip_prefix("0x").unwrap_or(address);
    if raw.len() != 40 {
        warn!("cannot encode address argument, bad length: {}", address);
        return None;
    }
    let addr_bytes = match hex::decode(raw) {
        Ok(b) => b,
        Err(_) => {
            warn!("cannot encode address argument, non-hex: {}", address);
            return None;
        }
    };

    let mut data = Vec::with_capacity(4 + 32);
    data.extend_from_slice(selector);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&addr_bytes);
    Some(format!("0x{}", hex::encode(data)))
}

/// EIP-55 checksum an address. Accepts the address with or without the
/// `0x` prefix, in any letter case.
pub fn checksum_address(address: &str) -> Option<String> {
    let raw = address.strip_prefix("0x").unwrap_or(address).to_lowercase();
    if raw.len() != 40 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let hash = keccak256(raw.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in raw.chars().enumerate() {
        let nibble = if i % 2 == 0 { hash[i / 2] >> 4 } else { hash[i / 2] & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Decode a single `address` return value from an `eth_call` result.
/// The result must be at least one full 32-byte word; the address is the
/// low 20 bytes of the first word. Returns the checksummed address.
pub fn decode_address(result: &str) -> Option<String> {
    if !result.starts_with("0x") || result.len() < 66 {
        warn!("invalid eth_call result for address decoding: {}", result);
        return None;
    }
    let word = &result[2..66];
    if !word.bytes().all(|b| b.is_ascii_hexdigit()) {
        warn!("non-hex eth_call result for address decoding: {}", result);
        return None;
    }
    checksum_address(&word[24..64])
}

/// Decode a `uint256` return value into a `u128`. Returns `None` for
/// malformed results and for values that do not fit.
pub fn decode_uint256(result: &str) -> Option<u128> {
    let digits = result.strip_prefix("0x")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Some(0);
    }
    if significant.len() > 32 {
        warn!("uint256 result does not fit in u128: {}", result);
        return None;
    }
    u128::from_str_radix(significant, 16).ok()
}

/// Decode a unix timestamp (`uint256`) from an `eth_call` result.
///
/// Returns `Some(0)` for a zero word (valid but empty), and `None` both
/// for malformed results and for values above [`MAX_PLAUSIBLE_TIMESTAMP`]
/// (a hash or other non-date garbage).
pub fn decode_timestamp(result: &str) -> Option<i64> {
    if !result.starts_with("0x") {
        warn!("invalid eth_call result for timestamp decoding: {}", result);
        return None;
    }
    let value = decode_uint256(result)?;
    if value == 0 {
        debug!("eth_call returned a zero timestamp");
        return Some(0);
    }
    if value > MAX_PLAUSIBLE_TIMESTAMP as u128 {
        warn!("decoded timestamp {} is too large to be a date", value);
        return None;
    }
    Some(value as i64)
}

/// Interpret an `eth_getCode` result. `true` means the account provably
/// has no code (destroyed contract or EOA). An absent or malformed
/// result is *not* proof of emptiness and yields `false`, so the caller
/// retries on a later cycle.
pub fn is_code_empty(code_result: Option<&str>) -> bool {
    let code = match code_result {
        Some(c) => c,
        None => return false,
    };
    if code == "0x" {
        return true;
    }
    let digits = match code.strip_prefix("0x") {
        Some(d) => d,
        None => {
            warn!("is_code_empty received a non-hex value: {}", code);
            return false;
        }
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        warn!("is_code_empty received a non-hex value: {}", code);
        return false;
    }
    digits.bytes().all(|b| b == b'0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selector_of_known_functions() {
        let transfer = json!({
            "type": "function",
            "name": "transfer",
            "inputs": [{"type": "address"}, {"type": "uint256"}]
        });
        assert_eq!(function_selector(&transfer).unwrap(), "0xa9059cbb");

        let balance_of = json!({
            "type": "function",
            "name": "balanceOf",
            "inputs": [{"type": "address"}]
        });
        assert_eq!(function_selector(&balance_of).unwrap(), "0x70a08231");

        let no_inputs = json!({"type": "function", "name": "token", "inputs": []});
        assert_eq!(function_selector(&no_inputs).unwrap(), "0xfc0c546a");
    }

    #[test]
    fn selector_rejects_non_functions() {
        assert!(function_selector(&json!({"type": "event", "name": "Claimed"})).is_none());
        assert!(function_selector(&json!({"type": "function", "inputs": []})).is_none());
        assert!(function_selector(&json!({
            "type": "function",
            "name": "claim",
            "inputs": [{"name": "proof"}]
        }))
        .is_none());
    }

    #[test]
    fn call_data_pads_the_address() {
        let balance_of = json!({
            "type": "function",
            "name": "balanceOf",
            "inputs": [{"type": "address"}]
        });
        let data = call_data_with_address(
            &balance_of,
            "0x1111111111111111111111111111111111111111",
        )
        .unwrap();
        let expected = format!(
            "0x70a08231{}{}",
            "0".repeat(24),
            "1111111111111111111111111111111111111111"
        );
        assert_eq!(data, expected);
    }

    #[test]
    fn checksum_matches_reference_vectors() {
        assert_eq!(
            checksum_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
        assert_eq!(
            checksum_address("FB6916095CA1DF60BB79CE92CE3EA74C37C5D359").unwrap(),
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"
        );
        assert!(checksum_address("0x1234").is_none());
        assert!(checksum_address("0xzz6916095ca1df60bb79ce92ce3ea74c37c5d359").is_none());
    }

    #[test]
    fn decodes_address_from_call_result() {
        let word = format!(
            "0x{}{}",
            "0".repeat(24),
            "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
        );
        assert_eq!(
            decode_address(&word).unwrap(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
        assert!(decode_address("0x1234").is_none());
        assert!(decode_address("").is_none());
    }

    #[test]
    fn timestamp_bounds() {
        assert_eq!(decode_timestamp("0x5f5e100"), Some(100_000_000));
        let zero_word = format!("0x{}", "0".repeat(64));
        assert_eq!(decode_timestamp(&zero_word), Some(0));
        // A hash-sized value is rejected rather than stored as a date.
        let garbage = format!("0x{}", "f".repeat(64));
        assert_eq!(decode_timestamp(&garbage), None);
        assert_eq!(decode_timestamp("0x"), None);
        assert_eq!(decode_timestamp("nonsense"), None);
        // Exactly the bound is still implausible only when above it.
        assert_eq!(decode_timestamp("0x2540be400"), Some(10_000_000_000));
        assert_eq!(decode_timestamp("0x2540be401"), None);
    }

    #[test]
    fn uint256_decoding() {
        assert_eq!(decode_uint256("0x0"), Some(0));
        assert_eq!(decode_uint256("0xde0b6b3a7640000"), Some(1_000_000_000_000_000_000));
        assert_eq!(decode_uint256("0x"), None);
        let too_big = format!("0x{}", "f".repeat(40));
        assert_eq!(decode_uint256(&too_big), None);
    }

    proptest::proptest! {
        #[test]
        fn checksum_preserves_the_address_digits(raw in "[0-9a-f]{40}") {
            let checksummed = checksum_address(&raw).unwrap();
            proptest::prop_assert!(checksummed.starts_with("0x"));
            proptest::prop_assert_eq!(checksummed[2..].to_lowercase(), raw.clone());
            // Checksumming is idempotent.
            proptest::prop_assert_eq!(checksum_address(&checksummed).unwrap(), checksummed);
        }
    }

    #[test]
    fn empty_code_interpretation() {
        assert!(is_code_empty(Some("0x")));
        assert!(is_code_empty(Some("0x0")));
        assert!(is_code_empty(Some("0x000000")));
        assert!(!is_code_empty(Some("0x6080604052")));
        assert!(!is_code_empty(None));
        assert!(!is_code_empty(Some("0xzz")));
        assert!(!is_code_empty(Some("not-hex")));
    }
}
