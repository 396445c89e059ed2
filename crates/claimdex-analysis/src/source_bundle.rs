//! Canonical source bundles.
//!
//! Providers hand back verified source in three shapes: the doubled-
//! brace multi-file envelope (`{{...}}`), a plain JSON compiler input
//! (`{...}`), or a bare single file. The pipeline stores exactly one
//! canonical form: a JSON object with either a `sources` map or a
//! single `source` string.

use serde_json::{json, Value};
use tracing::warn;

use crate::error::AnalysisError;

/// Canonicalize raw provider source into the stored JSON form.
///
/// A payload that *looks* like JSON but fails to parse is a structural
/// error: the caller aborts its batch rather than storing garbage.
pub fn canonicalize_source(raw: &str) -> Result<String, AnalysisError> {
    let trimmed = raw.trim();

    if trimmed.starts_with("{{") && trimmed.ends_with("}}") {
        // Doubled-brace envelope: strip exactly one brace layer.
        let inner = &trimmed[1..trimmed.len() - 1];
        return match serde_json::from_str::<Value>(inner) {
            Ok(_) => Ok(inner.to_string()),
            Err(e) => Err(AnalysisError::SourceFormat(format!(
                "invalid JSON inside doubled-brace envelope: {}",
                e
            ))),
        };
    }

    if trimmed.starts_with('{') {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(_) => Ok(trimmed.to_string()),
            Err(e) => Err(AnalysisError::SourceFormat(format!(
                "source starts with '{{' but is not valid JSON: {}",
                e
            ))),
        };
    }

    Ok(json!({ "source": trimmed }).to_string())
}

/// Flatten a canonical bundle into one string for the LLM: multi-file
/// bundles are concatenated with file markers, single files pass
/// through. An unparseable bundle is sent raw rather than dropped.
pub fn flatten_source(canonical: &str) -> String {
    let data: Value = match serde_json::from_str(canonical) {
        Ok(v) => v,
        Err(_) => {
            warn!("failed to parse canonical source for flattening, sending raw");
            return canonical.to_string();
        }
    };

    if let Some(source) = data.get("source").and_then(Value::as_str) {
        return source.to_string();
    }

    if let Some(sources) = data.get("sources").and_then(Value::as_object) {
        let mut out = String::new();
        for (path, entry) in sources {
            out.push_str(&format!("// --- File: {} ---\n\n", path));
            out.push_str(entry.get("content").and_then(Value::as_str).unwrap_or(""));
            out.push_str("\n\n");
        }
        return out;
    }

    warn!("unknown canonical source structure, sending raw");
    canonical.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubled_braces_lose_one_layer() {
        let raw = r#"{{"sources":{"A.sol":{"content":"X"}}}}"#;
        assert_eq!(
            canonicalize_source(raw).unwrap(),
            r#"{"sources":{"A.sol":{"content":"X"}}}"#
        );
    }

    #[test]
    fn plain_json_passes_through() {
        let raw = r#"{"sources":{"A.sol":{"content":"pragma"}}}"#;
        assert_eq!(canonicalize_source(raw).unwrap(), raw);
    }

    #[test]
    fn bare_source_is_wrapped() {
        let canonical = canonicalize_source("pragma solidity ^0.8.0;").unwrap();
        let parsed: Value = serde_json::from_str(&canonical).unwrap();
        assert_eq!(parsed["source"].as_str(), Some("pragma solidity ^0.8.0;"));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let raw = "  {\"source\": \"x\"}  \n";
        assert_eq!(canonicalize_source(raw).unwrap(), "{\"source\": \"x\"}");
    }

    #[test]
    fn broken_json_aborts() {
        assert!(matches!(
            canonicalize_source(r#"{{"sources": }}"#),
            Err(AnalysisError::SourceFormat(_))
        ));
        assert!(matches!(
            canonicalize_source(r#"{"sources": "#),
            Err(AnalysisError::SourceFormat(_))
        ));
    }

    #[test]
    fn flatten_single_file() {
        assert_eq!(flatten_source(r#"{"source":"contract A {}"}"#), "contract A {}");
    }

    #[test]
    fn flatten_multi_file_adds_markers() {
        let canonical = r#"{"sources":{"A.sol":{"content":"aaa"},"B.sol":{"content":"bbb"}}}"#;
        let flat = flatten_source(canonical);
        assert!(flat.contains("// --- File: A.sol ---\n\naaa"));
        assert!(flat.contains("// --- File: B.sol ---\n\nbbb"));
    }

    #[test]
    fn flatten_falls_back_to_raw() {
        assert_eq!(flatten_source("not json"), "not json");
        assert_eq!(flatten_source(r#"{"other": 1}"#), r#"{"other": 1}"#);
    }
}
