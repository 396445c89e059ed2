//! Static-analyzer subprocess wrapper.
//!
//! Unpacks a canonical source bundle into a fresh temp directory,
//! invokes the analyzer (`slither . --json -`) with that directory as
//! its working directory, and classifies the JSON report on a 5-level
//! scale. Each run gets its own directory; cleanup happens on drop no
//! matter how the run ends.

use std::path::{Component, Path, PathBuf};

use serde_json::{json, Value};
use tokio::process::Command;
use tracing::{debug, error, warn};

use crate::error::AnalysisError;

pub struct StaticAnalyzer {
    command: String,
}

impl Default for StaticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticAnalyzer {
    pub fn new() -> Self {
        Self::with_command("slither")
    }

    pub fn with_command(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }

    /// Analyze a canonical source bundle. Never fails outright: every
    /// problem (bad bundle, traversal attempt, tool crash, unparseable
    /// output) is folded into a `{success: false, ...}` report, which
    /// classifies as "did not compile".
    pub async fn analyze(&self, canonical_source: &str) -> Value {
        let temp = match tempfile::tempdir() {
            Ok(t) => t,
            Err(e) => return failure_report(&format!("failed to create temp dir: {}", e)),
        };

        let root = match temp.path().canonicalize() {
            Ok(p) => p,
            Err(e) => return failure_report(&format!("failed to resolve temp dir: {}", e)),
        };

        if let Err(e) = prepare_source_files(&root, canonical_source) {
            error!("failed to prepare source files: {}", e);
            return failure_report(&format!("failed to prepare source files: {}", e));
        }

        self.run_tool(&root).await
    }

    async fn run_tool(&self, root: &Path) -> Value {
        debug!("running {} in {}", self.command, root.display());
        let output = match Command::new(&self.command)
            .arg(".")
            .args(["--json", "-"])
            .current_dir(root)
            .output()
            .await
        {
            Ok(o) => o,
            Err(e) => return failure_report(&format!("failed to run analyzer: {}", e)),
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stderr.is_empty() {
            warn!("analyzer stderr:\n{}", stderr);
        }

        let mut report = if output.stdout.is_empty() {
            warn!("analyzer produced no stdout, exit: {:?}", output.status.code());
            failure_report("empty stdout")
        } else {
            match serde_json::from_slice::<Value>(&output.stdout) {
                Ok(Value::Object(map)) => Value::Object(map),
                Ok(other) => {
                    error!("analyzer output is not a JSON object: {:.200}", other);
                    failure_report("non-object analyzer output")
                }
                Err(e) => {
                    error!("failed to decode analyzer JSON output: {}", e);
                    failure_report("JSON decode error")
                }
            }
        };

        // Normalize the report shape and fold stderr into its error field.
        if report.get("success").is_none() {
            report["success"] = json!(false);
        }
        if report.get("results").is_none() {
            report["results"] = json!({});
        }
        let mut error_text = match report.get("error") {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };
        if !stderr.is_empty() {
            if !error_text.is_empty() {
                error_text.push('\n');
            }
            error_text.push_str("--- stderr ---\n");
            error_text.push_str(&stderr);
        }
        report["error"] = json!(error_text);

        report
    }

    /// Map a report to a `security_analysis_status` and the JSON string
    /// persisted alongside it.
    pub fn classify(&self, report: &Value) -> (i16, String) {
        let mut annotated = report.clone();
        annotated["provider"] = json!("Slither");
        let report_str = json!({ "slither": annotated }).to_string();

        if !report.get("success").and_then(Value::as_bool).unwrap_or(false) {
            return (1, report_str);
        }

        let detectors = match report
            .get("results")
            .and_then(|r| r.get("detectors"))
            .and_then(Value::as_array)
        {
            Some(d) if !d.is_empty() => d,
            _ => return (5, report_str),
        };

        let impacts: Vec<&str> = detectors
            .iter()
            .filter_map(|d| d.get("impact").and_then(Value::as_str))
            .collect();

        if impacts.contains(&"High") {
            return (3, report_str);
        }
        if impacts.contains(&"Medium") {
            return (2, report_str);
        }
        if impacts.contains(&"Low") {
            return (4, report_str);
        }
        (5, report_str)
    }
}

fn failure_report(error: &str) -> Value {
    json!({ "success": false, "error": error, "results": {} })
}

/// Unpack a canonical bundle under `root`. `root` must already be
/// canonicalized so the containment check below is meaningful.
fn prepare_source_files(root: &Path, canonical_source: &str) -> Result<(), AnalysisError> {
    let data: Value = serde_json::from_str(canonical_source)
        .map_err(|e| AnalysisError::SourceFormat(format!("invalid source bundle JSON: {}", e)))?;

    if let Some(source) = data.get("source").and_then(Value::as_str) {
        std::fs::write(root.join("Contract.sol"), source)?;
        return Ok(());
    }

    if let Some(sources) = data.get("sources") {
        let sources = sources.as_object().ok_or_else(|| {
            AnalysisError::SourceFormat("'sources' does not contain an object".into())
        })?;

        for (relative_path, entry) in sources {
            let content = match entry.get("content").and_then(Value::as_str) {
                Some(c) => c,
                None => {
                    warn!("skipping source entry without content: {}", relative_path);
                    continue;
                }
            };

            let target = resolve_under(root, relative_path)
                .ok_or_else(|| AnalysisError::PathTraversal(relative_path.clone()))?;

            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            debug!("writing source file {}", target.display());
            std::fs::write(&target, content)?;
        }
        return Ok(());
    }

    Err(AnalysisError::SourceFormat(
        "expected a 'source' or 'sources' key".into(),
    ))
}

/// Lexically resolve `relative` against `root`, refusing absolute paths
/// and any `..` sequence that would leave `root`.
fn resolve_under(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut out = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
                if !out.starts_with(root) {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.starts_with(root) {
        Some(out)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(success: bool, impacts: &[&str]) -> Value {
        let detectors: Vec<Value> = impacts.iter().map(|i| json!({ "impact": i })).collect();
        json!({ "success": success, "error": "", "results": { "detectors": detectors } })
    }

    #[test]
    fn classification_scale() {
        let analyzer = StaticAnalyzer::new();

        let (status, _) = analyzer.classify(&report(false, &[]));
        assert_eq!(status, 1);

        let (status, _) = analyzer.classify(&report(true, &["High", "Low"]));
        assert_eq!(status, 3);

        let (status, _) = analyzer.classify(&report(true, &["Medium", "Low"]));
        assert_eq!(status, 2);

        let (status, _) = analyzer.classify(&report(true, &["Low", "Informational"]));
        assert_eq!(status, 4);

        let (status, _) = analyzer.classify(&report(true, &[]));
        assert_eq!(status, 5);

        let (status, _) = analyzer.classify(&report(true, &["Informational"]));
        assert_eq!(status, 5);
    }

    #[test]
    fn classified_report_is_wrapped() {
        let analyzer = StaticAnalyzer::new();
        let (_, report_str) = analyzer.classify(&report(true, &[]));
        let wrapped: Value = serde_json::from_str(&report_str).unwrap();
        assert!(wrapped.get("slither").is_some());
        assert_eq!(wrapped["slither"]["provider"].as_str(), Some("Slither"));
    }

    #[test]
    fn single_file_bundle_unpacks() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        prepare_source_files(&root, r#"{"source": "contract A {}"}"#).unwrap();
        let written = std::fs::read_to_string(root.join("Contract.sol")).unwrap();
        assert_eq!(written, "contract A {}");
    }

    #[test]
    fn multi_file_bundle_unpacks_nested_paths() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let bundle = r#"{"sources": {
            "Token.sol": {"content": "token"},
            "lib/utils/Math.sol": {"content": "math"}
        }}"#;
        prepare_source_files(&root, bundle).unwrap();
        assert_eq!(std::fs::read_to_string(root.join("Token.sol")).unwrap(), "token");
        assert_eq!(
            std::fs::read_to_string(root.join("lib/utils/Math.sol")).unwrap(),
            "math"
        );
    }

    #[test]
    fn traversal_attempt_rejects_the_bundle() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let bundle = r#"{"sources": {
            "../../etc/x.sol": {"content": "evil"}
        }}"#;
        let err = prepare_source_files(&root, bundle).unwrap_err();
        assert!(matches!(err, AnalysisError::PathTraversal(_)));
    }

    #[test]
    fn absolute_paths_are_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        assert!(resolve_under(&root, "/etc/x.sol").is_none());
        // Dotted segments that stay inside the root are fine.
        assert!(resolve_under(&root, "a/../b.sol").is_some());
        assert!(resolve_under(&root, "./c.sol").is_some());
        assert!(resolve_under(&root, "a/../../b.sol").is_none());
    }

    #[test]
    fn unknown_bundle_shape_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let err = prepare_source_files(&root, r#"{"files": {}}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::SourceFormat(_)));
    }

    #[tokio::test]
    async fn missing_tool_folds_into_a_failed_report() {
        let analyzer = StaticAnalyzer::with_command("claimdex-no-such-analyzer");
        let report = analyzer.analyze(r#"{"source": "contract A {}"}"#).await;
        assert_eq!(report["success"].as_bool(), Some(false));
        let (status, _) = analyzer.classify(&report);
        assert_eq!(status, 1);
    }
}
