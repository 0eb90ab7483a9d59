#![forbid(unsafe_code)]

use std::path::Path;

use gcl_verify::{Outcome, ProofSummary, Verification};
use miette::IntoDiagnostic;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport<'a> {
    pub schema: &'static str,
    pub input: String,
    pub ok: bool,
    pub outcome: &'a Outcome,
    pub proofs: ProofCounts,
    pub conditions: &'a [ProofSummary],
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProofCounts {
    pub total: usize,
    pub proved: usize,
    pub failed: usize,
}

impl ProofCounts {
    pub fn of(summaries: &[ProofSummary]) -> Self {
        let proved = summaries.iter().filter(|s| s.result.is_proved()).count();
        Self {
            total: summaries.len(),
            proved,
            failed: summaries.len() - proved,
        }
    }
}

pub fn verify_report<'a>(path: &Path, verification: &'a Verification) -> VerifyReport<'a> {
    VerifyReport {
        schema: "gcl.verify.v1",
        input: display_path(path),
        ok: verification.outcome.is_success(),
        outcome: &verification.outcome,
        proofs: ProofCounts::of(&verification.proofs),
        conditions: &verification.proofs,
    }
}

pub fn render_json(path: &Path, verification: &Verification) -> miette::Result<String> {
    serde_json::to_string_pretty(&verify_report(path, verification)).into_diagnostic()
}

pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_run_is_ok() {
        let verification = Verification {
            outcome: Outcome::SemanticErrors(Vec::new()),
            proofs: Vec::new(),
        };
        let json = render_json(Path::new("task.json"), &verification).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["schema"], "gcl.verify.v1");
        assert_eq!(value["ok"], true);
        assert_eq!(value["outcome"]["semanticErrors"], serde_json::json!([]));
        assert_eq!(value["proofs"]["total"], 0);
    }

    #[test]
    fn syntax_errors_are_not_ok() {
        let verification = Verification {
            outcome: Outcome::ParsingErrors(vec![gcl_verify::SyntaxError {
                row: 1,
                col: 2,
                message: "expected value".to_string(),
            }]),
            proofs: Vec::new(),
        };
        let report = verify_report(Path::new("dir\\task.json"), &verification);
        assert!(!report.ok);
        assert_eq!(report.input, "dir/task.json");
    }
}
