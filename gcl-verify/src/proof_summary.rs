//! Per-condition proof summaries.
//!
//! Every verification condition sent to the prover gets one summary:
//! - which proof step it discharges (`claim`)
//! - the condition itself in surface notation
//! - what the prover answered

use serde::Serialize;

use crate::diagnostics::frame_message;
use crate::wp::Obligation;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProofSummary {
    /// `vc-1`, `vc-2`, ... in submission order
    pub id: String,
    pub claim: String,
    pub condition: String,
    pub result: ProofResult,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProofResult {
    Proved,
    Failed { reason: String },
}

impl ProofResult {
    pub fn is_proved(&self) -> bool {
        matches!(self, ProofResult::Proved)
    }
}

impl ProofSummary {
    pub fn new(index: usize, obligation: &Obligation, valid: bool) -> Self {
        let claim = obligation
            .context
            .first()
            .map(frame_message)
            .unwrap_or_else(|| "verification condition".to_string());
        let result = if valid {
            ProofResult::Proved
        } else {
            ProofResult::Failed {
                reason: "the prover found the condition invalid".to_string(),
            }
        };
        Self {
            id: format!("vc-{}", index + 1),
            claim,
            condition: obligation.predicate.to_string(),
            result,
        }
    }
}

/// One line per summary, e.g. `vc-2: PROVED`.
pub fn format_summary(summaries: &[ProofSummary]) -> String {
    let mut out = String::new();
    for s in summaries {
        let status = match &s.result {
            ProofResult::Proved => "PROVED".to_string(),
            ProofResult::Failed { reason } => format!("FAILED ({reason})"),
        };
        out.push_str(&format!("{}: {status}\n  {}\n  {}\n", s.id, s.claim, s.condition));
    }
    out
}
