//! Request orchestration: parse, expand shorthands, generate and lower the
//! verification conditions, run the prover, map failures back to source.

use gcl_ast::{IntExpr, Predicate, Program};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::axioms::AxiomRegistry;
use crate::diagnostics::SemanticError;
use crate::error::VerifyError;
use crate::normalize::normalize_program;
use crate::parse::{SourceParser, SyntaxError};
use crate::proof_summary::ProofSummary;
use crate::shorthand::{ShorthandDef, Shorthands};
use crate::solver::Prover;
use crate::wp::{LoopSpec, Obligation, Spec, generate};

/// A tree-valued request field: either the parser's input text or, for
/// convenience, the JSON tree inline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceField(pub Value);

impl SourceField {
    pub fn text(&self) -> String {
        match &self.0 {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl From<&str> for SourceField {
    fn from(text: &str) -> Self {
        Self(Value::String(text.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopSource {
    pub invariant: SourceField,
    #[serde(alias = "bound")]
    pub variant: SourceField,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShorthandSource {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub definition: SourceField,
}

/// One verification request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskSource {
    pub precondition: SourceField,
    pub postcondition: SourceField,
    #[serde(default)]
    pub loops: Vec<LoopSource>,
    #[serde(default)]
    pub axioms: Vec<String>,
    #[serde(default)]
    pub shorthands: Vec<ShorthandSource>,
    pub code: SourceField,
}

/// Result of a request: syntax errors, or the semantic errors left after
/// proving (empty when everything was proved).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    ParsingErrors(Vec<SyntaxError>),
    SemanticErrors(Vec<SemanticError>),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::SemanticErrors(errs) if errs.is_empty())
    }
}

/// Everything needed to call the prover.
#[derive(Clone, Debug)]
pub struct Batch {
    pub obligations: Vec<Obligation>,
    pub formulas: Vec<String>,
    pub definitions: Vec<String>,
}

impl Batch {
    /// Axiom definitions followed by one formula per line.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for def in self.definitions.iter().chain(&self.formulas) {
            out.push_str(def.trim_end());
            out.push('\n');
        }
        out
    }
}

#[derive(Clone, Debug)]
pub enum Prepared {
    Ready(Batch),
    /// Rejected before the prover was needed.
    Rejected(Outcome),
}

#[derive(Clone, Debug, Serialize)]
pub struct Verification {
    pub outcome: Outcome,
    pub proofs: Vec<ProofSummary>,
}

struct Parsed {
    spec: Spec,
    program: Program,
}

fn collect<T>(
    result: Result<T, Vec<SyntaxError>>,
    errors: &mut Vec<SyntaxError>,
) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(mut e) => {
            errors.append(&mut e);
            None
        }
    }
}

fn parse_task(task: &TaskSource, parser: &dyn SourceParser) -> Result<Parsed, Vec<SyntaxError>> {
    let mut errors = Vec::new();
    let pre = collect(parser.parse_predicate(&task.precondition.text()), &mut errors);
    let post = collect(parser.parse_predicate(&task.postcondition.text()), &mut errors);
    let mut loops = Vec::new();
    for l in &task.loops {
        let invariant: Option<Predicate> =
            collect(parser.parse_predicate(&l.invariant.text()), &mut errors);
        let bound: Option<IntExpr> = collect(parser.parse_int_expr(&l.variant.text()), &mut errors);
        if let (Some(invariant), Some(bound)) = (invariant, bound) {
            loops.push(LoopSpec { invariant, bound });
        }
    }
    let program = collect(parser.parse_program(&task.code.text()), &mut errors);

    match (pre, post, program) {
        (Some(precondition), Some(postcondition), Some(program)) if errors.is_empty() => Ok(Parsed {
            spec: Spec {
                precondition,
                postcondition,
                loops,
            },
            program,
        }),
        _ => Err(errors),
    }
}

/// Runs everything up to, but not including, the prover.
pub fn prepare(
    task: &TaskSource,
    parser: &dyn SourceParser,
    axioms: &AxiomRegistry,
) -> Result<Prepared, VerifyError> {
    let Parsed { spec, program } = match parse_task(task, parser) {
        Ok(parsed) => parsed,
        Err(errors) => {
            info!(errors = errors.len(), "request has syntax errors");
            return Ok(Prepared::Rejected(Outcome::ParsingErrors(errors)));
        }
    };

    let loops = program.count_loops();
    if loops != spec.loops.len() {
        info!(loops, specs = spec.loops.len(), "loop specification count mismatch");
        return Ok(Prepared::Rejected(Outcome::SemanticErrors(vec![
            SemanticError::loop_count_mismatch(program.range(), loops, spec.loops.len()),
        ])));
    }

    let defs: Vec<ShorthandDef> = task
        .shorthands
        .iter()
        .map(|s| ShorthandDef {
            name: s.name.clone(),
            args: s.args.clone(),
            definition: s.definition.text(),
        })
        .collect();
    let shorthands = Shorthands::define(&defs, parser)?;
    let spec = shorthands.spec(&spec)?;
    let program = normalize_program(&shorthands.program(&program)?)?;

    let obligations = generate(&spec, &program)?;
    info!(vcs = obligations.len(), "generated verification conditions");

    let enabled = axioms.enable(&task.axioms)?;
    let lowering = enabled.lowering();
    let formulas = obligations
        .iter()
        .map(|o| {
            debug!(vc = %o.predicate, "verification condition");
            lowering.predicate(&o.predicate)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Prepared::Ready(Batch {
        obligations,
        formulas,
        definitions: enabled.definitions().map(str::to_string).collect(),
    }))
}

/// Verifies one request end to end.
pub fn verify_task(
    task: &TaskSource,
    parser: &dyn SourceParser,
    axioms: &AxiomRegistry,
    prover: &mut dyn Prover,
) -> Result<Verification, VerifyError> {
    let batch = match prepare(task, parser, axioms)? {
        Prepared::Ready(batch) => batch,
        Prepared::Rejected(outcome) => {
            return Ok(Verification {
                outcome,
                proofs: Vec::new(),
            });
        }
    };

    let verdicts = prover.prove(&batch.text(), batch.formulas.len())?;
    let proofs: Vec<ProofSummary> = batch
        .obligations
        .iter()
        .zip(&verdicts)
        .enumerate()
        .map(|(i, (o, valid))| ProofSummary::new(i, o, *valid))
        .collect();
    let errors: Vec<SemanticError> = batch
        .obligations
        .iter()
        .zip(&verdicts)
        .filter(|(_, valid)| !**valid)
        .map(|(o, _)| SemanticError::unproved(o))
        .collect();
    info!(
        proved = proofs.len() - errors.len(),
        failed = errors.len(),
        "prover finished"
    );

    Ok(Verification {
        outcome: Outcome::SemanticErrors(errors),
        proofs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_accept_text_or_inline_json() {
        let task: TaskSource = serde_json::from_str(
            r#"{
                "precondition": "{\"type\": \"const\", \"const\": true}",
                "postcondition": {"type": "const", "const": true},
                "code": []
            }"#,
        )
        .expect("task");
        assert_eq!(task.precondition.text(), r#"{"type": "const", "const": true}"#);
        assert_eq!(task.postcondition.text(), r#"{"const":true,"type":"const"}"#);
        assert!(task.loops.is_empty() && task.axioms.is_empty());
    }

    #[test]
    fn batch_puts_definitions_first() {
        let batch = Batch {
            obligations: Vec::new(),
            formulas: vec!["TRUE".to_string()],
            definitions: vec!["(BG_PUSH TRUE)\n".to_string()],
        };
        assert_eq!(batch.text(), "(BG_PUSH TRUE)\nTRUE\n");
    }

    #[test]
    fn success_means_no_errors() {
        assert!(Outcome::SemanticErrors(Vec::new()).is_success());
        assert!(!Outcome::ParsingErrors(Vec::new()).is_success());
    }
}
