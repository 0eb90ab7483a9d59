#![forbid(unsafe_code)]

//! Verification-condition generation for guarded-command programs.
//!
//! The pipeline is: [`shorthand`] expansion, assignment [`normalize`]ation,
//! weakest preconditions ([`wp`]), lowering into prover syntax ([`lower`],
//! with [`axioms`] as triggers) and finally the external [`solver`].
//! [`verify::verify_task`] runs it end to end for one request.

pub mod axioms;
pub mod diagnostics;
pub mod error;
pub mod lower;
pub mod normalize;
pub mod parse;
pub mod proof_summary;
pub mod shorthand;
pub mod solver;
pub mod subst;
pub mod verify;
pub mod wp;

pub use axioms::{Axiom, AxiomRegistry, EnabledAxioms};
pub use diagnostics::{Note, SemanticError};
pub use error::{
    AxiomDirError, LowerError, ProverError, ShorthandError, SpecError, SubstError, VerifyError,
};
pub use lower::{AxiomTrigger, Lowering};
pub use parse::{JsonAstParser, SourceParser, SyntaxError};
pub use proof_summary::{ProofResult, ProofSummary, format_summary};
pub use solver::{Prover, ProverConfig, SimplifyProver};
pub use subst::{Substitutable, Substitution};
pub use verify::{Outcome, TaskSource, Verification, prepare, verify_task};
pub use wp::{LoopSpec, Obligation, Spec, generate};
