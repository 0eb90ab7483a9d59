#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use gcl_ast::TextRange;
use miette::Diagnostic;
use thiserror::Error;

/// A substituted value had the wrong kind for the position it landed in.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum SubstError {
    #[error("attempted to substitute a scalar where a map was expected: `{found}`")]
    #[diagnostic(code(gcl::subst))]
    ScalarForMap { found: String },

    #[error("attempted to substitute a map where an integer was expected: `{found}`")]
    #[diagnostic(code(gcl::subst))]
    MapForScalar { found: String },

    #[error("only plain names can be substituted, got `{found}`")]
    #[diagnostic(code(gcl::subst))]
    NotAName { found: String },

    #[error("{names} names but {exprs} replacement expressions")]
    #[diagnostic(code(gcl::subst))]
    LengthMismatch { names: usize, exprs: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum LowerError {
    #[error("more than one axiom trigger claims this {node_kind}: {axioms}")]
    #[diagnostic(code(gcl::lower))]
    AmbiguousTrigger { node_kind: &'static str, axioms: String },

    #[error("no axiom enables this quantifier: {quantifier}")]
    #[diagnostic(code(gcl::lower), help("enable an axiom that covers this shape, e.g. ARRAY_SUM for `(SUM k : lo <= k < hi : a[k])`"))]
    NoAxiomFor { quantifier: String },

    #[error("a request for an unknown axiom `{0}`")]
    #[diagnostic(code(gcl::lower))]
    UnknownAxiom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ShorthandError {
    #[error("shorthand `{shorthand}`: argument `{arg}` is not a plain name")]
    #[diagnostic(code(gcl::spec))]
    BadParameter { shorthand: String, arg: String },

    #[error(
        "shorthand `{shorthand}`: the names of its arguments ({params}) are not the names used in its definition ({used})"
    )]
    #[diagnostic(code(gcl::spec))]
    ParameterMismatch {
        shorthand: String,
        params: String,
        used: String,
    },

    #[error("shorthand `{shorthand}` expects {expected} arguments, but {given} were given")]
    #[diagnostic(code(gcl::spec))]
    Arity {
        shorthand: String,
        expected: usize,
        given: usize,
    },

    #[error("cannot parse the definition of shorthand `{shorthand}`")]
    #[diagnostic(code(gcl::spec))]
    Undefinable { shorthand: String },

    #[error("shorthand `{shorthand}`: {source}")]
    #[diagnostic(code(gcl::spec))]
    Subst {
        shorthand: String,
        #[source]
        source: SubstError,
    },
}

/// Malformed specification input: spec text, assignment targets, loop bindings.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("specification error: {message}")]
#[diagnostic(code(gcl::spec))]
pub struct SpecError {
    pub message: String,
    pub range: Option<TextRange>,
}

impl SpecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            range: None,
        }
    }

    pub fn at(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range: Some(range),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ProverError {
    #[error("failed to run prover `{command}`: {source}")]
    #[diagnostic(code(gcl::prover))]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("prover `{command}` exited with {status}: {stderr}")]
    #[diagnostic(code(gcl::prover))]
    Exit {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("prover returned {got} verdicts for {expected} verification conditions")]
    #[diagnostic(code(gcl::prover), help("the prover output must contain one `Valid.`/`Invalid.` line per submitted formula"))]
    VerdictCount { expected: usize, got: usize },
}

#[derive(Debug, Error, Diagnostic)]
#[error("failed to read axiom definitions from `{}`", path.display())]
#[diagnostic(code(gcl::config))]
pub struct AxiomDirError {
    pub path: std::path::PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Everything that aborts a verification request.
#[derive(Debug, Error, Diagnostic)]
pub enum VerifyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Subst(#[from] SubstError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lower(#[from] LowerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Shorthand(#[from] ShorthandError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Prover(#[from] ProverError),

    #[error("internal error: {0}")]
    #[diagnostic(code(gcl::internal))]
    Internal(String),
}
