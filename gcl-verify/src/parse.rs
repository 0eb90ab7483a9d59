//! The seam to the surface-syntax front end.
//!
//! Verification never re-validates syntax: a [`SourceParser`] either hands
//! over a well-formed tree or a list of located syntax errors.

use gcl_ast::{IntExpr, Predicate, Program, Statement};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    pub row: usize,
    pub col: usize,
    pub message: String,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.row, self.col, self.message)
    }
}

pub trait SourceParser {
    fn parse_program(&self, text: &str) -> Result<Program, Vec<SyntaxError>>;
    fn parse_predicate(&self, text: &str) -> Result<Predicate, Vec<SyntaxError>>;
    fn parse_int_expr(&self, text: &str) -> Result<IntExpr, Vec<SyntaxError>>;
}

/// Reads trees that an external front end already serialized as JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonAstParser;

#[derive(Deserialize)]
#[serde(untagged)]
enum ProgramJson {
    Program(Program),
    Statements(Vec<Statement>),
}

fn from_json<T: DeserializeOwned>(text: &str) -> Result<T, Vec<SyntaxError>> {
    serde_json::from_str(text).map_err(|e| {
        vec![SyntaxError {
            row: e.line(),
            col: e.column(),
            message: e.to_string(),
        }]
    })
}

impl SourceParser for JsonAstParser {
    fn parse_program(&self, text: &str) -> Result<Program, Vec<SyntaxError>> {
        Ok(match from_json::<ProgramJson>(text)? {
            ProgramJson::Program(p) => p,
            ProgramJson::Statements(s) => Program::new(s),
        })
    }

    fn parse_predicate(&self, text: &str) -> Result<Predicate, Vec<SyntaxError>> {
        from_json(text)
    }

    fn parse_int_expr(&self, text: &str) -> Result<IntExpr, Vec<SyntaxError>> {
        from_json(text)
    }
}
