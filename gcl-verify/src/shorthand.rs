//! Shorthand macros: named predicate or integer templates expanded before
//! weakest preconditions are computed.
//!
//! Shorthands are expanded into each other's bodies `N - 1` times for `N`
//! definitions, so a chain of references resolves fully while a recursive
//! definition stays finite. Calls to names that are not shorthands are left
//! alone as uninterpreted functions.

use std::collections::BTreeSet;

use gcl_ast::{
    Assign, Expr, GuardedCommands, IntExpr, Names, Predicate, Program, Quantified, Statement,
    Variable,
};
use serde::{Deserialize, Serialize};

use crate::error::ShorthandError;
use crate::parse::SourceParser;
use crate::subst::{Substitutable, Substitution};
use crate::wp::{LoopSpec, Spec};

/// A shorthand as written in a verification request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShorthandDef {
    pub name: String,
    pub args: Vec<String>,
    pub definition: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Body {
    Predicate(Predicate),
    Int(IntExpr),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shorthand {
    pub name: String,
    pub params: Vec<String>,
    pub body: Body,
}

#[derive(Clone, Debug, Default)]
pub struct Shorthands {
    defs: Vec<Shorthand>,
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn join(names: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    names
        .into_iter()
        .map(|n| n.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Shorthand {
    /// Parses and checks one definition. The body is read as a predicate
    /// first and as an integer expression if that fails.
    pub fn define(def: &ShorthandDef, parser: &dyn SourceParser) -> Result<Self, ShorthandError> {
        if let Some(arg) = def.args.iter().find(|a| !is_identifier(a)) {
            return Err(ShorthandError::BadParameter {
                shorthand: def.name.clone(),
                arg: arg.clone(),
            });
        }

        let body = match parser.parse_predicate(&def.definition) {
            Ok(p) => Body::Predicate(p),
            Err(_) => match parser.parse_int_expr(&def.definition) {
                Ok(e) => Body::Int(e),
                Err(_) => {
                    return Err(ShorthandError::Undefinable {
                        shorthand: def.name.clone(),
                    });
                }
            },
        };

        let params: BTreeSet<&str> = def.args.iter().map(String::as_str).collect();
        let used = match &body {
            Body::Predicate(p) => p.free_names(),
            Body::Int(e) => e.free_names(),
        };
        if !params.iter().copied().eq(used.iter().map(String::as_str)) {
            return Err(ShorthandError::ParameterMismatch {
                shorthand: def.name.clone(),
                params: join(&params),
                used: join(&used),
            });
        }

        Ok(Self {
            name: def.name.clone(),
            params: def.args.clone(),
            body,
        })
    }

    fn substitution(&self, args: &[Expr]) -> Result<Substitution, ShorthandError> {
        if args.len() != self.params.len() {
            return Err(ShorthandError::Arity {
                shorthand: self.name.clone(),
                expected: self.params.len(),
                given: args.len(),
            });
        }
        let names: Vec<Variable> = self.params.iter().map(Variable::name).collect();
        Substitution::new(&names, args).map_err(|source| self.subst_error(source))
    }

    fn subst_error(&self, source: crate::error::SubstError) -> ShorthandError {
        ShorthandError::Subst {
            shorthand: self.name.clone(),
            source,
        }
    }
}

impl Shorthands {
    pub fn define(defs: &[ShorthandDef], parser: &dyn SourceParser) -> Result<Self, ShorthandError> {
        let mut out = Self {
            defs: defs
                .iter()
                .map(|d| Shorthand::define(d, parser))
                .collect::<Result<_, _>>()?,
        };
        for _ in 1..out.defs.len() {
            let current = out.clone();
            for def in &mut out.defs {
                def.body = match &def.body {
                    Body::Predicate(p) => Body::Predicate(current.predicate(p)?),
                    Body::Int(e) => Body::Int(current.int_expr(e)?),
                };
            }
        }
        Ok(out)
    }

    pub fn get(&self, name: &str) -> Option<&Shorthand> {
        self.defs.iter().find(|d| d.name == name)
    }

    /// Expands every shorthand in the pre- and postcondition and in each
    /// invariant and bound.
    pub fn spec(&self, spec: &Spec) -> Result<Spec, ShorthandError> {
        Ok(Spec {
            precondition: self.predicate(&spec.precondition)?,
            postcondition: self.predicate(&spec.postcondition)?,
            loops: spec
                .loops
                .iter()
                .map(|l| -> Result<LoopSpec, ShorthandError> {
                    Ok(LoopSpec {
                        invariant: self.predicate(&l.invariant)?,
                        bound: self.int_expr(&l.bound)?,
                    })
                })
                .collect::<Result<_, ShorthandError>>()?,
        })
    }

    pub fn program(&self, program: &Program) -> Result<Program, ShorthandError> {
        Ok(Program::new(self.statements(&program.statements)?))
    }

    fn statements(&self, statements: &[Statement]) -> Result<Vec<Statement>, ShorthandError> {
        statements.iter().map(|s| self.statement(s)).collect()
    }

    fn statement(&self, stmt: &Statement) -> Result<Statement, ShorthandError> {
        Ok(match stmt {
            Statement::Abort { .. } | Statement::Skip { .. } => stmt.clone(),
            Statement::Assign(a) => Statement::Assign(Assign {
                lvalues: a
                    .lvalues
                    .iter()
                    .map(|v| self.variable(v))
                    .collect::<Result<_, _>>()?,
                rvalues: a
                    .rvalues
                    .iter()
                    .map(|e| self.expr(e))
                    .collect::<Result<_, _>>()?,
                range: a.range,
            }),
            Statement::If(g) => Statement::If(self.guarded(g)?),
            Statement::Do(g) => Statement::Do(self.guarded(g)?),
        })
    }

    fn guarded(&self, g: &GuardedCommands) -> Result<GuardedCommands, ShorthandError> {
        Ok(GuardedCommands {
            guards: g
                .guards
                .iter()
                .map(|p| self.predicate(p))
                .collect::<Result<_, _>>()?,
            commands: g
                .commands
                .iter()
                .map(|c| self.statements(c))
                .collect::<Result<_, _>>()?,
            range: g.range,
        })
    }

    fn expand_call<T>(&self, name: &str, args: &[Expr], body: &T) -> Result<T::Output, ShorthandError>
    where
        T: Substitutable,
    {
        let shorthand = self.get(name).ok_or_else(|| ShorthandError::Undefinable {
            shorthand: name.to_string(),
        })?;
        shorthand
            .substitution(args)?
            .apply(body)
            .map_err(|e| shorthand.subst_error(e))
    }

    fn args(&self, args: &[Expr]) -> Result<Vec<Expr>, ShorthandError> {
        args.iter().map(|a| self.expr(a)).collect()
    }

    pub fn predicate(&self, p: &Predicate) -> Result<Predicate, ShorthandError> {
        Ok(match p {
            Predicate::Const { .. } => p.clone(),
            Predicate::Not { inner } => Predicate::not(self.predicate(inner)?),
            Predicate::Binary { op, left, right } => {
                Predicate::binary(*op, self.predicate(left)?, self.predicate(right)?)
            }
            Predicate::Comp { op, left, right } => {
                Predicate::comp(*op, self.int_expr(left)?, self.int_expr(right)?)
            }
            Predicate::Call { name, args } => {
                let args = self.args(args)?;
                match self.get(name) {
                    Some(Shorthand {
                        body: Body::Predicate(body),
                        ..
                    }) => self.expand_call(name, &args, body)?,
                    _ => Predicate::Call {
                        name: name.clone(),
                        args,
                    },
                }
            }
            Predicate::Perm { arr1, arr2, n } => Predicate::Perm {
                arr1: self.variable(arr1)?,
                arr2: self.variable(arr2)?,
                n: Box::new(self.int_expr(n)?),
            },
            Predicate::Forall(q) => Predicate::Forall(self.binder(q, Self::predicate)?),
            Predicate::Exists(q) => Predicate::Exists(self.binder(q, Self::predicate)?),
        })
    }

    pub fn int_expr(&self, e: &IntExpr) -> Result<IntExpr, ShorthandError> {
        Ok(match e {
            IntExpr::Const { .. } => e.clone(),
            IntExpr::Var { var } => IntExpr::var(self.variable(var)?),
            IntExpr::Negate { inner } => IntExpr::negate(self.int_expr(inner)?),
            IntExpr::Binary { op, left, right } => {
                IntExpr::binary(*op, self.int_expr(left)?, self.int_expr(right)?)
            }
            IntExpr::Call { name, args } => {
                let args = self.args(args)?;
                match self.get(name) {
                    Some(Shorthand {
                        body: Body::Int(body),
                        ..
                    }) => self.expand_call(name, &args, body)?,
                    _ => IntExpr::Call {
                        name: name.clone(),
                        args,
                    },
                }
            }
            IntExpr::Sum(q) => IntExpr::Sum(self.binder(q, Self::int_expr)?),
            IntExpr::Prod(q) => IntExpr::Prod(self.binder(q, Self::int_expr)?),
            IntExpr::Count(q) => IntExpr::Count(self.binder(q, Self::predicate)?),
        })
    }

    fn variable(&self, v: &Variable) -> Result<Variable, ShorthandError> {
        Ok(match v {
            Variable::Name { .. } => v.clone(),
            Variable::Select { base, selector } => {
                Variable::select(self.variable(base)?, self.int_expr(selector)?)
            }
            Variable::Store {
                base,
                selector,
                value,
            } => Variable::store(
                self.variable(base)?,
                self.int_expr(selector)?,
                self.expr(value)?,
            ),
        })
    }

    fn expr(&self, e: &Expr) -> Result<Expr, ShorthandError> {
        Ok(match e {
            Expr::Map(v) => Expr::Map(self.variable(v)?),
            Expr::Int(i) => Expr::Int(self.int_expr(i)?),
        })
    }

    fn binder<B>(
        &self,
        q: &Quantified<B>,
        inner: fn(&Self, &B) -> Result<B, ShorthandError>,
    ) -> Result<Quantified<B>, ShorthandError> {
        Ok(Quantified::new(
            q.bound_var.clone(),
            self.predicate(&q.condition)?,
            inner(self, &q.inner)?,
        ))
    }
}
