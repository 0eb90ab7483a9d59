//! Rewrites parallel and indexed assignments into a single simultaneous
//! assignment to plain names.
//!
//! `a[i][j], b := x, y` becomes `a, b := (a; i:((a; ...)[i]; j:x)), y`: every
//! element write turns into nested `Store` values over the target map, and
//! several writes into the same map are chained through each other's result.
//! The rewritten assignment is still applied as one substitution, so every
//! selector and rvalue is read in the pre-state.

use gcl_ast::{Assign, Expr, GuardedCommands, IntExpr, Program, Statement, Variable};

use crate::error::SpecError;

/// Splits `a[i][j]` into `("a", [i, j])`.
fn split_target(lvalue: &Variable) -> Result<(&str, Vec<&IntExpr>), SpecError> {
    match lvalue {
        Variable::Name { name } => Ok((name, Vec::new())),
        Variable::Select { base, selector } => {
            let (root, mut selectors) = split_target(base)?;
            selectors.push(selector);
            Ok((root, selectors))
        }
        Variable::Store { .. } => Err(SpecError::new(format!(
            "`{lvalue}` cannot be assigned to"
        ))),
    }
}

/// `current` with the element at `selectors` replaced by `value`.
fn write_through(current: Variable, selectors: &[&IntExpr], value: Expr) -> Expr {
    match selectors.split_first() {
        None => value,
        Some((first, rest)) => {
            let element = Variable::select(current.clone(), (*first).clone());
            let inner = write_through(element, rest, value);
            Expr::Map(Variable::store(current, (*first).clone(), inner))
        }
    }
}

struct Target {
    name: String,
    /// Set when the whole name is assigned rather than one of its elements.
    whole: bool,
    value: Expr,
}

/// Normalizes one assignment. The result assigns each distinct name once.
pub fn normalize_assign(assign: &Assign) -> Result<Assign, SpecError> {
    if assign.lvalues.len() != assign.rvalues.len() {
        return Err(SpecError::at(
            format!(
                "{} targets but {} values in an assignment",
                assign.lvalues.len(),
                assign.rvalues.len()
            ),
            assign.range,
        ));
    }

    for (i, lv) in assign.lvalues.iter().enumerate() {
        if assign.lvalues[..i].contains(lv) {
            return Err(SpecError::at(
                format!("`{lv}` is assigned more than once"),
                assign.range,
            ));
        }
    }

    let mut targets: Vec<Target> = Vec::new();
    for (lv, rv) in assign.lvalues.iter().zip(&assign.rvalues) {
        let (root, selectors) = split_target(lv).map_err(|e| SpecError {
            range: Some(assign.range),
            ..e
        })?;
        let whole = selectors.is_empty();

        match targets.iter_mut().find(|t| t.name == root) {
            Some(existing) => {
                if whole || existing.whole {
                    return Err(SpecError::at(
                        format!("`{root}` and one of its elements are assigned together"),
                        assign.range,
                    ));
                }
                let current = existing.value.as_variable().cloned().ok_or_else(|| {
                    SpecError::at(format!("`{root}` is not a map"), assign.range)
                })?;
                existing.value = write_through(current, &selectors, rv.clone());
            }
            None => {
                let value = write_through(Variable::name(root), &selectors, rv.clone());
                targets.push(Target {
                    name: root.to_string(),
                    whole,
                    value,
                });
            }
        }
    }

    let (lvalues, rvalues) = targets
        .into_iter()
        .map(|t| (Variable::name(t.name), t.value))
        .unzip();
    Ok(Assign {
        lvalues,
        rvalues,
        range: assign.range,
    })
}

/// Normalizes every assignment in the program, at any depth.
pub fn normalize_program(program: &Program) -> Result<Program, SpecError> {
    Ok(Program::new(normalize_statements(&program.statements)?))
}

fn normalize_statements(statements: &[Statement]) -> Result<Vec<Statement>, SpecError> {
    statements.iter().map(normalize_statement).collect()
}

fn normalize_statement(stmt: &Statement) -> Result<Statement, SpecError> {
    Ok(match stmt {
        Statement::Abort { .. } | Statement::Skip { .. } => stmt.clone(),
        Statement::Assign(a) => Statement::Assign(normalize_assign(a)?),
        Statement::If(g) => Statement::If(normalize_guarded(g)?),
        Statement::Do(g) => Statement::Do(normalize_guarded(g)?),
    })
}

fn normalize_guarded(g: &GuardedCommands) -> Result<GuardedCommands, SpecError> {
    Ok(GuardedCommands {
        guards: g.guards.clone(),
        commands: g
            .commands
            .iter()
            .map(|c| normalize_statements(c))
            .collect::<Result<_, _>>()?,
        range: g.range,
    })
}
