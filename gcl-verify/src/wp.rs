//! Verification-condition generation by weakest preconditions.
//!
//! [`generate`] reduces `{Q} S {R}` with the sequence, `if` and `do` proof
//! theorems until only elementary command sequences remain, then turns each
//! of those into `Q => wp(S, R)`. Every emitted predicate carries the chain
//! of [`Frame`]s that produced it.
//!
//! Loop specifications are bound to `do` statements by their textual
//! pre-order position, so `loops[0]` belongs to the first `do` in the source
//! regardless of nesting.

use gcl_ast::{
    Assign, CompOp, GuardedCommands, IntExpr, Predicate, Program, Statement, TextRange,
    range_of,
};
use serde::Serialize;

use crate::error::{SpecError, VerifyError};
use crate::normalize::normalize_assign;
use crate::subst::Substitution;

/// Invariant and bound expression of one loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopSpec {
    pub invariant: Predicate,
    pub bound: IntExpr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spec {
    pub precondition: Predicate,
    pub postcondition: Predicate,
    pub loops: Vec<LoopSpec>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Seq,
    If,
    Do,
}

/// One step of provenance for a generated predicate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub kind: FrameKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u8>,
    /// 1-based branch number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<usize>,
    /// 1-based pre-order number of the loop this frame belongs to.
    #[serde(rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loop_index: Option<usize>,
    /// For step 6: the nested loop whose branch is being checked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested_loop: Option<usize>,
    pub range: TextRange,
}

impl Frame {
    fn new(kind: FrameKind, range: TextRange) -> Self {
        Self {
            kind,
            step: None,
            branch: None,
            loop_index: None,
            nested_loop: None,
            range,
        }
    }

    fn step(mut self, step: u8) -> Self {
        self.step = Some(step);
        self
    }

    fn branch(mut self, branch: usize) -> Self {
        self.branch = Some(branch);
        self
    }

    fn in_loop(mut self, loop_index: usize) -> Self {
        self.loop_index = Some(loop_index);
        self
    }
}

/// A predicate to prove, with its provenance; `context[0]` is the outermost frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Obligation {
    pub predicate: Predicate,
    pub context: Vec<Frame>,
}

/// A command as seen by the generator. Source statements are borrowed so
/// that loops can be matched to their specification by identity.
#[derive(Clone, Debug)]
enum Cmd<'a> {
    Source(&'a Statement),
    /// A rewritten statement that contains no loops.
    Owned(Statement),
    Skip(TextRange),
    /// `name := bound`, recording the bound before a loop branch runs.
    Snapshot {
        name: String,
        bound: IntExpr,
        range: TextRange,
    },
}

impl Cmd<'_> {
    fn statement(&self) -> Option<&Statement> {
        match self {
            Cmd::Source(s) => Some(s),
            Cmd::Owned(s) => Some(s),
            Cmd::Skip(_) | Cmd::Snapshot { .. } => None,
        }
    }

    fn range(&self) -> TextRange {
        match self {
            Cmd::Source(s) => s.range(),
            Cmd::Owned(s) => s.range(),
            Cmd::Skip(range) | Cmd::Snapshot { range, .. } => *range,
        }
    }
}

fn cmds_range(cmds: &[Cmd<'_>]) -> Option<TextRange> {
    let first = cmds.first()?;
    let last = cmds.last()?;
    Some(TextRange::cover(first.range(), last.range()))
}

fn source_cmds(statements: &[Statement]) -> Vec<Cmd<'_>> {
    statements.iter().map(Cmd::Source).collect()
}

/// Copy of `statements` with every `do` removed, keeping `if` structure.
fn strip_loops(statements: &[Statement]) -> Vec<Statement> {
    statements
        .iter()
        .filter_map(|s| match s {
            Statement::Do(_) => None,
            Statement::If(g) => Some(Statement::If(GuardedCommands {
                guards: g.guards.clone(),
                commands: g.commands.iter().map(|c| strip_loops(c)).collect(),
                range: g.range,
            })),
            other => Some(other.clone()),
        })
        .collect()
}

/// Loops nested anywhere in `statements`, in pre-order.
fn nested_loops<'a>(statements: &'a [Statement], out: &mut Vec<&'a GuardedCommands>) {
    for s in statements {
        match s {
            Statement::Do(g) => {
                out.push(g);
                for c in &g.commands {
                    nested_loops(c, out);
                }
            }
            Statement::If(g) => {
                for c in &g.commands {
                    nested_loops(c, out);
                }
            }
            _ => {}
        }
    }
}

fn bound_positive(bound: &IntExpr) -> Predicate {
    Predicate::comp(CompOp::Gt, bound.clone(), IntExpr::constant(0))
}

fn guard_disjunction(guards: &[Predicate]) -> Predicate {
    Predicate::disjunction(guards.iter().cloned()).unwrap_or(Predicate::FALSE)
}

/// Generates the verification conditions for `{spec.precondition} program {spec.postcondition}`.
pub fn generate(spec: &Spec, program: &Program) -> Result<Vec<Obligation>, VerifyError> {
    let mut loops = Vec::new();
    nested_loops(&program.statements, &mut loops);
    if loops.len() != spec.loops.len() {
        return Err(SpecError::at(
            format!(
                "the program has {} loops but {} loop specifications were given",
                loops.len(),
                spec.loops.len()
            ),
            program.range(),
        )
        .into());
    }

    let mut generator = Generator {
        loops,
        specs: &spec.loops,
        snapshots: 0,
        out: Vec::new(),
    };
    let cmds = source_cmds(&program.statements);
    generator.wp(&spec.precondition, &spec.postcondition, &cmds, &[])?;
    Ok(generator.out)
}

struct Generator<'a> {
    loops: Vec<&'a GuardedCommands>,
    specs: &'a [LoopSpec],
    snapshots: usize,
    out: Vec<Obligation>,
}

impl<'a> Generator<'a> {
    fn loop_of(&self, g: &GuardedCommands) -> Result<(usize, &'a LoopSpec), VerifyError> {
        let index = self
            .loops
            .iter()
            .position(|l| std::ptr::eq(*l, g))
            .ok_or_else(|| VerifyError::Internal("loop is not part of the program".to_string()))?;
        let spec = self.specs.get(index).ok_or_else(|| {
            SpecError::at(format!("no specification for loop #{}", index + 1), g.range)
        })?;
        Ok((index + 1, spec))
    }

    fn fresh(&mut self, stem: &str) -> String {
        let name = format!("@{stem}{}", self.snapshots);
        self.snapshots += 1;
        name
    }

    fn emit(&mut self, predicate: Predicate, context: Vec<Frame>) {
        self.out.push(Obligation { predicate, context });
    }

    fn wp(
        &mut self,
        q: &Predicate,
        r: &Predicate,
        cmds: &[Cmd<'a>],
        context: &[Frame],
    ) -> Result<(), VerifyError> {
        if cmds.is_empty() {
            let mut context = context.to_vec();
            if context.is_empty() {
                context.push(Frame::new(FrameKind::Seq, TextRange::default()));
            }
            self.emit(Predicate::implies(q.clone(), r.clone()), context);
            return Ok(());
        }

        let last_loop = cmds.iter().enumerate().rev().find_map(|(at, c)| match c {
            Cmd::Source(s) => match *s {
                Statement::Do(g) => Some((at, g)),
                _ => None,
            },
            _ => None,
        });
        if let Some((at, g)) = last_loop {
            return self.do_theorem(q, r, &cmds[..at], g, &cmds[at + 1..], context);
        }

        let first_if = cmds
            .iter()
            .position(|c| matches!(c.statement(), Some(Statement::If(_))));
        if let Some(at) = first_if {
            return self.if_theorem(q, r, &cmds[..at], &cmds[at], &cmds[at + 1..], context);
        }

        let pre = sequence_wp(cmds, r)?;
        let mut context = context.to_vec();
        context.push(Frame::new(
            FrameKind::Seq,
            cmds_range(cmds).unwrap_or_default(),
        ));
        self.emit(Predicate::implies(q.clone(), pre), context);
        Ok(())
    }

    fn if_theorem(
        &mut self,
        q: &Predicate,
        r: &Predicate,
        before: &[Cmd<'a>],
        stmt: &Cmd<'a>,
        after: &[Cmd<'a>],
        context: &[Frame],
    ) -> Result<(), VerifyError> {
        let range = stmt.range();
        let (guards, branches) = if_parts(stmt)?;
        let before = or_skip(before, range);
        let after = or_skip(after, range);
        let any_guard = guard_disjunction(&guards);

        let frame = Frame::new(FrameKind::If, cmds_range(&before).unwrap_or(range)).step(1);
        self.wp(q, &any_guard, &before, &with(context, frame))?;

        for (i, (guard, body)) in guards.iter().zip(branches).enumerate() {
            // `before` holds no loops or conditionals here, so wp(I, Bi) is elementary.
            let reachable = sequence_wp(&before, guard)?;
            let pre = Predicate::and(q.clone(), reachable);
            let mut cmds = before.clone();
            cmds.extend(body);
            cmds.extend(after.iter().cloned());
            let frame = Frame::new(FrameKind::If, cmds_range(&cmds).unwrap_or(range))
                .step(2)
                .branch(i + 1);
            self.wp(&pre, r, &cmds, &with(context, frame))?;
        }
        Ok(())
    }

    fn do_theorem(
        &mut self,
        q: &Predicate,
        r: &Predicate,
        before: &[Cmd<'a>],
        lp: &'a GuardedCommands,
        after: &[Cmd<'a>],
        context: &[Frame],
    ) -> Result<(), VerifyError> {
        let (index, spec) = self.loop_of(lp)?;
        let p = &spec.invariant;
        let t = &spec.bound;
        let before = or_skip(before, lp.range);
        let after = or_skip(after, lp.range);
        let any_guard = guard_disjunction(&lp.guards);
        let do_frame = |range: Option<TextRange>, step: u8| {
            Frame::new(FrameKind::Do, range.unwrap_or(lp.range))
                .step(step)
                .in_loop(index)
        };

        // 1. {Q} I {P}
        self.wp(q, p, &before, &with(context, do_frame(cmds_range(&before), 1)))?;

        // 2. {P && Bi} Ci {P}
        for (i, (guard, body)) in lp.branches().enumerate() {
            let frame = do_frame(range_of(body), 2).branch(i + 1);
            let pre = Predicate::and(p.clone(), guard.clone());
            self.wp(&pre, p, &source_cmds(body), &with(context, frame))?;
        }

        // 3. {P && ~BB} J {R}
        let exit = Predicate::and(p.clone(), Predicate::not(any_guard.clone()));
        self.wp(&exit, r, &after, &with(context, do_frame(cmds_range(&after), 3)))?;

        // 4. P && BB => t > 0
        let positive = Predicate::implies(Predicate::and(p.clone(), any_guard), bound_positive(t));
        self.emit(positive, with(context, do_frame(None, 4)));

        // 5. {P && Bi} @t := t; Ci' {t < @t}
        for (i, (guard, body)) in lp.branches().enumerate() {
            let frame = do_frame(range_of(body), 5).branch(i + 1);
            let snapshot = self.fresh("t");
            let stripped = strip_loops(body);
            let snapshot_range = stripped.first().map(Statement::range).unwrap_or(lp.range);
            let mut cmds = vec![Cmd::Snapshot {
                name: snapshot.clone(),
                bound: t.clone(),
                range: snapshot_range,
            }];
            cmds.extend(stripped.into_iter().map(Cmd::Owned));
            let pre = Predicate::and(p.clone(), guard.clone());
            let post = Predicate::comp(CompOp::Lt, t.clone(), IntExpr::name(snapshot));
            self.wp(&pre, &post, &cmds, &with(context, frame))?;
        }

        // 6. {T = t} Xj {T = t} for every branch of every loop nested in this one.
        let mut inner = Vec::new();
        for body in &lp.commands {
            nested_loops(body, &mut inner);
        }
        for nested in inner {
            let (nested_index, _) = self.loop_of(nested)?;
            for (j, body) in nested.commands.iter().enumerate() {
                let mut frame = do_frame(range_of(body).or(Some(nested.range)), 6).branch(j + 1);
                frame.nested_loop = Some(nested_index);
                let pinned = self.fresh("T");
                let unchanged = Predicate::eq(IntExpr::name(pinned), t.clone());
                let cmds: Vec<Cmd<'a>> = strip_loops(body).into_iter().map(Cmd::Owned).collect();
                self.wp(&unchanged, &unchanged, &cmds, &with(context, frame))?;
            }
        }
        Ok(())
    }
}

fn with(context: &[Frame], frame: Frame) -> Vec<Frame> {
    let mut out = context.to_vec();
    out.push(frame);
    out
}

fn or_skip<'a>(cmds: &[Cmd<'a>], range: TextRange) -> Vec<Cmd<'a>> {
    if cmds.is_empty() {
        vec![Cmd::Skip(range)]
    } else {
        cmds.to_vec()
    }
}

fn if_parts<'a>(cmd: &Cmd<'a>) -> Result<(Vec<Predicate>, Vec<Vec<Cmd<'a>>>), VerifyError> {
    match cmd {
        Cmd::Source(s) => match *s {
            Statement::If(g) => Ok((
                g.guards.clone(),
                g.commands.iter().map(|c| source_cmds(c)).collect(),
            )),
            _ => Err(VerifyError::Internal("expected an if statement".to_string())),
        },
        Cmd::Owned(Statement::If(g)) => Ok((
            g.guards.clone(),
            g.commands
                .iter()
                .map(|c| c.iter().cloned().map(Cmd::Owned).collect())
                .collect(),
        )),
        _ => Err(VerifyError::Internal("expected an if statement".to_string())),
    }
}

/// wp of a command sequence without conditionals or loops, right to left.
fn sequence_wp(cmds: &[Cmd<'_>], post: &Predicate) -> Result<Predicate, VerifyError> {
    cmds.iter().rev().try_fold(post.clone(), |acc, cmd| match cmd {
        Cmd::Skip(_) => Ok(acc),
        Cmd::Snapshot { name, bound, .. } => {
            Ok(Substitution::single(name.clone(), bound.clone()).apply(&acc)?)
        }
        Cmd::Source(stmt) => statement_wp(stmt, acc),
        Cmd::Owned(stmt) => statement_wp(stmt, acc),
    })
}

fn statement_wp(stmt: &Statement, post: Predicate) -> Result<Predicate, VerifyError> {
    match stmt {
        Statement::Abort { .. } => Ok(Predicate::FALSE),
        Statement::Skip { .. } => Ok(post),
        Statement::Assign(assign) => assign_wp(assign, &post),
        Statement::If(_) | Statement::Do(_) => Err(VerifyError::Internal(
            "compound statement in an elementary sequence".to_string(),
        )),
    }
}

/// `post[lvalues := rvalues]` after normalizing the assignment.
pub fn assign_wp(assign: &Assign, post: &Predicate) -> Result<Predicate, VerifyError> {
    let normalized = normalize_assign(assign)?;
    let subst = Substitution::new(&normalized.lvalues, &normalized.rvalues)?;
    Ok(subst.apply(post)?)
}
