//! Turns unproved obligations into user-facing semantic errors.

use gcl_ast::{Position, TextRange};
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::wp::{Frame, FrameKind, Obligation};

/// A located note explaining how an obligation was derived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Note {
    pub start: Position,
    pub end: Position,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(gcl::semantic))]
pub struct SemanticError {
    pub start: Position,
    pub end: Position,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

impl SemanticError {
    pub fn new(range: TextRange, message: impl Into<String>) -> Self {
        Self {
            start: range.start,
            end: range.end,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    pub fn range(&self) -> TextRange {
        TextRange::new(self.start, self.end)
    }

    /// Error for an obligation the prover could not discharge: the outermost
    /// frame names the failed proof step, inner frames become notes.
    pub fn unproved(obligation: &Obligation) -> Self {
        let Some((outer, inner)) = obligation.context.split_first() else {
            return Self::new(TextRange::default(), "a verification condition does not hold");
        };
        let mut err = Self::new(outer.range, frame_message(outer));
        err.notes = inner
            .iter()
            .map(|f| Note {
                start: f.range.start,
                end: f.range.end,
                message: frame_message(f),
            })
            .collect();
        err
    }

    pub fn loop_count_mismatch(program: TextRange, loops: usize, specs: usize) -> Self {
        Self::new(
            program,
            format!("the program has {loops} loops, but {specs} invariant/bound pairs were given"),
        )
    }
}

fn ordinal(n: Option<usize>) -> String {
    n.map(|n| format!("#{n}")).unwrap_or_default()
}

/// Describes the proof step a frame stands for.
pub fn frame_message(frame: &Frame) -> String {
    let branch = ordinal(frame.branch);
    let lp = format!("loop {}", ordinal(frame.loop_index));
    match (frame.kind, frame.step) {
        (FrameKind::Seq, _) => "this sequence of commands does not establish what follows it".to_string(),
        (FrameKind::If, Some(1)) => {
            "the guards of this if statement can all be false at this point".to_string()
        }
        (FrameKind::If, _) => {
            format!("branch {branch} of the if statement does not establish what follows it")
        }
        (FrameKind::Do, Some(1)) => format!("the invariant of {lp} does not hold on entry"),
        (FrameKind::Do, Some(2)) => {
            format!("branch {branch} of {lp} does not preserve the invariant")
        }
        (FrameKind::Do, Some(3)) => {
            format!("the invariant and negated guards of {lp} do not establish what follows it")
        }
        (FrameKind::Do, Some(4)) => {
            format!("the bound of {lp} is not positive while a guard holds")
        }
        (FrameKind::Do, Some(5)) => format!("branch {branch} of {lp} does not decrease the bound"),
        (FrameKind::Do, _) => format!(
            "branch {branch} of loop {} can change the bound of {lp}",
            ordinal(frame.nested_loop)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcl_ast::Predicate;

    fn frame(kind: FrameKind, step: Option<u8>, branch: Option<usize>, lp: Option<usize>) -> Frame {
        Frame {
            kind,
            step,
            branch,
            loop_index: lp,
            nested_loop: None,
            range: TextRange::new(Position::new(2, 0), Position::new(4, 2)),
        }
    }

    #[test]
    fn messages_name_loops_and_branches() {
        assert_eq!(
            frame_message(&frame(FrameKind::Do, Some(2), Some(1), Some(3))),
            "branch #1 of loop #3 does not preserve the invariant"
        );
        assert_eq!(
            frame_message(&frame(FrameKind::If, Some(1), None, None)),
            "the guards of this if statement can all be false at this point"
        );
        let mut nested = frame(FrameKind::Do, Some(6), Some(2), Some(1));
        nested.nested_loop = Some(2);
        assert_eq!(
            frame_message(&nested),
            "branch #2 of loop #2 can change the bound of loop #1"
        );
    }

    #[test]
    fn outermost_frame_is_the_error() {
        let obligation = Obligation {
            predicate: Predicate::TRUE,
            context: vec![
                frame(FrameKind::Do, Some(4), None, Some(1)),
                frame(FrameKind::Seq, None, None, None),
            ],
        };
        let err = SemanticError::unproved(&obligation);
        assert_eq!(err.message, "the bound of loop #1 is not positive while a guard holds");
        assert_eq!(err.start, Position::new(2, 0));
        assert_eq!(err.notes.len(), 1);
    }
}
