//! Grammar evaluation.
//!
//! [`Parser`] drives a [`Grammar`] over an input string by recursive
//! descent. Evaluation is pure backtracking: combinators try their children
//! at candidate positions and report an [`Outcome`] either way, so a failed
//! branch simply returns control to the nearest choice point with the
//! position unchanged. Only fatal conditions travel as `Err`: a broken
//! grammar shape, a rejected transform, runaway recursion.
//!
//! All per-parse state lives in a context created inside [`Parser::parse`]
//! and dropped before it returns. Grammars themselves stay immutable, which
//! is what makes reuse and cross-thread sharing safe.

use crate::errors::EngineError;
use crate::grammar::{Grammar, Node, Pattern, Reference, TransformFn};
use crate::outcome::Outcome;
use crate::validation::validate;
use crate::value::{Record, Value};

// ============================================================================
// PARSER - The public driver
// ============================================================================

/// Runs grammars over inputs.
///
/// A parser holds only configuration. Every call to [`parse`](Parser::parse)
/// builds fresh evaluation state, so one parser can serve any number of
/// grammars and inputs, in any order, from any thread.
#[derive(Debug, Clone)]
pub struct Parser {
    max_depth: usize,
}

impl Parser {
    /// Depth budget applied by [`Parser::new`].
    pub const DEFAULT_MAX_DEPTH: usize = 1000;

    /// Creates a parser with the default recursion depth limit.
    pub fn new() -> Self {
        Parser {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }

    /// Creates a parser with a custom recursion depth limit, for inputs
    /// nested more deeply than the default budget allows.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Parser { max_depth }
    }

    /// Evaluates `grammar` against `input` starting at position zero.
    ///
    /// Returns `Ok` with a success or failure [`Outcome`] for ordinary
    /// matching; a success need not consume the whole input. Returns `Err`
    /// only for fatal conditions: a structurally invalid grammar, a
    /// transform that rejected its value, left recursion, or an exhausted
    /// depth budget.
    pub fn parse(&self, grammar: &Grammar, input: &str) -> Result<Outcome, EngineError> {
        validate(grammar)?;
        let mut ctx = Context::new(input, self.max_depth);
        let step = eval(grammar, 0, &mut ctx)?;
        Ok(step.into_outcome())
    }

    /// Like [`parse`](Parser::parse), but a match that stops short of the
    /// end of input is demoted to a failure at the position where matching
    /// stopped.
    pub fn parse_complete(&self, grammar: &Grammar, input: &str) -> Result<Outcome, EngineError> {
        let outcome = self.parse(grammar, input)?;
        if outcome.is_success() && outcome.index < input.len() {
            return Ok(Outcome::failure(outcome.index));
        }
        Ok(outcome)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// EVALUATION CONTEXT - Per-parse state
// ============================================================================

/// Mutable state for a single parse: the open capture frames, the stack of
/// references currently being evaluated (for left-recursion detection), and
/// the depth budget.
struct Context<'a> {
    input: &'a str,
    frames: Vec<Record>,
    active: Vec<(usize, usize)>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Context<'a> {
    fn new(input: &'a str, max_depth: usize) -> Self {
        Context {
            input,
            frames: Vec::new(),
            active: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    /// Snapshot of the innermost frame, taken before a branch that may
    /// need to be unwound.
    fn frame_snapshot(&self) -> Option<Record> {
        self.frames.last().cloned()
    }

    /// Restores the innermost frame to `snapshot`, discarding every capture
    /// the abandoned branch recorded, including overwrites of labels that
    /// already existed.
    fn restore_frame(&mut self, snapshot: Option<Record>) {
        if let (Some(frame), Some(saved)) = (self.frames.last_mut(), snapshot) {
            *frame = saved;
        }
    }
}

/// Internal evaluation result. Unlike the public [`Outcome`], a matched
/// step always carries a value, which keeps the combinator code free of
/// impossible `None` cases.
enum Step {
    Matched { index: usize, value: Value },
    Missed { index: usize },
}

impl Step {
    fn into_outcome(self) -> Outcome {
        match self {
            Step::Matched { index, value } => Outcome::success(index, value),
            Step::Missed { index } => Outcome::failure(index),
        }
    }
}

// ============================================================================
// EVALUATION CORE
// ============================================================================

/// Evaluates one grammar node at `at`, guarding the depth budget.
fn eval(grammar: &Grammar, at: usize, ctx: &mut Context<'_>) -> Result<Step, EngineError> {
    if ctx.depth >= ctx.max_depth {
        return Err(EngineError::recursion_limit(ctx.input, ctx.max_depth, at));
    }
    ctx.depth += 1;
    let step = eval_node(grammar, at, ctx);
    ctx.depth -= 1;
    step
}

fn eval_node(grammar: &Grammar, at: usize, ctx: &mut Context<'_>) -> Result<Step, EngineError> {
    match grammar.node.as_ref() {
        Node::Literal(text) => Ok(eval_literal(text, at, ctx.input)),
        Node::Pattern(pattern) => Ok(eval_pattern(pattern, at, ctx.input)),
        Node::Eof => Ok(eval_eof(at, ctx.input)),
        Node::Sequence(left, right) => eval_sequence(left, right, at, ctx),
        Node::Alternation(alternatives) => eval_alternation(alternatives, at, ctx),
        Node::Repeat { inner, min } => eval_repeat(inner, *min, at, ctx),
        Node::Reference(reference) => eval_reference(grammar, reference, at, ctx),
        Node::Namespace(inner) => eval_namespace(inner, at, ctx),
        Node::Capture { label, inner } => eval_capture(label, inner, at, ctx),
        Node::Transform { inner, apply } => eval_transform(inner, apply, at, ctx),
    }
}

/// Exact text at the current position. The empty literal matches anywhere.
fn eval_literal(text: &str, at: usize, input: &str) -> Step {
    match input.get(at..at + text.len()) {
        Some(window) if window == text => Step::Matched {
            index: at + text.len(),
            value: Value::String(text.to_string()),
        },
        _ => Step::Missed { index: at },
    }
}

/// Anchored pattern match against the rest of the input. The compiled
/// expression can only match starting at the slice head, so this never
/// searches ahead of `at`.
fn eval_pattern(pattern: &Pattern, at: usize, input: &str) -> Step {
    match pattern.regex.find(&input[at..]) {
        Some(found) => Step::Matched {
            index: at + found.end(),
            value: Value::String(found.as_str().to_string()),
        },
        None => Step::Missed { index: at },
    }
}

fn eval_eof(at: usize, input: &str) -> Step {
    if at == input.len() {
        Step::Matched {
            index: at,
            value: Value::Nil,
        }
    } else {
        Step::Missed { index: at }
    }
}

/// Left then right. A failure on either side is reported at the furthest
/// position reached, which for the right side is past the left's match.
fn eval_sequence(
    left: &Grammar,
    right: &Grammar,
    at: usize,
    ctx: &mut Context<'_>,
) -> Result<Step, EngineError> {
    let first = eval(left, at, ctx)?;
    let Step::Matched {
        index,
        value: left_value,
    } = first
    else {
        return Ok(first);
    };
    let second = eval(right, index, ctx)?;
    let Step::Matched {
        index,
        value: right_value,
    } = second
    else {
        return Ok(second);
    };
    Ok(Step::Matched {
        index,
        value: Value::Pair(Box::new((left_value, right_value))),
    })
}

/// Ordered choice. Every alternative starts from the same position; the
/// first match wins even if a later alternative would have consumed more.
/// Captures recorded by a failing alternative are unwound before the next
/// one runs.
fn eval_alternation(
    alternatives: &[Grammar],
    at: usize,
    ctx: &mut Context<'_>,
) -> Result<Step, EngineError> {
    if alternatives.is_empty() {
        return Err(EngineError::EmptyAlternation);
    }
    let mut furthest = at;
    for alternative in alternatives {
        let mark = ctx.frame_snapshot();
        match eval(alternative, at, ctx)? {
            matched @ Step::Matched { .. } => return Ok(matched),
            Step::Missed { index } => {
                ctx.restore_frame(mark);
                furthest = furthest.max(index);
            }
        }
    }
    Ok(Step::Missed { index: furthest })
}

/// Greedy repetition. Iterates until the body fails, then succeeds if at
/// least `min` items matched. A body that matches without consuming would
/// iterate forever, so that is rejected as fatal rather than looped on.
fn eval_repeat(
    inner: &Grammar,
    min: usize,
    at: usize,
    ctx: &mut Context<'_>,
) -> Result<Step, EngineError> {
    let mut items = Vec::new();
    let mut cursor = at;
    loop {
        let mark = ctx.frame_snapshot();
        match eval(inner, cursor, ctx)? {
            Step::Matched { index, value } => {
                if index == cursor {
                    return Err(EngineError::empty_repetition(ctx.input, cursor));
                }
                items.push(value);
                cursor = index;
            }
            Step::Missed { index } => {
                ctx.restore_frame(mark);
                if items.len() >= min {
                    return Ok(Step::Matched {
                        index: cursor,
                        value: Value::List(items),
                    });
                }
                return Ok(Step::Missed { index });
            }
        }
    }
}

/// Resolves a reference and evaluates its target. Re-entering the same
/// reference at the same position means the grammar is left-recursive and
/// would never terminate, so that is cut off as fatal. Re-entry at a
/// further position is ordinary recursion and runs freely.
fn eval_reference(
    handle: &Grammar,
    reference: &Reference,
    at: usize,
    ctx: &mut Context<'_>,
) -> Result<Step, EngineError> {
    let id = std::sync::Arc::as_ptr(&handle.node) as usize;
    if ctx.active.contains(&(id, at)) {
        return Err(EngineError::left_recursion(ctx.input, at));
    }
    let target = reference.resolve()?;
    ctx.active.push((id, at));
    let step = eval(target, at, ctx);
    let _ = ctx.active.pop();
    step
}

/// Opens a fresh capture frame, evaluates the body, and on success yields
/// the frame as a record in place of the body's value. The frame is closed
/// on every path, including fatal errors.
fn eval_namespace(inner: &Grammar, at: usize, ctx: &mut Context<'_>) -> Result<Step, EngineError> {
    ctx.frames.push(Record::new());
    let step = eval(inner, at, ctx);
    let frame = ctx.frames.pop().unwrap_or_default();
    match step? {
        Step::Matched { index, .. } => Ok(Step::Matched {
            index,
            value: Value::Record(frame),
        }),
        missed => Ok(missed),
    }
}

/// Records the body's value under `label` in the innermost frame and passes
/// the value through. The frame is checked before the body runs: a bare
/// capture behind a reference that validation could not see yet is fatal on
/// its first evaluation, whether or not the body matches.
fn eval_capture(
    label: &str,
    inner: &Grammar,
    at: usize,
    ctx: &mut Context<'_>,
) -> Result<Step, EngineError> {
    if ctx.frames.is_empty() {
        return Err(EngineError::capture_outside_namespace(label));
    }
    let step = eval(inner, at, ctx)?;
    if let Step::Matched { value, .. } = &step {
        match ctx.frames.last_mut() {
            Some(frame) => frame.insert(label, value.clone()),
            None => return Err(EngineError::capture_outside_namespace(label)),
        }
    }
    Ok(step)
}

/// Applies the attached transform to a successful match. The transform
/// never sees failures, and its rejection is fatal rather than a
/// backtrackable miss.
fn eval_transform(
    inner: &Grammar,
    apply: &TransformFn,
    at: usize,
    ctx: &mut Context<'_>,
) -> Result<Step, EngineError> {
    match eval(inner, at, ctx)? {
        Step::Matched { index, value } => Ok(Step::Matched {
            index,
            value: apply(value)?,
        }),
        missed => Ok(missed),
    }
}
