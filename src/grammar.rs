//! Grammar construction.
//!
//! A [`Grammar`] is an immutable description of what to match: a tree of
//! primitive matchers and combinators built up through the free functions in
//! this module. Handles are cheap to clone and safe to share across threads;
//! the same grammar can drive any number of parses, concurrently or in
//! sequence, without accumulating state.
//!
//! # Examples
//!
//! ```rust
//! use trellis::{literal, one_or_more, Parser};
//!
//! let word = one_or_more(literal("ab"));
//! let outcome = Parser::new().parse(&word, "ababx")?;
//! assert!(outcome.is_success());
//! assert_eq!(outcome.index, 4);
//! # Ok::<(), trellis::EngineError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::errors::EngineError;
use crate::value::Value;

/// Signature of an attached transform: rewrite the derived value, or abort
/// the parse with a fatal error.
pub(crate) type TransformFn = Arc<dyn Fn(Value) -> Result<Value, EngineError> + Send + Sync>;

/// Deferred lookup of a grammar, for rules defined after their first use.
pub(crate) type ThunkFn = Box<dyn Fn() -> Grammar + Send + Sync>;

/// A handle to an immutable grammar node.
///
/// Cloning is cheap: handles share the underlying node. All composition
/// goes through the constructor functions in this module (or their method
/// sugar); a handle never changes after it is built.
#[derive(Clone)]
pub struct Grammar {
    pub(crate) node: Arc<Node>,
}

impl Grammar {
    fn new(node: Node) -> Self {
        Grammar {
            node: Arc::new(node),
        }
    }

    /// Method sugar for [`sequence`]: `self` followed by `next`.
    pub fn then(self, next: Grammar) -> Grammar {
        sequence(self, next)
    }

    /// Method sugar for [`alternation`]: `self`, falling back to `other`.
    pub fn or(self, other: Grammar) -> Grammar {
        alternation([self, other])
    }

    /// Method sugar for [`map`].
    pub fn map(self, apply: impl Fn(Value) -> Value + Send + Sync + 'static) -> Grammar {
        map(self, apply)
    }

    /// Method sugar for [`try_map`].
    pub fn try_map(
        self,
        apply: impl Fn(Value) -> Result<Value, EngineError> + Send + Sync + 'static,
    ) -> Grammar {
        try_map(self, apply)
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node.fmt(f)
    }
}

/// The grammar node tree. Construction happens only through the public
/// functions below, so every invariant about node shape lives in this file.
pub(crate) enum Node {
    Literal(String),
    Pattern(Pattern),
    Eof,
    Sequence(Grammar, Grammar),
    Alternation(Vec<Grammar>),
    Repeat { inner: Grammar, min: usize },
    Reference(Reference),
    Namespace(Grammar),
    Capture { label: String, inner: Grammar },
    Transform { inner: Grammar, apply: TransformFn },
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Node::Pattern(pattern) => f.debug_tuple("Pattern").field(&pattern.expr).finish(),
            Node::Eof => write!(f, "Eof"),
            Node::Sequence(left, right) => {
                f.debug_tuple("Sequence").field(left).field(right).finish()
            }
            Node::Alternation(alternatives) => {
                f.debug_tuple("Alternation").field(alternatives).finish()
            }
            Node::Repeat { inner, min } => f
                .debug_struct("Repeat")
                .field("inner", inner)
                .field("min", min)
                .finish(),
            // Opaque on purpose: a reference may close a cycle.
            Node::Reference(_) => write!(f, "Reference(..)"),
            Node::Namespace(inner) => f.debug_tuple("Namespace").field(inner).finish(),
            Node::Capture { label, inner } => {
                f.debug_tuple("Capture").field(label).field(inner).finish()
            }
            Node::Transform { inner, .. } => f.debug_tuple("Transform").field(inner).finish(),
        }
    }
}

/// A compiled pattern matcher. The expression is compiled once, anchored so
/// it can only match at the position being tried.
pub(crate) struct Pattern {
    pub(crate) expr: String,
    pub(crate) regex: Regex,
}

/// The target of a deferred or recursive rule.
///
/// `Thunk` holds a closure that names the target; the first resolution runs
/// it and caches the result, so the closure is invoked at most once even
/// when parses race on separate threads. `Knot` is the handle side of
/// [`recursive`]: an initially empty slot that `recursive` ties to the
/// finished grammar before returning it.
pub(crate) enum Reference {
    Thunk {
        thunk: ThunkFn,
        cache: OnceCell<Grammar>,
    },
    Knot(Arc<OnceCell<Grammar>>),
}

impl Reference {
    /// Resolves the target, invoking and caching the thunk on first use.
    pub(crate) fn resolve(&self) -> Result<&Grammar, EngineError> {
        match self {
            Reference::Thunk { thunk, cache } => Ok(cache.get_or_init(|| thunk())),
            Reference::Knot(slot) => slot.get().ok_or(EngineError::UnresolvedReference),
        }
    }

    /// Returns the target if it has already been resolved, without forcing
    /// a thunk.
    pub(crate) fn peek(&self) -> Option<&Grammar> {
        match self {
            Reference::Thunk { cache, .. } => cache.get(),
            Reference::Knot(slot) => slot.get(),
        }
    }
}

// ============================================================================
// CONSTRUCTORS
// ============================================================================

/// Matches `text` exactly at the current position and yields it as a
/// `Value::String`. The empty literal matches everywhere and consumes
/// nothing.
pub fn literal(text: impl Into<String>) -> Grammar {
    Grammar::new(Node::Literal(text.into()))
}

/// Compiles `expr` into a matcher that must match starting exactly at the
/// current position, yielding the matched text as a `Value::String`.
///
/// The expression uses the regex crate's syntax. Anchoring is added by the
/// engine, so `pattern("[0-9]+")` matches digits at the current position
/// and never searches ahead. A malformed expression is rejected here, not
/// at parse time.
pub fn pattern(expr: &str) -> Result<Grammar, EngineError> {
    let anchored = format!(r"\A(?:{})", expr);
    let regex =
        Regex::new(&anchored).map_err(|source| EngineError::invalid_pattern(expr, source))?;
    Ok(Grammar::new(Node::Pattern(Pattern {
        expr: expr.to_string(),
        regex,
    })))
}

/// Matches only at the end of input, consuming nothing and yielding
/// `Value::Nil`.
pub fn eof() -> Grammar {
    Grammar::new(Node::Eof)
}

/// Matches `left` and then `right`, yielding both values as a
/// `Value::Pair`. Longer chains nest pairs to the left of each `then`
/// call, so `a.then(b).then(c)` yields `((a, b), c)`.
pub fn sequence(left: Grammar, right: Grammar) -> Grammar {
    Grammar::new(Node::Sequence(left, right))
}

/// Tries each alternative in order at the same position and commits to the
/// first that matches. When all alternatives fail, the failure is reported
/// at the furthest position any alternative reached.
///
/// An alternation with no alternatives is rejected when the grammar is
/// validated.
pub fn alternation(alternatives: impl IntoIterator<Item = Grammar>) -> Grammar {
    Grammar::new(Node::Alternation(alternatives.into_iter().collect()))
}

/// Matches `inner` as many times as possible, requiring at least one match.
/// Yields the collected values as a `Value::List`.
pub fn one_or_more(inner: Grammar) -> Grammar {
    Grammar::new(Node::Repeat { inner, min: 1 })
}

/// Matches `inner` as many times as possible, succeeding even on zero
/// matches. Yields the collected values as a `Value::List`, empty when
/// nothing matched.
pub fn zero_or_more(inner: Grammar) -> Grammar {
    Grammar::new(Node::Repeat { inner, min: 0 })
}

/// Alias for [`zero_or_more`], for grammars that read better as "optional
/// trailing matter" than as a repetition.
pub fn optional(inner: Grammar) -> Grammar {
    zero_or_more(inner)
}

/// Records the value matched by `inner` under `label` in the innermost
/// enclosing [`namespace`], then passes the value through unchanged.
///
/// A capture with no enclosing namespace is a structural error and aborts
/// the parse.
pub fn capture(label: impl Into<String>, inner: Grammar) -> Grammar {
    Grammar::new(Node::Capture {
        label: label.into(),
        inner,
    })
}

/// Opens a capture scope around `inner`. On success the namespace discards
/// `inner`'s raw value and yields a `Value::Record` of every label captured
/// inside it, in first-appearance order.
///
/// ```rust
/// use trellis::value::Value;
/// use trellis::{capture, namespace, pattern, EngineError, Parser};
///
/// let digits = pattern("[0-9]+")?;
/// let number = namespace(capture("digits", digits)).try_map(|value| {
///     let record = value
///         .into_record()
///         .ok_or_else(|| EngineError::transform("expected a record"))?;
///     let text = record.require("digits")?.clone();
///     let digits = text
///         .into_string()
///         .ok_or_else(|| EngineError::transform("expected captured text"))?;
///     let number: f64 = digits
///         .parse()
///         .map_err(|_| EngineError::transform("captured text is not a number"))?;
///     Ok(Value::Number(number))
/// });
///
/// let outcome = Parser::new().parse(&number, "123")?;
/// assert_eq!(outcome.index, 3);
/// assert_eq!(outcome.value, Some(Value::Number(123.0)));
/// # Ok::<(), EngineError>(())
/// ```
pub fn namespace(inner: Grammar) -> Grammar {
    Grammar::new(Node::Namespace(inner))
}

/// Defers to the grammar returned by `target`, which is looked up on first
/// use and cached. This lets a rule mention another rule that is defined
/// later, or mention itself through a shared definition site.
pub fn reference(target: impl Fn() -> Grammar + Send + Sync + 'static) -> Grammar {
    Grammar::new(Node::Reference(Reference::Thunk {
        thunk: Box::new(target),
        cache: OnceCell::new(),
    }))
}

/// Builds a self-referential grammar. `build` receives a handle standing
/// for the finished grammar and may embed it anywhere; `recursive` ties the
/// handle to the result before returning it.
///
/// ```rust
/// use trellis::{alternation, literal, recursive, sequence, Parser};
///
/// // Balanced parentheses: "(" inner ")" or nothing.
/// let parens = recursive(|inner| {
///     alternation([
///         sequence(literal("("), sequence(inner, literal(")"))),
///         literal(""),
///     ])
/// });
///
/// let outcome = Parser::new().parse(&parens, "(())")?;
/// assert!(outcome.is_success());
/// assert_eq!(outcome.index, 4);
/// # Ok::<(), trellis::EngineError>(())
/// ```
pub fn recursive(build: impl FnOnce(Grammar) -> Grammar) -> Grammar {
    let slot = Arc::new(OnceCell::new());
    let handle = Grammar::new(Node::Reference(Reference::Knot(slot.clone())));
    let grammar = build(handle);
    let _ = slot.set(grammar.clone());
    grammar
}

/// Rewrites the value yielded by `inner` on success. The function is not
/// called when `inner` fails.
pub fn map(inner: Grammar, apply: impl Fn(Value) -> Value + Send + Sync + 'static) -> Grammar {
    try_map(inner, move |value| Ok(apply(value)))
}

/// Rewrites the value yielded by `inner` on success, or aborts the parse
/// when the function returns an error. Rejections are fatal: they are not
/// absorbed by enclosing alternations or repetitions.
pub fn try_map(
    inner: Grammar,
    apply: impl Fn(Value) -> Result<Value, EngineError> + Send + Sync + 'static,
) -> Grammar {
    Grammar::new(Node::Transform {
        inner,
        apply: Arc::new(apply),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_is_rejected_at_construction() {
        let err = pattern("[unclosed");
        match err {
            Err(EngineError::InvalidPattern { pattern, .. }) => {
                assert_eq!(pattern, "[unclosed");
            }
            other => panic!("expected InvalidPattern, got {other:?}"),
        }
    }

    #[test]
    fn test_debug_output_is_cycle_safe() {
        let parens = recursive(|inner| {
            alternation([
                sequence(literal("("), sequence(inner, literal(")"))),
                literal(""),
            ])
        });
        let rendered = format!("{:?}", parens);
        assert!(rendered.contains("Reference(..)"));
        assert!(rendered.contains("Literal(\"(\")"));
    }

    #[test]
    fn test_clones_share_the_same_node() {
        let rule = literal("x");
        let copy = rule.clone();
        assert!(Arc::ptr_eq(&rule.node, &copy.node));
    }

    #[test]
    fn test_recursive_handle_is_tied_before_return() {
        let rule = recursive(|inner| alternation([literal("a"), inner]));
        match rule.node.as_ref() {
            Node::Alternation(alternatives) => {
                let handle = &alternatives[1];
                match handle.node.as_ref() {
                    Node::Reference(reference) => assert!(reference.peek().is_some()),
                    other => panic!("expected Reference, got {other:?}"),
                }
            }
            other => panic!("expected Alternation, got {other:?}"),
        }
    }
}
