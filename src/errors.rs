//! Fatal engine errors.
//!
//! The engine separates two kinds of trouble. A grammar that simply does not
//! match the input is an ordinary outcome, reported as a
//! [`Failure`](crate::outcome::Status::Failure) status so callers can branch
//! on it. A grammar that is structurally broken, or a transform that cannot
//! do its job, is a programming error: those are the [`EngineError`] values
//! here, and they abort the parse instead of being absorbed by backtracking.
//!
//! Errors raised mid-parse carry the input as a [`NamedSource`] with a span
//! at the offending offset, so they render as annotated diagnostics.

use std::sync::Arc;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A fatal condition that aborts the parse.
///
/// None of these are produced by ordinary mismatches; every variant means
/// the grammar, a reference, or a transform needs fixing.
#[derive(Error, Diagnostic, Debug)]
pub enum EngineError {
    #[error("invalid pattern expression '{pattern}'")]
    #[diagnostic(code(trellis::grammar::invalid_pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
        #[help]
        help: Option<String>,
    },

    #[error("alternation with no alternatives")]
    #[diagnostic(code(trellis::grammar::empty_alternation))]
    EmptyAlternation,

    #[error("capture '{label}' used outside a namespace")]
    #[diagnostic(code(trellis::grammar::capture_outside_namespace))]
    CaptureOutsideNamespace {
        label: String,
        #[help]
        help: Option<String>,
    },

    #[error("reference resolved before its definition was tied")]
    #[diagnostic(code(trellis::grammar::unresolved_reference))]
    UnresolvedReference,

    #[error("left recursion detected at offset {offset}")]
    #[diagnostic(code(trellis::engine::left_recursion))]
    LeftRecursion {
        offset: usize,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("rule re-entered here without consuming input")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
    },

    #[error("recursion depth limit of {limit} exceeded")]
    #[diagnostic(code(trellis::engine::recursion_limit))]
    RecursionLimit {
        limit: usize,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("deepest position reached")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
    },

    #[error("repetition matched empty input at offset {offset}")]
    #[diagnostic(code(trellis::engine::empty_repetition))]
    EmptyRepetition {
        offset: usize,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("matched nothing here")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
    },

    #[error("transform failed: {message}")]
    #[diagnostic(code(trellis::engine::transform))]
    Transform { message: String },

    #[error("missing capture '{label}'")]
    #[diagnostic(code(trellis::engine::missing_capture))]
    MissingCapture { label: String },
}

impl EngineError {
    /// Builds a [`Transform`](EngineError::Transform) error. This is the
    /// conventional way for a transform function to reject a value it
    /// cannot convert.
    pub fn transform(message: impl Into<String>) -> Self {
        EngineError::Transform {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_pattern(pattern: &str, source: regex::Error) -> Self {
        EngineError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
            help: Some("pattern expressions use the regex crate syntax and match anchored at the current position".to_string()),
        }
    }

    pub(crate) fn capture_outside_namespace(label: &str) -> Self {
        EngineError::CaptureOutsideNamespace {
            label: label.to_string(),
            help: Some("wrap the capturing grammar in namespace(..) so its labels have a record to land in".to_string()),
        }
    }

    pub(crate) fn left_recursion(input: &str, offset: usize) -> Self {
        EngineError::LeftRecursion {
            offset,
            src: input_source(input),
            span: SourceSpan::from(offset..offset),
            help: Some("rewrite the rule so every recursive cycle consumes at least one character before re-entering itself".to_string()),
        }
    }

    pub(crate) fn recursion_limit(input: &str, limit: usize, offset: usize) -> Self {
        EngineError::RecursionLimit {
            limit,
            src: input_source(input),
            span: SourceSpan::from(offset..offset),
            help: Some("deeply nested input can be accommodated with Parser::with_max_depth".to_string()),
        }
    }

    pub(crate) fn empty_repetition(input: &str, offset: usize) -> Self {
        EngineError::EmptyRepetition {
            offset,
            src: input_source(input),
            span: SourceSpan::from(offset..offset),
            help: Some("a repeated grammar that succeeds on empty input would loop forever; require at least one character per iteration".to_string()),
        }
    }
}

fn input_source(input: &str) -> Arc<NamedSource<String>> {
    Arc::new(NamedSource::new("input", input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_problem() {
        let err = EngineError::transform("expected a record");
        assert_eq!(err.to_string(), "transform failed: expected a record");

        let err = EngineError::capture_outside_namespace("total");
        assert_eq!(err.to_string(), "capture 'total' used outside a namespace");

        let err = EngineError::left_recursion("abc", 1);
        assert_eq!(err.to_string(), "left recursion detected at offset 1");
    }

    #[test]
    fn test_span_errors_point_into_the_input() {
        let err = EngineError::empty_repetition("xyz", 2);
        match err {
            EngineError::EmptyRepetition { offset, span, .. } => {
                assert_eq!(offset, 2);
                assert_eq!(span.offset(), 2);
                assert_eq!(span.len(), 0);
            }
            other => panic!("expected EmptyRepetition, got {other:?}"),
        }
    }
}
