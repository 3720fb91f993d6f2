//! Trellis: a backtracking parser-combinator engine.
//!
//! Grammars are immutable trees built from primitive matchers and
//! combinators, evaluated over string input by a [`Parser`]. Mismatches are
//! ordinary [`Outcome`] data; broken grammars and rejected transforms abort
//! with an [`EngineError`].

pub use crate::engine::Parser;
pub use crate::errors::EngineError;
pub use crate::grammar::{
    alternation, capture, eof, literal, map, namespace, one_or_more, optional, pattern, recursive,
    reference, sequence, try_map, zero_or_more, Grammar,
};
pub use crate::outcome::{Outcome, Status};
pub use crate::validation::validate;
pub use crate::value::{Record, Value};

pub mod engine;
pub mod errors;
pub mod grammar;
pub mod outcome;
pub mod validation;
pub mod value;
