//! Parse outcomes.
//!
//! Every evaluation of a grammar against an input position produces an
//! [`Outcome`]: a plain record of whether the attempt matched, how far it
//! reached, and (on a match) the value it derived. Ordinary mismatches are
//! reported through this type; they are data, not errors. Conditions that
//! indicate a broken grammar or a broken transform surface as
//! [`EngineError`](crate::errors::EngineError) instead and abort the parse.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Whether a parse attempt matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Success,
    Failure,
}

/// The result of evaluating a grammar against an input.
///
/// On success, `index` is the position just past the consumed text and
/// `value` holds the derived value. On failure, `index` is the furthest
/// position the attempt reached before giving up and `value` is `None`.
/// Positions are byte offsets into the input, always on character
/// boundaries.
///
/// # Examples
///
/// ```rust
/// use trellis::outcome::{Outcome, Status};
/// use trellis::value::Value;
///
/// let hit = Outcome::success(3, Value::String("abc".to_string()));
/// assert_eq!(hit.status, Status::Success);
/// assert!(hit.is_success());
///
/// let miss = Outcome::failure(1);
/// assert_eq!(miss.index, 1);
/// assert!(miss.value.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: Status,
    pub index: usize,
    pub value: Option<Value>,
}

impl Outcome {
    /// Builds a successful outcome at `index` carrying `value`.
    pub fn success(index: usize, value: Value) -> Self {
        Outcome {
            status: Status::Success,
            index,
            value: Some(value),
        }
    }

    /// Builds a failed outcome whose furthest reached position is `index`.
    pub fn failure(index: usize) -> Self {
        Outcome {
            status: Status::Failure,
            index,
            value: None,
        }
    }

    /// Returns true if the attempt matched.
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Consumes the outcome and returns its value, or `Value::Nil` when the
    /// attempt failed.
    pub fn into_value(self) -> Value {
        self.value.unwrap_or_default()
    }
}
