//! Derived values.
//!
//! Matching produces values: primitives yield matched text, sequences pair
//! their halves, repetitions collect lists, namespaces close over their
//! captured labels as a [`Record`], and transforms rewrite any of these into
//! whatever the grammar author wants. [`Value`] is the single dynamic type
//! all of those flow through.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// A value derived from a parse.
///
/// # Examples
///
/// ```rust
/// use trellis::value::Value;
/// let n = Value::Number(3.14);
/// assert_eq!(n.type_name(), "Number");
/// let s = Value::String("hello".to_string());
/// assert_eq!(s.type_name(), "String");
/// let nil = Value::default();
/// assert!(nil.is_nil());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    /// The two halves of a matched sequence, in order.
    Pair(Box<(Value, Value)>),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    /// Returns the type name of the value as a string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trellis::value::Value;
    /// let v = Value::Bool(true);
    /// assert_eq!(v.type_name(), "Bool");
    /// ```
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Bool",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Pair(_) => "Pair",
            Value::List(_) => "List",
            Value::Record(_) => "Record",
        }
    }

    /// Returns true if the value is Nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Returns the contained bool if this is a Bool value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the contained number if this is a Number value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the contained text if this is a String value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the contained items if this is a List value.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the contained record if this is a Record value.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Consumes the value and returns the two halves of a Pair.
    pub fn into_pair(self) -> Option<(Value, Value)> {
        match self {
            Value::Pair(halves) => Some(*halves),
            _ => None,
        }
    }

    /// Consumes the value and returns the items of a List.
    pub fn into_list(self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Consumes the value and returns the owned text of a String.
    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Consumes the value and returns the entries of a Record.
    pub fn into_record(self) -> Option<Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Display formatting helpers
    // ------------------------------------------------------------------------

    /// Helper for formatting list values
    fn fmt_list(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
        write!(f, "[")?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, "]")
    }

    /// Helper for formatting record values
    fn fmt_record(f: &mut fmt::Formatter<'_>, record: &Record) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (label, value)) in record.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", label, value)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Pair(halves) => write!(f, "({}, {})", halves.0, halves.1),
            Value::List(items) => Value::fmt_list(f, items),
            Value::Record(record) => Value::fmt_record(f, record),
        }
    }
}

/// An insertion-ordered mapping from capture labels to values.
///
/// A namespace yields one of these on success: every label captured while
/// the namespace was open, in the order the labels first appeared in the
/// input. Re-capturing a label overwrites its value but keeps its original
/// position.
///
/// # Examples
///
/// ```rust
/// use trellis::value::{Record, Value};
///
/// let mut record = Record::new();
/// record.insert("a", Value::Number(1.0));
/// record.insert("b", Value::Number(2.0));
/// record.insert("a", Value::Number(3.0));
///
/// assert_eq!(record.get("a"), Some(&Value::Number(3.0)));
/// assert_eq!(record.len(), 2);
/// let labels: Vec<&str> = record.iter().map(|(label, _)| label.as_str()).collect();
/// assert_eq!(labels, vec!["a", "b"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Record::default()
    }

    /// Inserts `value` under `label`. A label already present keeps its
    /// position and has its value replaced.
    pub fn insert(&mut self, label: impl Into<String>, value: Value) {
        let label = label.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    /// Returns the value under `label`, if present.
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, value)| value)
    }

    /// Returns the value under `label`, or a
    /// [`MissingCapture`](EngineError::MissingCapture) error.
    pub fn require(&self, label: &str) -> Result<&Value, EngineError> {
        self.get(label).ok_or_else(|| EngineError::MissingCapture {
            label: label.to_string(),
        })
    }

    /// Removes and returns the value under `label`, or a
    /// [`MissingCapture`](EngineError::MissingCapture) error.
    pub fn take(&mut self, label: &str) -> Result<Value, EngineError> {
        match self.entries.iter().position(|(existing, _)| existing == label) {
            Some(at) => Ok(self.entries.remove(at).1),
            None => Err(EngineError::MissingCapture {
                label: label.to_string(),
            }),
        }
    }

    /// Number of labels in the record.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no labels have been captured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, (String, Value)> {
        self.entries.iter()
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_overwrite_keeps_position() {
        let mut record = Record::new();
        record.insert("x", Value::Number(1.0));
        record.insert("y", Value::Number(2.0));
        record.insert("x", Value::String("replaced".to_string()));

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("x"), Some(&Value::String("replaced".to_string())));
        let order: Vec<&str> = record.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(order, vec!["x", "y"]);
    }

    #[test]
    fn test_record_require_reports_missing_label() {
        let record = Record::new();
        let err = record.require("absent");
        assert!(matches!(
            err,
            Err(EngineError::MissingCapture { ref label }) if label == "absent"
        ));
    }

    #[test]
    fn test_record_take_removes_entry() {
        let mut record = Record::new();
        record.insert("n", Value::Number(4.0));
        let taken = record.take("n");
        assert_eq!(taken.ok(), Some(Value::Number(4.0)));
        assert!(record.is_empty());
        assert!(record.take("n").is_err());
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(3.5).to_string(), "3.5");
        assert_eq!(
            Value::Pair(Box::new((Value::Number(1.0), Value::Number(2.0)))).to_string(),
            "(1, 2)"
        );
        assert_eq!(
            Value::List(vec![Value::Number(1.0), Value::String("a".to_string())]).to_string(),
            "[1, a]"
        );

        let mut record = Record::new();
        record.insert("k", Value::Bool(true));
        assert_eq!(Value::Record(record).to_string(), "{k: true}");
    }
}
