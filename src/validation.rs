//! Structural grammar checks.
//!
//! [`validate`] walks a grammar tree and rejects shapes that could never
//! parse correctly: a capture with no enclosing namespace, or an
//! alternation with no alternatives. The walk follows references that have
//! already been resolved but does not force pending thunks, so a rule that
//! is still deferred is checked the first time a parse actually reaches it.
//! The engine runs this check at the start of every parse and backstops the
//! capture rule at runtime for paths validation could not see.

use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::EngineError;
use crate::grammar::{Grammar, Node};

/// Checks `grammar` for structural errors without consuming any input.
pub fn validate(grammar: &Grammar) -> Result<(), EngineError> {
    let mut visited = HashSet::new();
    walk(grammar, false, &mut visited)
}

/// Nodes are keyed by identity and namespace context: a shared sub-grammar
/// must be re-checked when it is reachable both inside and outside a
/// namespace, while cycles through references terminate.
fn walk(
    grammar: &Grammar,
    in_namespace: bool,
    visited: &mut HashSet<(usize, bool)>,
) -> Result<(), EngineError> {
    let id = Arc::as_ptr(&grammar.node) as usize;
    if !visited.insert((id, in_namespace)) {
        return Ok(());
    }

    match grammar.node.as_ref() {
        Node::Literal(_) | Node::Pattern(_) | Node::Eof => Ok(()),
        Node::Sequence(left, right) => {
            walk(left, in_namespace, visited)?;
            walk(right, in_namespace, visited)
        }
        Node::Alternation(alternatives) => {
            if alternatives.is_empty() {
                return Err(EngineError::EmptyAlternation);
            }
            for alternative in alternatives {
                walk(alternative, in_namespace, visited)?;
            }
            Ok(())
        }
        Node::Repeat { inner, .. } => walk(inner, in_namespace, visited),
        Node::Reference(reference) => match reference.peek() {
            Some(target) => walk(target, in_namespace, visited),
            None => Ok(()),
        },
        Node::Namespace(inner) => walk(inner, true, visited),
        Node::Capture { label, inner } => {
            if !in_namespace {
                return Err(EngineError::capture_outside_namespace(label));
            }
            walk(inner, in_namespace, visited)
        }
        Node::Transform { inner, .. } => walk(inner, in_namespace, visited),
    }
}
