//! Operation model and conversion from character diffs.

use notewell_diff::CharDiff;
use serde::{Deserialize, Serialize};

/// A retain, insert, or delete anchored at a position in its base revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Op {
    /// Keep `length` characters starting at `position`
    Retain { length: usize, position: usize },
    /// Insert `text` at `position` without consuming base characters
    Insert { text: String, position: usize },
    /// Drop `length` characters starting at `position`
    Delete { length: usize, position: usize },
}

impl Op {
    pub fn retain(length: usize, position: usize) -> Self {
        Op::Retain { length, position }
    }

    pub fn insert(text: impl Into<String>, position: usize) -> Self {
        Op::Insert {
            text: text.into(),
            position,
        }
    }

    pub fn delete(length: usize, position: usize) -> Self {
        Op::Delete { length, position }
    }

    /// Position in the base revision this operation is anchored at
    pub fn position(&self) -> usize {
        match self {
            Op::Retain { position, .. }
            | Op::Insert { position, .. }
            | Op::Delete { position, .. } => *position,
        }
    }

    pub fn is_retain(&self) -> bool {
        matches!(self, Op::Retain { .. })
    }
}

/// Convert a character diff into an operation list
pub fn ops_from_diff(entries: &[CharDiff]) -> Vec<Op> {
    let mut ops = Vec::with_capacity(entries.len());
    // Cursor into the left (base) string; insertions don't consume base
    // characters, so consecutive additions share an anchor.
    let mut cursor = 0usize;
    for entry in entries {
        match entry {
            CharDiff::Unchanged(_) => {
                ops.push(Op::retain(1, cursor));
                cursor += 1;
            }
            CharDiff::Removed(_) => {
                ops.push(Op::delete(1, cursor));
                cursor += 1;
            }
            CharDiff::Added(c) => {
                ops.push(Op::insert(c.to_string(), cursor));
            }
        }
    }
    ops
}

/// Merge runs of adjacent same-kind operations for transport.
///
/// Equivalent under [`apply`](crate::apply); not valid input to
/// [`transform`](crate::transform), which needs single-character ops.
pub fn coalesce(ops: Vec<Op>) -> Vec<Op> {
    let mut merged: Vec<Op> = Vec::with_capacity(ops.len());
    for op in ops {
        let absorbed = match (merged.last_mut(), &op) {
            (
                Some(Op::Retain { length, position }),
                Op::Retain {
                    length: next_len,
                    position: next_pos,
                },
            ) if *next_pos == *position + *length => {
                *length += next_len;
                true
            }
            (
                Some(Op::Delete { length, position }),
                Op::Delete {
                    length: next_len,
                    position: next_pos,
                },
            ) if *next_pos == *position + *length => {
                *length += next_len;
                true
            }
            (
                Some(Op::Insert { text, position }),
                Op::Insert {
                    text: next_text,
                    position: next_pos,
                },
            ) if next_pos == position => {
                text.push_str(next_text);
                true
            }
            _ => false,
        };
        if !absorbed {
            merged.push(op);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use notewell_diff::diff;

    #[test]
    fn cursor_walk_matches_diff_entries() {
        // "cat" -> "cart"
        let ops = ops_from_diff(&diff("cat", "cart"));
        assert_eq!(
            ops,
            vec![
                Op::retain(1, 0),
                Op::retain(1, 1),
                Op::insert("r", 2),
                Op::retain(1, 2),
            ]
        );
    }

    #[test]
    fn insertions_do_not_advance_the_cursor() {
        let ops = ops_from_diff(&diff("", "hi"));
        assert_eq!(ops, vec![Op::insert("h", 0), Op::insert("i", 0)]);
    }

    #[test]
    fn removals_advance_the_cursor() {
        let ops = ops_from_diff(&diff("ab", "b"));
        assert_eq!(ops, vec![Op::delete(1, 0), Op::retain(1, 1)]);
    }

    #[test]
    fn coalesce_merges_contiguous_runs() {
        let ops = vec![
            Op::retain(1, 0),
            Op::retain(1, 1),
            Op::insert("h", 2),
            Op::insert("i", 2),
            Op::delete(1, 2),
            Op::delete(1, 3),
        ];
        assert_eq!(
            coalesce(ops),
            vec![Op::retain(2, 0), Op::insert("hi", 2), Op::delete(2, 2)]
        );
    }

    #[test]
    fn coalesce_keeps_disjoint_runs_apart() {
        let ops = vec![Op::delete(1, 0), Op::delete(1, 2)];
        assert_eq!(coalesce(ops.clone()), ops);
    }

    #[test]
    fn wire_encoding_is_tagged_by_type() {
        let json = serde_json::to_value(Op::insert("r", 2)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "insert", "text": "r", "position": 2})
        );
        let json = serde_json::to_value(Op::delete(3, 1)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "delete", "length": 3, "position": 1})
        );

        let op: Op = serde_json::from_str(r#"{"type":"retain","length":1,"position":0}"#).unwrap();
        assert_eq!(op, Op::retain(1, 0));
    }
}
