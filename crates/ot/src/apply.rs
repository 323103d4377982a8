//! Execute an operation list against a note revision.

use crate::{Op, OtError};

/// Apply `ops` to `content`, producing the target revision.
///
/// Out-of-range positions surface as [`OtError`]; retains never fail.
pub fn apply(content: &str, ops: &[Op]) -> Result<String, OtError> {
    let mut chars: Vec<char> = content.chars().collect();

    // Stable sort keeps same-anchor inserts in authored order.
    let mut sorted: Vec<&Op> = ops.iter().collect();
    sorted.sort_by_key(|op| op.position());

    let mut offset: i64 = 0;
    for op in sorted {
        match op {
            Op::Retain { .. } => {}
            Op::Insert { text, position } => {
                let at = shifted(*position, offset, chars.len())?;
                chars.splice(at..at, text.chars());
                offset += text.chars().count() as i64;
            }
            Op::Delete { length, position } => {
                let at = shifted(*position, offset, chars.len())?;
                let end = at + *length;
                if end > chars.len() {
                    return Err(OtError::RangeOutOfBounds {
                        position: *position,
                        length: *length,
                        len: chars.len(),
                    });
                }
                chars.drain(at..end);
                offset -= *length as i64;
            }
        }
    }

    Ok(chars.into_iter().collect())
}

fn shifted(position: usize, offset: i64, len: usize) -> Result<usize, OtError> {
    let at = position as i64 + offset;
    if at < 0 || at > len as i64 {
        return Err(OtError::PositionOutOfBounds { position, len });
    }
    Ok(at as usize)
}
