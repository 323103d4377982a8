//! Rebasing of concurrent operation lists.

use crate::Op;

/// Rebase `client` over `server`; ties resolve in the server's favor.
///
/// Only convergent for single-character ops, not general TP1/TP2.
pub fn transform(client: &[Op], server: &[Op]) -> Vec<Op> {
    let mut rebased = Vec::with_capacity(client.len());
    let mut offset: i64 = 0;
    let mut ci = 0;
    let mut si = 0;

    while ci < client.len() {
        let c = &client[ci];
        let Some(s) = server.get(si) else {
            rebased.push(shift(c, offset));
            ci += 1;
            continue;
        };

        if c.position() < s.position() {
            rebased.push(shift(c, offset));
            ci += 1;
        } else if c.position() > s.position() {
            // The server op sits to the left of everything still pending on
            // the client side; fold its length effect into the offset.
            offset += weight(s);
            si += 1;
        } else {
            match (c, s) {
                (Op::Insert { .. }, Op::Insert { .. }) => {
                    // Server wins the shared anchor; our insert follows it.
                    offset += weight(s);
                    rebased.push(shift(c, offset));
                }
                (Op::Delete { .. }, Op::Delete { .. }) => {
                    // The server already removed this range; drop the op.
                    offset += weight(s);
                }
                _ => {
                    rebased.push(shift(c, offset));
                    offset += weight(s);
                }
            }
            ci += 1;
            si += 1;
        }
    }

    rebased
}

/// Shift a server op imposes on positions to its right
fn weight(op: &Op) -> i64 {
    match op {
        Op::Retain { .. } => 0,
        Op::Insert { text, .. } => text.chars().count() as i64,
        Op::Delete { length, .. } => -(*length as i64),
    }
}

fn shift(op: &Op, offset: i64) -> Op {
    let moved = |position: usize| (position as i64 + offset).max(0) as usize;
    match op {
        Op::Retain { length, position } => Op::retain(*length, moved(*position)),
        Op::Insert { text, position } => Op::insert(text.clone(), moved(*position)),
        Op::Delete { length, position } => Op::delete(*length, moved(*position)),
    }
}
