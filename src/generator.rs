//! Depth-first search over short operation sequences, wrapping each
//! candidate into a canonical six-element March program and accepting the
//! first one the simulator driver detects every catalogue subcase against.
//!
//! The search is a plain recursion over an explicit candidate stack, not a
//! chain of iterator adapters — the transition-pruning table is easiest to
//! read as a guard at the point a candidate operation is pushed.

use crate::catalogue::Catalogue;
use crate::driver;
use crate::error::Result;
use crate::model::{AddressOrder, MarchElement, MarchProgram, OpKind, Operation};

/// The search alphabet, in the fixed lexicographic order the DFS explores:
/// `W0, W1, R0, R1`.
const ALPHABET: [Operation; 4] = [
    Operation { kind: OpKind::Write, value: 0 },
    Operation { kind: OpKind::Write, value: 1 },
    Operation { kind: OpKind::Read, value: 0 },
    Operation { kind: OpKind::Read, value: 1 },
];

/// A transition from `prev` to `next` is pruned when a read cannot
/// profitably follow a write or read of the opposite value on the same
/// cell: `W0->R1`, `W1->R0`, `R0->R1`, `R1->R0`.
fn is_pruned(prev: Operation, next: Operation) -> bool {
    use crate::model::OpKind::{Read, Write};
    matches!(
        (prev.kind, prev.value, next.kind, next.value),
        (Write, 0, Read, 1) | (Write, 1, Read, 0) | (Read, 0, Read, 1) | (Read, 1, Read, 0)
    )
}

/// Wraps a candidate sequence into the canonical six-element skeleton
/// (`spec.md` §4.6).
fn wrap(candidate: &[Operation]) -> Result<MarchProgram> {
    let dk = candidate.last().map(|op| op.value).unwrap_or(0);
    let not_dk = 1 - dk;
    let not_s: Vec<Operation> = candidate.iter().map(|op| op.flipped()).collect();
    let x = 0u8;
    let not_x = 1u8;

    let mut forward_s = vec![Operation::read(not_dk), Operation::write(x)];
    forward_s.extend(candidate.iter().copied());
    let mut forward_not_s = vec![Operation::read(dk), Operation::write(not_x)];
    forward_not_s.extend(not_s.iter().copied());

    MarchProgram::new(vec![
        MarchElement::new(AddressOrder::Any, vec![Operation::write(not_dk)]),
        MarchElement::new(AddressOrder::Ascending, forward_s.clone()),
        MarchElement::new(AddressOrder::Ascending, forward_not_s.clone()),
        MarchElement::new(AddressOrder::Descending, forward_s),
        MarchElement::new(AddressOrder::Descending, forward_not_s),
        MarchElement::new(AddressOrder::Any, vec![Operation::read(not_dk)]),
    ])
}

/// Whether the wrapped `candidate` detects every subcase in `catalogue`, on
/// a `rows x cols` grid seeded with `seed`.
fn accepts(
    catalogue: &Catalogue,
    candidate: &[Operation],
    rows: usize,
    cols: usize,
    seed: u64,
) -> Result<bool> {
    let program = wrap(candidate)?;
    let report = driver::run(catalogue, &program, rows, cols, seed)?;
    Ok(report.fully_detected())
}

/// Extends `candidate` by depth-first search until it reaches `length`,
/// returning the first accepted sequence found under the pruning rules and
/// the fixed alphabet order.
fn search(
    catalogue: &Catalogue,
    length: usize,
    rows: usize,
    cols: usize,
    seed: u64,
    candidate: &mut Vec<Operation>,
) -> Result<Option<Vec<Operation>>> {
    if candidate.len() == length {
        return if accepts(catalogue, candidate, rows, cols, seed)? {
            Ok(Some(candidate.clone()))
        } else {
            Ok(None)
        };
    }
    let last = candidate.last().copied();
    for &next in &ALPHABET {
        if let Some(prev) = last {
            if is_pruned(prev, next) {
                continue;
            }
        }
        candidate.push(next);
        if let Some(found) = search(catalogue, length, rows, cols, seed, candidate)? {
            return Ok(Some(found));
        }
        candidate.pop();
    }
    Ok(None)
}

/// Searches for a length-`length` operation sequence whose wrapped March
/// program detects every subcase in `catalogue`. Returns the wrapped
/// program, or an empty program if no candidate of that length qualifies.
pub fn generate(
    catalogue: &Catalogue,
    length: usize,
    rows: usize,
    cols: usize,
    seed: u64,
) -> Result<MarchProgram> {
    let mut candidate = Vec::with_capacity(length);
    match search(catalogue, length, rows, cols, seed, &mut candidate)? {
        Some(found) => wrap(&found),
        None => Ok(MarchProgram::empty()),
    }
}
