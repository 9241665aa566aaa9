//! Given a subcase's placement constraint, randomly chooses a valid
//! (aggressor, victim) address pair inside a rectangular `rows x cols` grid.
//!
//! Randomness is drawn from a seeded PRNG owned by the driver; the choice of
//! neighbour only stresses a concrete geometric placement — a correct fault
//! must be detected regardless of which one is picked.

use rand::Rng;

use crate::error::{Error, Result};
use crate::model::Address;

/// The relational position of the aggressor with respect to the victim, as
/// carried by a two-cell subcase's `A` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionCode {
    AggBeforeVic,
    AggAfterVic,
}

/// Uniformly samples a victim address with no aggressor.
pub fn allocate_single(rows: usize, cols: usize, rng: &mut impl Rng) -> Result<Address> {
    let total = grid_size(rows, cols)?;
    Ok(rng.gen_range(0..total))
}

/// Samples an `(aggressor, victim)` pair respecting `position`'s row/column
/// edge constraints.
pub fn allocate_coupling(
    rows: usize,
    cols: usize,
    position: PositionCode,
    rng: &mut impl Rng,
) -> Result<(Address, Address)> {
    let total = grid_size(rows, cols)?;
    match position {
        PositionCode::AggBeforeVic => {
            if total < 2 {
                return Err(Error::Engine {
                    reason: "grid too small to place an AGG-BEFORE-VIC pair".into(),
                });
            }
            let victim = rng.gen_range(1..total);
            let row = victim / cols;
            let col = victim % cols;
            let left = col > 0;
            let top = row > 0;
            let aggressor = match (left, top) {
                (true, true) => {
                    if rng.gen_bool(0.5) {
                        victim - 1
                    } else {
                        victim - cols
                    }
                }
                (true, false) => victim - 1,
                (false, true) => victim - cols,
                (false, false) => {
                    return Err(Error::Engine {
                        reason: format!("victim {victim} has no valid AGG-BEFORE-VIC neighbour"),
                    })
                }
            };
            Ok((aggressor, victim))
        }
        PositionCode::AggAfterVic => {
            if total < 2 {
                return Err(Error::Engine {
                    reason: "grid too small to place an AGG-AFTER-VIC pair".into(),
                });
            }
            let victim = rng.gen_range(0..total - 1);
            let row = victim / cols;
            let col = victim % cols;
            let right = col + 1 < cols;
            let bottom = row + 1 < rows;
            let aggressor = match (right, bottom) {
                (true, true) => {
                    if rng.gen_bool(0.5) {
                        victim + 1
                    } else {
                        victim + cols
                    }
                }
                (true, false) => victim + 1,
                (false, true) => victim + cols,
                (false, false) => {
                    return Err(Error::Engine {
                        reason: format!("victim {victim} has no valid AGG-AFTER-VIC neighbour"),
                    })
                }
            };
            Ok((aggressor, victim))
        }
    }
}

fn grid_size(rows: usize, cols: usize) -> Result<usize> {
    if rows == 0 || cols == 0 {
        return Err(Error::Engine { reason: "memory dimensions must be positive".into() });
    }
    Ok(rows * cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn single_cell_allocation_stays_in_grid() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..200 {
            let addr = allocate_single(3, 4, &mut rng).unwrap();
            assert!(addr < 12);
        }
    }

    #[test]
    fn agg_before_vic_respects_edge_constraints() {
        let mut rng = SmallRng::seed_from_u64(42);
        let rows = 4;
        let cols = 4;
        for _ in 0..500 {
            let (aggressor, victim) =
                allocate_coupling(rows, cols, PositionCode::AggBeforeVic, &mut rng).unwrap();
            assert!(victim >= 1 && victim < rows * cols);
            let victim_row = victim / cols;
            let victim_col = victim % cols;
            let is_left = aggressor == victim - 1 && victim_col > 0;
            let is_top = aggressor + cols == victim && victim_row > 0;
            assert!(is_left || is_top, "aggressor {aggressor} not a valid neighbour of {victim}");
        }
    }

    #[test]
    fn agg_after_vic_respects_edge_constraints() {
        let mut rng = SmallRng::seed_from_u64(99);
        let rows = 3;
        let cols = 5;
        for _ in 0..500 {
            let (aggressor, victim) =
                allocate_coupling(rows, cols, PositionCode::AggAfterVic, &mut rng).unwrap();
            assert!(victim < rows * cols - 1);
            let victim_row = victim / cols;
            let victim_col = victim % cols;
            let is_right = aggressor == victim + 1 && victim_col + 1 < cols;
            let is_bottom = aggressor == victim + cols && victim_row + 1 < rows;
            assert!(is_right || is_bottom, "aggressor {aggressor} not a valid neighbour of {victim}");
        }
    }

    #[test]
    fn single_column_forces_top_neighbour() {
        let mut rng = SmallRng::seed_from_u64(1);
        // cols=1 means every victim's only possible neighbour is "top".
        for _ in 0..50 {
            let (aggressor, victim) =
                allocate_coupling(5, 1, PositionCode::AggBeforeVic, &mut rng).unwrap();
            assert_eq!(aggressor, victim - 1);
        }
    }

    #[test]
    fn reproducible_given_same_seed() {
        let mut rng1 = SmallRng::seed_from_u64(123);
        let mut rng2 = SmallRng::seed_from_u64(123);
        for _ in 0..20 {
            assert_eq!(allocate_single(10, 10, &mut rng1), allocate_single(10, 10, &mut rng2));
        }
    }
}
