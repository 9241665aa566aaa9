//! The simulator driver: for each fault subcase and each initial memory
//! value, instantiates a fault engine, allocates addresses, runs the
//! executor, and aggregates the detection report.
//!
//! The only non-determinism anywhere in the core is the seeded PRNG used
//! for address placement, owned here and threaded through every subcase in
//! catalogue order — so the same catalogue, program, dimensions, and seed
//! always reproduce the same report, byte for byte.

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::allocator::{self, PositionCode};
use crate::catalogue::{Catalogue, CouplingTrigger, Subcase};
use crate::executor;
use crate::fault::{CellRole, DetectionRecord, FaultEngine};
use crate::error::Result;
use crate::model::MarchProgram;

/// The merged detection record for one subcase, plus its human-readable
/// trigger-info label for reporting.
#[derive(Debug, Clone)]
pub struct SubcaseReport {
    pub label: String,
    pub detection: DetectionRecord,
}

/// The detection reports for one fault primitive's subcases, in catalogue
/// order.
#[derive(Debug, Clone)]
pub struct FaultReport {
    pub name: String,
    pub subcases: Vec<SubcaseReport>,
}

/// The full simulation report: one `FaultReport` per catalogue entry.
#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    pub faults: Vec<FaultReport>,
}

impl SimulationReport {
    /// Whether every subcase of every fault primitive detected at least one
    /// read mismatch — the generator's acceptance predicate.
    pub fn fully_detected(&self) -> bool {
        self.faults.iter().all(|f| f.subcases.iter().all(|s| s.detection.any_detected()))
    }
}

/// Runs `program` against every subcase in `catalogue`, on a `rows x cols`
/// grid, seeded with `seed`.
pub fn run(
    catalogue: &Catalogue,
    program: &MarchProgram,
    rows: usize,
    cols: usize,
    seed: u64,
) -> Result<SimulationReport> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut faults = Vec::with_capacity(catalogue.faults.len());
    for primitive in &catalogue.faults {
        let mut subcases = Vec::with_capacity(primitive.subcases.len());
        for subcase in &primitive.subcases {
            let mut aggregated = DetectionRecord::default();
            for starting_value in [0u8, 1u8] {
                let mut engine = instantiate(subcase, rows, cols, starting_value, &mut rng)?;
                executor::run(&mut engine, program)?;
                aggregated.merge(engine.detection());
            }
            subcases.push(SubcaseReport { label: subcase.trigger_info(), detection: aggregated });
        }
        faults.push(FaultReport { name: primitive.name.clone(), subcases });
    }
    Ok(SimulationReport { faults })
}

fn instantiate(
    subcase: &Subcase,
    rows: usize,
    cols: usize,
    starting_value: u8,
    rng: &mut SmallRng,
) -> Result<FaultEngine> {
    match subcase {
        Subcase::Single(s) => {
            let victim_addr = allocator::allocate_single(rows, cols, rng)?;
            FaultEngine::new_one_cell(
                victim_addr,
                starting_value,
                s.vi,
                s.seq_v.clone(),
                s.final_f,
                s.final_r,
            )
        }
        Subcase::Two(t) => {
            let position = t.position;
            let allocator_position = match position {
                PositionCode::AggBeforeVic => PositionCode::AggBeforeVic,
                PositionCode::AggAfterVic => PositionCode::AggAfterVic,
            };
            let (aggressor_addr, victim_addr) =
                allocator::allocate_coupling(rows, cols, allocator_position, rng)?;
            let (matcher_on, matcher_initial, matcher_sequence, coupled_value) = match &t.trigger {
                CouplingTrigger::Saa(seq) => (CellRole::Aggressor, t.ai, seq.clone(), t.vi),
                CouplingTrigger::Svv(seq) => (CellRole::Victim, t.vi, seq.clone(), t.ai),
            };
            FaultEngine::new_two_cell(
                victim_addr,
                aggressor_addr,
                starting_value,
                matcher_on,
                matcher_initial,
                matcher_sequence,
                coupled_value,
                t.final_f,
                t.final_r,
            )
        }
    }
}
