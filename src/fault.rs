//! The fault engine: owns the simulated memory for one subcase, installs and
//! applies the fault, and produces a detection record.
//!
//! Dispatch is a flat tagged enum — `OneCell` vs `TwoCell` — rather than a
//! class hierarchy, per the design notes: the two variants share a trigger
//! matcher and a detection record, but differ in how many cells they own
//! and in the aggressor/victim coordination rule.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::model::{Address, AddressOrder, Operation, OperationId};
use crate::trigger::{OperationRecord, TriggerMatcher, TriggerSpec};

/// Which coordinated cell a `TwoCell` engine's matcher is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRole {
    Aggressor,
    Victim,
}

/// Per-`(fault name, subcase index)` detection record: which operation
/// identifiers detected, and the set of addresses detection fired at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionRecord {
    per_op: BTreeMap<OperationId, bool>,
    addresses: BTreeSet<Address>,
}

impl DetectionRecord {
    pub(crate) fn record(&mut self, id: OperationId, detected: bool, addr: Address) {
        let entry = self.per_op.entry(id).or_insert(false);
        *entry = *entry || detected;
        if detected {
            self.addresses.insert(addr);
        }
    }

    /// Union-merges another record into this one (used to aggregate across
    /// the driver's two initial-memory-value runs).
    pub fn merge(&mut self, other: &DetectionRecord) {
        for (id, detected) in &other.per_op {
            let entry = self.per_op.entry(*id).or_insert(false);
            *entry = *entry || *detected;
        }
        self.addresses.extend(other.addresses.iter().copied());
    }

    /// Whether at least one read detected a mismatch anywhere in this
    /// subcase — the generator's acceptance predicate.
    pub fn any_detected(&self) -> bool {
        self.per_op.values().any(|&v| v)
    }

    pub fn per_op(&self) -> &BTreeMap<OperationId, bool> {
        &self.per_op
    }

    pub fn addresses(&self) -> &BTreeSet<Address> {
        &self.addresses
    }
}

/// A cell-level fault: a programmable trigger (initial value plus optional
/// operation sequence) on a victim cell, optionally coordinated with an
/// aggressor cell.
pub enum FaultEngine {
    OneCell {
        victim_addr: Address,
        victim_val: u8,
        matcher: TriggerMatcher,
        final_f: u8,
        final_r: Option<u8>,
        triggered: bool,
        detection: DetectionRecord,
    },
    TwoCell {
        victim_addr: Address,
        aggressor_addr: Address,
        victim_val: u8,
        aggressor_val: u8,
        matcher: TriggerMatcher,
        matcher_on: CellRole,
        /// The live value the *other* coordinated cell must hold for the
        /// trigger to arm (carried as a side predicate alongside the
        /// matcher's own prefix match).
        coupled_value: u8,
        final_f: u8,
        final_r: Option<u8>,
        triggered: bool,
        detection: DetectionRecord,
    },
}

impl FaultEngine {
    pub fn new_one_cell(
        victim_addr: Address,
        starting_value: u8,
        initial: u8,
        sequence: Vec<Operation>,
        final_f: u8,
        final_r: Option<u8>,
    ) -> Result<Self> {
        let spec = TriggerSpec::new(initial, sequence)?;
        Ok(FaultEngine::OneCell {
            victim_addr,
            victim_val: starting_value,
            matcher: TriggerMatcher::new(spec),
            final_f,
            final_r,
            triggered: false,
            detection: DetectionRecord::default(),
        })
    }

    pub fn new_two_cell(
        victim_addr: Address,
        aggressor_addr: Address,
        starting_value: u8,
        matcher_on: CellRole,
        matcher_initial: u8,
        matcher_sequence: Vec<Operation>,
        coupled_value: u8,
        final_f: u8,
        final_r: Option<u8>,
    ) -> Result<Self> {
        let spec = TriggerSpec::new(matcher_initial, matcher_sequence)?;
        Ok(FaultEngine::TwoCell {
            victim_addr,
            aggressor_addr,
            victim_val: starting_value,
            aggressor_val: starting_value,
            matcher: TriggerMatcher::new(spec),
            matcher_on,
            coupled_value,
            final_f,
            final_r,
            triggered: false,
            detection: DetectionRecord::default(),
        })
    }

    fn owns(&self, addr: Address) -> bool {
        match self {
            FaultEngine::OneCell { victim_addr, .. } => addr == *victim_addr,
            FaultEngine::TwoCell { victim_addr, aggressor_addr, .. } => {
                addr == *victim_addr || addr == *aggressor_addr
            }
        }
    }

    /// Addresses this engine owns, in the order a March element with the
    /// given address-order tag should visit them.
    pub fn owned_addresses(&self, order: AddressOrder) -> Vec<Address> {
        match self {
            FaultEngine::OneCell { victim_addr, .. } => vec![*victim_addr],
            FaultEngine::TwoCell { victim_addr, aggressor_addr, .. } => {
                let mut addrs = vec![*victim_addr, *aggressor_addr];
                addrs.sort_unstable();
                if order == AddressOrder::Descending {
                    addrs.reverse();
                }
                addrs
            }
        }
    }

    fn matcher_addr(&self) -> Address {
        match self {
            FaultEngine::OneCell { victim_addr, .. } => *victim_addr,
            FaultEngine::TwoCell { victim_addr, aggressor_addr, matcher_on, .. } => {
                match matcher_on {
                    CellRole::Aggressor => *aggressor_addr,
                    CellRole::Victim => *victim_addr,
                }
            }
        }
    }

    fn current_value(&self, addr: Address) -> u8 {
        match self {
            FaultEngine::OneCell { victim_val, .. } => *victim_val,
            FaultEngine::TwoCell { victim_addr, victim_val, aggressor_val, .. } => {
                if addr == *victim_addr {
                    *victim_val
                } else {
                    *aggressor_val
                }
            }
        }
    }

    fn side_predicate_ok(&self) -> bool {
        match self {
            FaultEngine::OneCell { .. } => true,
            FaultEngine::TwoCell { matcher_on, coupled_value, victim_val, aggressor_val, .. } => {
                match matcher_on {
                    CellRole::Aggressor => *victim_val == *coupled_value,
                    CellRole::Victim => *aggressor_val == *coupled_value,
                }
            }
        }
    }

    fn inject(&mut self) {
        match self {
            FaultEngine::OneCell { victim_val, final_f, triggered, .. } => {
                *triggered = true;
                *victim_val = *final_f;
            }
            FaultEngine::TwoCell { victim_val, final_f, triggered, .. } => {
                *triggered = true;
                *victim_val = *final_f;
            }
        }
    }

    fn final_r(&self) -> Option<u8> {
        match self {
            FaultEngine::OneCell { final_r, .. } => *final_r,
            FaultEngine::TwoCell { final_r, .. } => *final_r,
        }
    }

    /// Clears the sliding trigger window. Called at every March-element
    /// boundary by the executor. Does *not* reset `triggered` or the
    /// detection record — that is `reset()`'s job.
    pub fn clear_element_window(&mut self) {
        match self {
            FaultEngine::OneCell { matcher, .. } => matcher.clear_window(),
            FaultEngine::TwoCell { matcher, .. } => matcher.clear_window(),
        }
    }

    /// Full lifecycle reset: clears history, `triggered`, and the detection
    /// record under construction, but retains the installed trigger,
    /// injection values, and cell placements.
    pub fn reset(&mut self) {
        self.clear_element_window();
        match self {
            FaultEngine::OneCell { triggered, detection, .. } => {
                *triggered = false;
                *detection = DetectionRecord::default();
            }
            FaultEngine::TwoCell { triggered, detection, .. } => {
                *triggered = false;
                *detection = DetectionRecord::default();
            }
        }
    }

    pub fn detection(&self) -> &DetectionRecord {
        match self {
            FaultEngine::OneCell { detection, .. } => detection,
            FaultEngine::TwoCell { detection, .. } => detection,
        }
    }

    /// Applies a WRITE at `addr`. Updates the cell value; if `addr` is the
    /// trigger-bearing cell, records history and arms the fault if the
    /// matcher (and, for `TwoCell`, the side predicate) now matches.
    pub fn on_write(&mut self, addr: Address, id: OperationId, op: Operation) -> Result<()> {
        if !self.owns(addr) {
            return Err(Error::Engine {
                reason: format!("write to address {addr} not owned by this engine"),
            });
        }
        let before = self.current_value(addr);
        match self {
            FaultEngine::OneCell { victim_val, .. } => *victim_val = op.value,
            FaultEngine::TwoCell { victim_addr, victim_val, aggressor_val, .. } => {
                if addr == *victim_addr {
                    *victim_val = op.value;
                } else {
                    *aggressor_val = op.value;
                }
            }
        }
        let _ = id; // writes never produce detection entries.
        if addr == self.matcher_addr() {
            let current = self.current_value(addr);
            let matched = self.matcher_observe(OperationRecord { before, op }, current);
            if matched && self.side_predicate_ok() {
                self.inject();
            }
        }
        Ok(())
    }

    fn matcher_observe(&mut self, record: OperationRecord, current_value: u8) -> bool {
        match self {
            FaultEngine::OneCell { matcher, .. } => matcher.observe(record, current_value),
            FaultEngine::TwoCell { matcher, .. } => matcher.observe(record, current_value),
        }
    }

    /// Applies a READ at `addr`. Records history on the trigger-bearing
    /// cell, evaluates the matcher, injects on a fresh match, and computes
    /// the returned value. Always materializes a (possibly `false`)
    /// detection entry for `id`, dense per spec.
    pub fn on_read(&mut self, addr: Address, id: OperationId, op: Operation) -> Result<u8> {
        if !self.owns(addr) {
            return Err(Error::Engine {
                reason: format!("read from address {addr} not owned by this engine"),
            });
        }
        let before = self.current_value(addr);
        let mut matched_now = false;
        if addr == self.matcher_addr() {
            matched_now = self.matcher_observe(OperationRecord { before, op }, before);
            if matched_now && self.side_predicate_ok() {
                self.inject();
            } else {
                matched_now = false;
            }
        }

        let returned = if matched_now && self.final_r().is_some() {
            self.final_r().expect("checked is_some above")
        } else {
            self.current_value(addr)
        };

        let detected = returned != op.value;
        let detection = match self {
            FaultEngine::OneCell { detection, .. } => detection,
            FaultEngine::TwoCell { detection, .. } => detection,
        };
        detection.record(id, detected, addr);

        Ok(returned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Operation, OperationId};

    #[test]
    fn one_cell_stuck_at_fault_detects_on_read() {
        // VI=1, seqV=[W1], finalF=0, finalR unset. Background victim=1.
        let mut engine =
            FaultEngine::new_one_cell(0, 1, 1, vec![Operation::write(1)], 0, None).unwrap();
        engine.on_write(0, OperationId::new(0, 0), Operation::write(1)).unwrap();
        let returned = engine.on_read(0, OperationId::new(0, 1), Operation::read(1)).unwrap();
        assert_eq!(returned, 0);
        assert!(engine.detection().per_op().get(&OperationId::new(0, 1)) == Some(&true));
    }

    #[test]
    fn no_fault_means_no_detection() {
        // finalF equals the expected value: the injected value can never
        // disagree with a correctly-written-then-read cell.
        let mut engine =
            FaultEngine::new_one_cell(0, 1, 1, vec![Operation::write(1)], 1, None).unwrap();
        engine.on_write(0, OperationId::new(0, 0), Operation::write(1)).unwrap();
        let returned = engine.on_read(0, OperationId::new(0, 1), Operation::read(1)).unwrap();
        assert_eq!(returned, 1);
        assert_eq!(engine.detection().per_op().get(&OperationId::new(0, 1)), Some(&false));
        assert!(!engine.detection().any_detected());
    }

    #[test]
    fn value_only_trigger_fires_immediately_on_matching_value() {
        let mut engine = FaultEngine::new_one_cell(0, 1, 1, vec![], 0, None).unwrap();
        let returned = engine.on_read(0, OperationId::new(0, 0), Operation::read(1)).unwrap();
        assert_eq!(returned, 0);
        assert!(engine.detection().any_detected());
    }

    #[test]
    fn write_to_unowned_address_is_rejected() {
        let mut engine = FaultEngine::new_one_cell(0, 0, 0, vec![], 0, None).unwrap();
        let err = engine.on_write(1, OperationId::new(0, 0), Operation::write(0));
        assert!(err.is_err());
    }

    #[test]
    fn element_boundary_resets_window_without_clearing_detection() {
        // seqV=[W1,R1]: straddling a boundary must not match.
        let mut engine = FaultEngine::new_one_cell(
            0,
            0,
            0,
            vec![Operation::write(1), Operation::read(1)],
            1,
            None,
        )
        .unwrap();
        engine.on_write(0, OperationId::new(0, 0), Operation::write(1)).unwrap();
        engine.clear_element_window();
        let returned = engine.on_read(0, OperationId::new(1, 0), Operation::read(1)).unwrap();
        // No match across the boundary: cell holds 1 (from the write),
        // read expects 1, no mismatch.
        assert_eq!(returned, 1);
        assert!(!engine.detection().any_detected());
    }

    #[test]
    fn element_boundary_not_crossed_does_detect() {
        let mut engine = FaultEngine::new_one_cell(
            0,
            0,
            0,
            vec![Operation::write(1), Operation::read(1)],
            1,
            None,
        )
        .unwrap();
        engine.on_write(0, OperationId::new(0, 0), Operation::write(1)).unwrap();
        let returned = engine.on_read(0, OperationId::new(0, 1), Operation::read(1)).unwrap();
        assert_eq!(returned, 1);
        assert!(engine.detection().any_detected());
    }

    #[test]
    fn two_cell_saa_coupling_injects_victim_on_aggressor_trigger() {
        // Saa: matcher on aggressor, seqA=[W1], AI=0; side predicate VI=0 on victim.
        let mut engine = FaultEngine::new_two_cell(
            1,
            0,
            0,
            CellRole::Aggressor,
            0,
            vec![Operation::write(1)],
            0,
            1,
            None,
        )
        .unwrap();
        // Write 1 to the aggressor: matches seqA with before=0==AI, side
        // predicate victim==0 holds: injects victim with finalF=1.
        engine.on_write(0, OperationId::new(1, 0), Operation::write(1)).unwrap();
        let returned = engine.on_read(1, OperationId::new(1, 1), Operation::read(0)).unwrap();
        assert_eq!(returned, 1);
        assert!(engine.detection().any_detected());
    }

    #[test]
    fn two_cell_side_predicate_blocks_injection_when_not_satisfied() {
        // Same as above but victim starts at 1, so the VI=0 side predicate
        // never holds: no injection should occur.
        let mut engine = FaultEngine::new_two_cell(
            1,
            0,
            1,
            CellRole::Aggressor,
            0,
            vec![Operation::write(1)],
            0,
            1,
            None,
        )
        .unwrap();
        engine.on_write(0, OperationId::new(0, 0), Operation::write(1)).unwrap();
        let returned = engine.on_read(1, OperationId::new(0, 1), Operation::read(1)).unwrap();
        assert_eq!(returned, 1);
        assert!(!engine.detection().any_detected());
    }

    #[test]
    fn reset_clears_detection_and_triggered_but_keeps_placement() {
        let mut engine = FaultEngine::new_one_cell(0, 1, 1, vec![], 0, None).unwrap();
        engine.on_read(0, OperationId::new(0, 0), Operation::read(1)).unwrap();
        assert!(engine.detection().any_detected());
        engine.reset();
        assert!(!engine.detection().any_detected());
        assert!(engine.detection().per_op().is_empty());
    }

    #[test]
    fn detection_keys_are_exactly_the_read_operation_ids() {
        let mut engine = FaultEngine::new_one_cell(0, 0, 0, vec![], 0, None).unwrap();
        engine.on_write(0, OperationId::new(0, 0), Operation::write(1)).unwrap();
        engine.on_read(0, OperationId::new(0, 1), Operation::read(1)).unwrap();
        let keys: Vec<_> = engine.detection().per_op().keys().copied().collect();
        assert_eq!(keys, vec![OperationId::new(0, 1)]);
    }
}
