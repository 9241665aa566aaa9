//! The per-cell trigger state machine: a sliding-window prefix matcher over
//! a cell's operation history, with an initial-value predicate and
//! element-boundary reset.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::model::Operation;

/// One `(beforeValue, op)` pair observed on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRecord {
    pub before: u8,
    pub op: Operation,
}

/// A trigger specification: an initial value `TV` and an ordered operation
/// sequence `S` (possibly empty). `S` empty means a pure value-equality
/// trigger: always checked against the live cell value, never the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpec {
    initial: u8,
    sequence: Vec<Operation>,
}

impl TriggerSpec {
    /// Validates the trigger at construction time: a non-empty sequence
    /// requires an initial value (callers pass one unconditionally here
    /// because every subcase form in the catalogue carries `VI`/`AI`; this
    /// constructor exists so a programmatically-built trigger is rejected
    /// the same way a catalogue-loaded one would be).
    pub fn new(initial: u8, sequence: Vec<Operation>) -> Result<Self> {
        if initial > 1 {
            return Err(Error::Catalogue {
                reason: format!("trigger initial value must be 0 or 1, got {initial}"),
            });
        }
        Ok(Self { initial, sequence })
    }

    pub fn window_len(&self) -> usize {
        self.sequence.len()
    }
}

/// Sliding-window matcher, backed by a fixed-capacity ring sized to the
/// trigger sequence length. Owned exclusively by one fault engine; never
/// shared or reused across subcases.
#[derive(Debug, Clone)]
pub struct TriggerMatcher {
    spec: TriggerSpec,
    window: VecDeque<OperationRecord>,
}

impl TriggerMatcher {
    pub fn new(spec: TriggerSpec) -> Self {
        let capacity = spec.window_len();
        Self { spec, window: VecDeque::with_capacity(capacity) }
    }

    /// Clears the sliding window. Called at every March-element boundary
    /// and by the engine's full `reset()`. Has no persistent state beyond
    /// the window.
    pub fn clear_window(&mut self) {
        self.window.clear();
    }

    /// Feeds one observed operation record and the cell's value *after*
    /// this operation (for writes, the value it was just set to; for reads,
    /// the unchanged live value) and returns whether the trigger now fires.
    pub fn observe(&mut self, record: OperationRecord, current_value: u8) -> bool {
        if self.spec.sequence.is_empty() {
            return current_value == self.spec.initial;
        }

        let capacity = self.spec.sequence.len();
        self.window.push_back(record);
        while self.window.len() > capacity {
            self.window.pop_front();
        }
        if self.window.len() < capacity {
            return false;
        }

        let tv_ok = self.window.front().expect("window full").before == self.spec.initial;
        let seq_ok = self
            .window
            .iter()
            .zip(self.spec.sequence.iter())
            .all(|(rec, want)| rec.op == *want);
        tv_ok && seq_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Operation;

    fn rec(before: u8, op: Operation) -> OperationRecord {
        OperationRecord { before, op }
    }

    #[test]
    fn value_only_trigger_checks_live_value_not_history() {
        let spec = TriggerSpec::new(1, vec![]).unwrap();
        let mut m = TriggerMatcher::new(spec);
        // current_value passed directly; no history accumulates.
        assert!(!m.observe(rec(0, Operation::write(0)), 0));
        assert!(m.observe(rec(0, Operation::write(1)), 1));
        assert!(m.window.is_empty());
    }

    #[test]
    fn sequence_trigger_requires_full_window_and_matching_tv() {
        let spec = TriggerSpec::new(1, vec![Operation::write(1)]).unwrap();
        let mut m = TriggerMatcher::new(spec);
        // before=0 != TV(1): op matches the sequence shape but TV fails.
        assert!(!m.observe(rec(0, Operation::write(1)), 1));
        // before=1 == TV(1), op matches: fires.
        assert!(m.observe(rec(1, Operation::write(1)), 1));
    }

    #[test]
    fn shorter_history_never_matches_when_sequence_nonempty() {
        let spec = TriggerSpec::new(0, vec![Operation::write(0), Operation::read(0)]).unwrap();
        let mut m = TriggerMatcher::new(spec);
        // Only one record so far; window length 1 < capacity 2.
        assert!(!m.observe(rec(0, Operation::write(0)), 0));
    }

    #[test]
    fn two_step_sequence_matches_in_order() {
        let spec = TriggerSpec::new(0, vec![Operation::write(0), Operation::read(0)]).unwrap();
        let mut m = TriggerMatcher::new(spec);
        assert!(!m.observe(rec(1, Operation::write(0)), 0));
        assert!(m.observe(rec(0, Operation::read(0)), 0));
    }

    #[test]
    fn clear_window_resets_partial_match_progress() {
        let spec = TriggerSpec::new(0, vec![Operation::write(0), Operation::read(0)]).unwrap();
        let mut m = TriggerMatcher::new(spec);
        assert!(!m.observe(rec(0, Operation::write(0)), 0));
        m.clear_window();
        // The read alone, with an empty window ahead of it, cannot match a
        // two-element sequence.
        assert!(!m.observe(rec(0, Operation::read(0)), 0));
    }

    #[test]
    fn mismatched_op_in_sequence_never_matches() {
        let spec = TriggerSpec::new(0, vec![Operation::write(1)]).unwrap();
        let mut m = TriggerMatcher::new(spec);
        assert!(!m.observe(rec(0, Operation::write(0)), 0));
    }

    proptest::proptest! {
        /// For any trigger sequence length and any stream of fed records,
        /// the window never holds more than `|S|` records and always holds
        /// the most recently observed ones, oldest-first.
        #[test]
        fn window_never_exceeds_sequence_length(
            seq_len in 0usize..6,
            feed_len in 0usize..20,
            values in proptest::collection::vec(0u8..2, 0..20),
        ) {
            let sequence = vec![Operation::write(0); seq_len];
            let spec = TriggerSpec::new(0, sequence).unwrap();
            let mut m = TriggerMatcher::new(spec);
            let mut fed = Vec::new();
            for i in 0..feed_len.min(values.len()) {
                let before = values[i];
                let record = rec(before, Operation::write(before));
                fed.push(record);
                m.observe(record, before);
                proptest::prop_assert!(m.window.len() <= seq_len);
                let expected_tail: Vec<_> =
                    fed[fed.len().saturating_sub(m.window.len())..].to_vec();
                proptest::prop_assert_eq!(m.window.iter().copied().collect::<Vec<_>>(), expected_tail);
            }
        }
    }
}
