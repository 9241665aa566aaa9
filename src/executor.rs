//! Applies a March program to a fault engine in the correct address order,
//! driving its read/write callbacks.
//!
//! Two properties matter here and nowhere else: the element boundary clears
//! the matcher's sliding window (a fault must not trigger on a sequence
//! that straddles two elements), and for each address every op in the
//! element runs before moving to the next address.

use crate::error::Result;
use crate::fault::FaultEngine;
use crate::model::{MarchProgram, OpKind, OperationId};

/// Runs `program` against `engine`, address-by-address, element-by-element.
pub fn run(engine: &mut FaultEngine, program: &MarchProgram) -> Result<()> {
    for (element_index, element) in program.elements.iter().enumerate() {
        let addresses = engine.owned_addresses(element.order);
        for addr in addresses {
            for (op_index, op) in element.ops.iter().enumerate() {
                let id = OperationId::new(element_index, op_index);
                match op.kind {
                    OpKind::Write => {
                        engine.on_write(addr, id, *op)?;
                    }
                    OpKind::Read => {
                        engine.on_read(addr, id, *op)?;
                    }
                }
            }
        }
        engine.clear_element_window();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultEngine;
    use crate::model::{AddressOrder, MarchElement, MarchProgram, Operation};

    #[test]
    fn executes_every_address_before_advancing_element() {
        let program = MarchProgram::new(vec![MarchElement::new(
            AddressOrder::Ascending,
            vec![Operation::write(1), Operation::read(1)],
        )])
        .unwrap();
        let mut engine = FaultEngine::new_one_cell(0, 0, 0, vec![], 0, None).unwrap();
        run(&mut engine, &program).unwrap();
        assert!(!engine.detection().any_detected());
    }

    #[test]
    fn straddling_sequence_does_not_trigger_across_elements() {
        let program = MarchProgram::new(vec![
            MarchElement::new(AddressOrder::Ascending, vec![Operation::write(1)]),
            MarchElement::new(AddressOrder::Ascending, vec![Operation::read(1)]),
        ])
        .unwrap();
        let mut engine = FaultEngine::new_one_cell(
            0,
            0,
            0,
            vec![Operation::write(1), Operation::read(1)],
            1,
            None,
        )
        .unwrap();
        run(&mut engine, &program).unwrap();
        assert!(!engine.detection().any_detected());
    }

    #[test]
    fn same_element_sequence_does_trigger() {
        let program = MarchProgram::new(vec![MarchElement::new(
            AddressOrder::Ascending,
            vec![Operation::write(1), Operation::read(1)],
        )])
        .unwrap();
        let mut engine = FaultEngine::new_one_cell(
            0,
            0,
            0,
            vec![Operation::write(1), Operation::read(1)],
            0,
            None,
        )
        .unwrap();
        run(&mut engine, &program).unwrap();
        assert!(engine.detection().any_detected());
    }
}
