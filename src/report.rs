//! Renders a `SimulationReport` as the text file format `spec.md` §6
//! describes: per-subcase human-readable tuple, binary and hex syndromes,
//! detected positions, and the literal `undetected` when nothing fired.

use std::fmt::Write as _;

use crate::driver::SimulationReport;
use crate::model::OperationId;

/// Renders the full report as text, one fault primitive after another, each
/// subcase in catalogue order.
pub fn render(report: &SimulationReport) -> String {
    let mut out = String::new();
    for fault in &report.faults {
        let _ = writeln!(out, "fault: {}", fault.name);
        for (index, subcase) in fault.subcases.iter().enumerate() {
            render_subcase(&mut out, index, subcase);
        }
        out.push('\n');
    }
    out
}

fn render_subcase(out: &mut String, index: usize, subcase: &crate::driver::SubcaseReport) {
    let _ = writeln!(out, "  subcase {index}: {}", subcase.label);

    let ids: Vec<OperationId> = subcase.detection.per_op().keys().copied().collect();
    let bits: Vec<bool> = ids.iter().map(|id| subcase.detection.per_op()[id]).collect();

    let binary: String = bits.iter().map(|&b| if b { '1' } else { '0' }).collect();
    let _ = writeln!(out, "    binary:  {binary}");
    let _ = writeln!(out, "    hex:     {}", to_hex(&bits));

    if subcase.detection.any_detected() {
        let positions: Vec<String> = ids
            .iter()
            .zip(bits.iter())
            .filter(|(_, &detected)| detected)
            .map(|(id, _)| format!("({}, {})", id.element_index, id.op_index))
            .collect();
        let _ = writeln!(out, "    detected at: {}", positions.join(", "));
    } else {
        let _ = writeln!(out, "    undetected");
    }
}

/// Groups the bit vector into nibbles, most-significant bit first within
/// each nibble, zero-padding the final short group, and renders as hex.
fn to_hex(bits: &[bool]) -> String {
    if bits.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for chunk in bits.chunks(4) {
        let mut nibble = 0u8;
        for (i, &bit) in chunk.iter().enumerate() {
            if bit {
                nibble |= 1 << (3 - i);
            }
        }
        let _ = write!(out, "{nibble:x}");
    }
    out
}
