//! Evaluator side: gate-by-gate label reconstruction under point-and-permute
//! table lookup, with no trial decryption.
//!
//! Ported from `original_source/src/pkg/evaluator.cxx`'s `evaluate_gate`:
//! the zero-row short-circuit and the `slot - 1` indexing into the
//! GRR3-reduced table.

use anyhow::{Result, bail};

use crate::channel::WireGate;
use crate::circuit::{Circuit, GateKind};
use crate::constants::DUMMY_RHS;
use crate::crypto::hash_labels;
use crate::label::Label;

/// Reconstruct the output label for a single gate, given its input
/// label(s) and (for AND/NOT) its GRR3-reduced table entries.
pub fn evaluate_gate(kind: GateKind, lhs: Label, rhs: Option<Label>, entries: &[Label]) -> Result<Label> {
    match kind {
        GateKind::Xor => {
            let rhs = rhs.ok_or_else(|| anyhow::anyhow!("XOR gate missing rhs label"))?;
            Ok(lhs.xor(&rhs))
        }
        GateKind::And => {
            let rhs = rhs.ok_or_else(|| anyhow::anyhow!("AND gate missing rhs label"))?;
            let slot = 2 * (lhs.permute_bit() as usize) + (rhs.permute_bit() as usize);
            let hash = Label::from_bytes(hash_labels(&lhs, &rhs));
            if slot == 0 {
                Ok(hash)
            } else {
                let entry = entries
                    .get(slot - 1)
                    .ok_or_else(|| anyhow::anyhow!("AND table missing entry for slot {}", slot))?;
                Ok(hash.xor(entry))
            }
        }
        GateKind::Not => {
            let dummy = Label::from_bytes(DUMMY_RHS);
            let slot = lhs.permute_bit() as usize;
            let hash = Label::from_bytes(hash_labels(&lhs, &dummy));
            if slot == 0 {
                Ok(hash)
            } else {
                let entry = entries
                    .first()
                    .ok_or_else(|| anyhow::anyhow!("NOT table missing its single entry"))?;
                Ok(hash.xor(entry))
            }
        }
    }
}

/// Walk every gate in order, producing a label for each wire. `input_labels`
/// must already hold one label per input wire (indices
/// `0..garbler_input_length + evaluator_input_length`); the rest are filled
/// in as gates are evaluated.
pub fn evaluate_circuit(
    circuit: &Circuit,
    input_labels: &[Label],
    tables: &[WireGate],
) -> Result<Vec<Label>> {
    let input_wires = circuit.garbler_input_length + circuit.evaluator_input_length;
    if input_labels.len() != input_wires {
        bail!(
            "expected {} input labels, got {}",
            input_wires,
            input_labels.len()
        );
    }
    if tables.len() != circuit.gates.len() {
        bail!(
            "expected {} garbled gates, got {}",
            circuit.gates.len(),
            tables.len()
        );
    }

    let mut wires: Vec<Option<Label>> = vec![None; circuit.num_wires];
    for (w, label) in input_labels.iter().enumerate() {
        wires[w] = Some(*label);
    }

    for (gate, table) in circuit.gates.iter().zip(tables.iter()) {
        let lhs = wires[gate.lhs]
            .ok_or_else(|| anyhow::anyhow!("wire {} not yet produced", gate.lhs))?;
        let rhs = if gate.kind == GateKind::Not {
            None
        } else {
            Some(
                wires[gate.rhs]
                    .ok_or_else(|| anyhow::anyhow!("wire {} not yet produced", gate.rhs))?,
            )
        };
        let entries: Vec<Label> = table
            .entries
            .iter()
            .map(|bytes| Label::from_bytes(*bytes))
            .collect();
        let out = evaluate_gate(gate.kind, lhs, rhs, &entries)?;
        wires[gate.output] = Some(out);
    }

    let start = circuit.output_start();
    let mut outputs = Vec::with_capacity(circuit.output_length);
    for w in start..circuit.num_wires {
        outputs.push(
            wires[w].ok_or_else(|| anyhow::anyhow!("output wire {} never produced", w))?,
        );
    }
    Ok(outputs)
}

/// Match recovered output labels against the Garbler's recorded `(zero,
/// one)` pair for each output wire, decoding the bit string. Matching
/// neither value is a `DecodeFailure`.
pub fn decode_outputs(
    outputs: &[Label],
    zeros: &[Label],
    ones: &[Label],
    output_start: usize,
) -> Result<String> {
    let mut bits = String::with_capacity(outputs.len());
    for (i, label) in outputs.iter().enumerate() {
        let w = output_start + i;
        if *label == zeros[w] {
            bits.push('0');
        } else if *label == ones[w] {
            bits.push('1');
        } else {
            bail!(
                "output label for wire {} matched neither recorded value",
                w
            );
        }
    }
    Ok(bits)
}
