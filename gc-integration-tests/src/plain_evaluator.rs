//! Ground-truth plaintext evaluation of a circuit, used as the oracle the
//! garbled protocol's output is checked against.

use anyhow::Result;
use gc::circuit::{Circuit, GateKind};

/// Evaluate `circuit` directly on plaintext wire values, returning the
/// output bit string (most-significant output wire last, i.e. in the same
/// order the session protocol decodes output labels).
pub fn evaluate_plain_circuit(
    circuit: &Circuit,
    garbler_input: &[bool],
    evaluator_input: &[bool],
) -> Result<String> {
    if garbler_input.len() != circuit.garbler_input_length {
        anyhow::bail!(
            "expected {} garbler input bits, got {}",
            circuit.garbler_input_length,
            garbler_input.len()
        );
    }
    if evaluator_input.len() != circuit.evaluator_input_length {
        anyhow::bail!(
            "expected {} evaluator input bits, got {}",
            circuit.evaluator_input_length,
            evaluator_input.len()
        );
    }

    let mut wires = vec![None; circuit.num_wires];
    for (i, &bit) in garbler_input.iter().enumerate() {
        wires[i] = Some(bit);
    }
    for (i, &bit) in evaluator_input.iter().enumerate() {
        wires[circuit.garbler_input_length + i] = Some(bit);
    }

    for gate in &circuit.gates {
        let lhs = wires[gate.lhs]
            .ok_or_else(|| anyhow::anyhow!("wire {} not yet computed", gate.lhs))?;
        let out = match gate.kind {
            GateKind::And => {
                let rhs = wires[gate.rhs]
                    .ok_or_else(|| anyhow::anyhow!("wire {} not yet computed", gate.rhs))?;
                lhs && rhs
            }
            GateKind::Xor => {
                let rhs = wires[gate.rhs]
                    .ok_or_else(|| anyhow::anyhow!("wire {} not yet computed", gate.rhs))?;
                lhs ^ rhs
            }
            GateKind::Not => !lhs,
        };
        wires[gate.output] = Some(out);
    }

    let start = circuit.output_start();
    let mut bits = String::with_capacity(circuit.output_length);
    for w in start..circuit.num_wires {
        let bit = wires[w].ok_or_else(|| anyhow::anyhow!("output wire {} never computed", w))?;
        bits.push(if bit { '1' } else { '0' });
    }
    Ok(bits)
}
