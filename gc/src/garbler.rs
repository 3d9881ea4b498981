//! Garbler side: label generation and GRR3 table construction.
//!
//! Free-XOR for `Xor` gates (no table), zero-row GRR3 reduction for `And`
//! and `Not` gates. Ported from the zero-row construction in
//! `original_source/src/pkg/garbler.cxx`'s `generate_labels`/
//! `generate_gates`, onto this crate's point-and-permute `Label` type.

use anyhow::{Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use rand::RngCore;

use crate::circuit::{Circuit, GateKind};
use crate::constants::{DUMMY_RHS, LABEL_LEN, PROGRESS_UPDATE_INTERVAL};
use crate::crypto::hash_labels;
use crate::label::Label;

/// The Garbler's private per-wire label pairs and global offset. Zeroed on
/// drop since this is exactly the sensitive material the session must not
/// outlive.
pub struct GarbledLabels {
    pub zeros: Vec<Label>,
    pub ones: Vec<Label>,
    pub offset: Label,
}

impl Drop for GarbledLabels {
    fn drop(&mut self) {
        for l in self.zeros.iter_mut().chain(self.ones.iter_mut()) {
            *l = Label::from_bytes([0u8; LABEL_LEN]);
        }
        self.offset = Label::from_bytes([0u8; LABEL_LEN]);
    }
}

impl GarbledLabels {
    pub fn label_for(&self, wire: usize, bit: bool) -> Label {
        if bit { self.ones[wire] } else { self.zeros[wire] }
    }
}

/// One gate's garbled table, sized per its kind.
#[derive(Debug, Clone)]
pub enum GarbledGate {
    And([Label; 3]),
    Xor,
    Not([Label; 1]),
}

/// Generate fresh label pairs for every wire and the garbled table for
/// every gate, in one topological pass (GRR3 output labels are derived from
/// the table itself, so gates must be visited in order).
pub fn garble_circuit(
    circuit: &Circuit,
    rng: &mut impl RngCore,
) -> Result<(GarbledLabels, Vec<GarbledGate>)> {
    let offset = Label::global_offset(rng);
    let mut zeros = vec![Label::from_bytes([0u8; LABEL_LEN]); circuit.num_wires];
    let mut ones = vec![Label::from_bytes([0u8; LABEL_LEN]); circuit.num_wires];
    let mut assigned = vec![false; circuit.num_wires];

    let input_wires = circuit.garbler_input_length + circuit.evaluator_input_length;
    for w in 0..input_wires {
        let z = Label::fresh(rng.next_u32() & 1 == 1, rng);
        zeros[w] = z;
        ones[w] = z.xor(&offset);
        assigned[w] = true;
    }

    let pb = ProgressBar::new(circuit.num_gates as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb.set_message("garbling circuit...");

    let mut tables = Vec::with_capacity(circuit.gates.len());

    for (idx, gate) in circuit.gates.iter().enumerate() {
        if !assigned[gate.lhs] || (gate.kind != GateKind::Not && !assigned[gate.rhs]) {
            bail!(
                "gate {} references a wire not yet assigned a label (non-topological circuit)",
                idx
            );
        }

        let table = match gate.kind {
            GateKind::Xor => {
                let out0 = zeros[gate.lhs].xor(&zeros[gate.rhs]);
                zeros[gate.output] = out0;
                ones[gate.output] = out0.xor(&offset);
                GarbledGate::Xor
            }
            GateKind::And => {
                let lhs0 = zeros[gate.lhs];
                let lhs1 = ones[gate.lhs];
                let rhs0 = zeros[gate.rhs];
                let rhs1 = ones[gate.rhs];
                garble_binary_gate(&mut zeros, &mut ones, &offset, gate.output, lhs0, lhs1, rhs0, rhs1, |i, j| i && j)
            }
            GateKind::Not => {
                let lhs0 = zeros[gate.lhs];
                let lhs1 = ones[gate.lhs];
                garble_not_gate(&mut zeros, &mut ones, &offset, gate.output, lhs0, lhs1)
            }
        };

        assigned[gate.output] = true;
        tables.push(table);

        if (idx as u64).is_multiple_of(PROGRESS_UPDATE_INTERVAL) {
            pb.set_position(idx as u64 + 1);
        }
    }
    pb.finish_with_message(format!("garbled {} gates", circuit.gates.len()));

    Ok((
        GarbledLabels {
            zeros,
            ones,
            offset,
        },
        tables,
    ))
}

/// Zero-row GRR3 construction for an AND gate (four rows, three
/// transmitted).
#[allow(clippy::too_many_arguments)]
fn garble_binary_gate(
    zeros: &mut [Label],
    ones: &mut [Label],
    offset: &Label,
    output: usize,
    lhs0: Label,
    lhs1: Label,
    rhs0: Label,
    rhs1: Label,
    truth: impl Fn(bool, bool) -> bool,
) -> GarbledGate {
    let lhs = [lhs0, lhs1];
    let rhs = [rhs0, rhs1];

    // slot(i, j) = 2*p(lhs_i) + p(rhs_j); find the (i*, j*) mapping to slot 0.
    let mut zero_row = (0usize, 0usize);
    for i in 0..2 {
        for j in 0..2 {
            let slot = 2 * (lhs[i].permute_bit() as usize) + (rhs[j].permute_bit() as usize);
            if slot == 0 {
                zero_row = (i, j);
            }
        }
    }
    let (zi, zj) = zero_row;
    let zero_hash = Label::from_bytes(hash_labels(&lhs[zi], &rhs[zj]));
    let zero_truth = truth(zi == 1, zj == 1);

    if zero_truth {
        ones[output] = zero_hash;
        zeros[output] = zero_hash.xor(offset);
    } else {
        zeros[output] = zero_hash;
        ones[output] = zero_hash.xor(offset);
    }

    let mut entries = [Label::from_bytes([0u8; LABEL_LEN]); 3];
    for i in 0..2 {
        for j in 0..2 {
            let slot = 2 * (lhs[i].permute_bit() as usize) + (rhs[j].permute_bit() as usize);
            if slot == 0 {
                continue;
            }
            let row_truth = truth(i == 1, j == 1);
            let out_label = if row_truth { ones[output] } else { zeros[output] };
            let entry = Label::from_bytes(hash_labels(&lhs[i], &rhs[j])).xor(&out_label);
            entries[slot - 1] = entry;
        }
    }

    GarbledGate::And(entries)
}

/// Zero-row GRR3 construction for a NOT gate: one logical input, two rows
/// indexed by `permute_bit(lhs)`, one row transmitted. The right operand
/// fed to `H` is always the fixed public `DUMMY_RHS` constant, never a real
/// wire label, per `DUMMY_RHS`'s contract.
fn garble_not_gate(
    zeros: &mut [Label],
    ones: &mut [Label],
    offset: &Label,
    output: usize,
    lhs0: Label,
    lhs1: Label,
) -> GarbledGate {
    let lhs = [lhs0, lhs1];
    let dummy = Label::from_bytes(DUMMY_RHS);

    let zi = if lhs[0].permute_bit() { 1 } else { 0 };
    let zero_hash = Label::from_bytes(hash_labels(&lhs[zi], &dummy));
    let zero_truth = !(zi == 1);

    if zero_truth {
        ones[output] = zero_hash;
        zeros[output] = zero_hash.xor(offset);
    } else {
        zeros[output] = zero_hash;
        ones[output] = zero_hash.xor(offset);
    }

    let other = 1 - zi;
    let other_truth = !(other == 1);
    let out_label = if other_truth {
        ones[output]
    } else {
        zeros[output]
    };
    let entry = Label::from_bytes(hash_labels(&lhs[other], &dummy)).xor(&out_label);

    GarbledGate::Not([entry])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Gate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn and_circuit() -> Circuit {
        Circuit {
            num_gates: 1,
            num_wires: 3,
            garbler_input_length: 1,
            evaluator_input_length: 1,
            output_length: 1,
            gates: vec![Gate {
                kind: GateKind::And,
                lhs: 0,
                rhs: 1,
                output: 2,
            }],
        }
    }

    fn xor_circuit() -> Circuit {
        Circuit {
            num_gates: 1,
            num_wires: 3,
            garbler_input_length: 1,
            evaluator_input_length: 1,
            output_length: 1,
            gates: vec![Gate {
                kind: GateKind::Xor,
                lhs: 0,
                rhs: 1,
                output: 2,
            }],
        }
    }

    #[test]
    fn label_pair_invariant_holds_for_every_wire() {
        let mut rng = ChaCha12Rng::from_seed([30u8; 32]);
        let (labels, _tables) = garble_circuit(&and_circuit(), &mut rng).unwrap();
        for w in 0..3 {
            assert_eq!(labels.zeros[w].xor(&labels.ones[w]), labels.offset);
            assert_ne!(
                labels.zeros[w].permute_bit(),
                labels.ones[w].permute_bit()
            );
        }
    }

    #[test]
    fn and_gate_has_three_entries() {
        let mut rng = ChaCha12Rng::from_seed([31u8; 32]);
        let (_labels, tables) = garble_circuit(&and_circuit(), &mut rng).unwrap();
        match &tables[0] {
            GarbledGate::And(entries) => assert_eq!(entries.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn xor_gate_transmits_no_table() {
        let mut rng = ChaCha12Rng::from_seed([32u8; 32]);
        let (labels, tables) = garble_circuit(&xor_circuit(), &mut rng).unwrap();
        assert!(matches!(tables[0], GarbledGate::Xor));
        // Free-XOR: output zero label is XOR of input zero labels.
        assert_eq!(labels.zeros[2], labels.zeros[0].xor(&labels.zeros[1]));
    }

    #[test]
    fn rejects_non_topological_gate() {
        let circuit = Circuit {
            num_gates: 1,
            num_wires: 3,
            garbler_input_length: 1,
            evaluator_input_length: 0,
            output_length: 1,
            gates: vec![Gate {
                kind: GateKind::And,
                lhs: 0,
                rhs: 2,
                output: 1,
            }],
        };
        let mut rng = ChaCha12Rng::from_seed([33u8; 32]);
        assert!(garble_circuit(&circuit, &mut rng).is_err());
    }
}
