//! The `Circuit` data model and its textual file format.
//!
//! Format: a header line `num_gates num_wires garbler_input_length
//! evaluator_input_length output_length`, followed by one line per gate:
//! `lhs rhs output KIND` where `KIND` is `AND`, `XOR`, or `NOT` and `rhs` is
//! the literal `-` for `NOT` gates. Blank lines and lines starting with `#`
//! are skipped.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::stream::BufferedLineStream;

/// One of the three supported gate kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateKind {
    And,
    Xor,
    Not,
}

/// A single gate: two input wires (rhs unused for `Not`) and one output
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub kind: GateKind,
    pub lhs: usize,
    pub rhs: usize,
    pub output: usize,
}

/// An immutable boolean circuit: wire counts plus an ordered gate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circuit {
    pub num_gates: usize,
    pub num_wires: usize,
    pub garbler_input_length: usize,
    pub evaluator_input_length: usize,
    pub output_length: usize,
    pub gates: Vec<Gate>,
}

impl Circuit {
    /// Index of the first output wire.
    pub fn output_start(&self) -> usize {
        self.num_wires - self.output_length
    }

    /// Parse a circuit from a line stream, validating every invariant the
    /// builder and evaluator rely on: wire bounds, topological order, and
    /// that no gate writes to an input-wire index.
    pub fn parse(stream: &mut BufferedLineStream) -> Result<Circuit> {
        let header = read_meaningful_line(stream)?
            .ok_or_else(|| anyhow::anyhow!("circuit file is empty, expected a header line"))?;

        let fields: Vec<&str> = header.split_whitespace().collect();
        if fields.len() != 5 {
            bail!(
                "malformed header '{}': expected 5 fields, got {}",
                header,
                fields.len()
            );
        }
        let num_gates: usize = fields[0].parse()?;
        let num_wires: usize = fields[1].parse()?;
        let garbler_input_length: usize = fields[2].parse()?;
        let evaluator_input_length: usize = fields[3].parse()?;
        let output_length: usize = fields[4].parse()?;

        if garbler_input_length + evaluator_input_length + output_length > num_wires {
            bail!(
                "header claims {} wires but input/output segments need at least {}",
                num_wires,
                garbler_input_length + evaluator_input_length + output_length
            );
        }

        let mut gates = Vec::with_capacity(num_gates);
        let mut produced = vec![false; num_wires];
        for i in 0..(garbler_input_length + evaluator_input_length) {
            produced[i] = true;
        }

        let output_start = num_wires - output_length;

        while let Some(line) = read_meaningful_line(stream)? {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != 4 {
                bail!("malformed gate line '{}': expected 4 fields", line);
            }
            let lhs: usize = tokens[0].parse()?;
            let rhs_token = tokens[1];
            let output: usize = tokens[2].parse()?;
            let kind = match tokens[3] {
                "AND" => GateKind::And,
                "XOR" => GateKind::Xor,
                "NOT" => GateKind::Not,
                other => bail!("unsupported gate kind '{}'", other),
            };
            let rhs = if kind == GateKind::Not {
                if rhs_token != "-" {
                    bail!("NOT gate must use '-' for rhs, got '{}'", rhs_token);
                }
                0
            } else {
                rhs_token.parse()?
            };

            if lhs >= num_wires || (kind != GateKind::Not && rhs >= num_wires) || output >= num_wires
            {
                bail!("gate references out-of-range wire in '{}'", line);
            }
            if !produced[lhs] || (kind != GateKind::Not && !produced[rhs]) {
                bail!(
                    "gate references a wire not yet produced (out of topological order): '{}'",
                    line
                );
            }
            if output < garbler_input_length + evaluator_input_length {
                bail!("gate output {} writes to an input-wire index", output);
            }
            produced[output] = true;

            gates.push(Gate {
                kind,
                lhs,
                rhs,
                output,
            });
        }

        if gates.len() != num_gates {
            bail!(
                "header declares {} gates but {} were read",
                num_gates,
                gates.len()
            );
        }
        for w in output_start..num_wires {
            if !produced[w] {
                bail!("output wire {} is never produced by any gate", w);
            }
        }

        Ok(Circuit {
            num_gates,
            num_wires,
            garbler_input_length,
            evaluator_input_length,
            output_length,
            gates,
        })
    }
}

/// Read the next line that is neither blank nor a comment, returning an
/// owned copy so the caller isn't tied to the stream's internal buffer.
fn read_meaningful_line(stream: &mut BufferedLineStream) -> Result<Option<String>> {
    loop {
        match stream.next_line() {
            None => return Ok(None),
            Some(Err(e)) => return Err(e.into()),
            Some(Ok(line)) => {
                if line.trim().is_empty() || line.trim_start().starts_with('#') {
                    continue;
                }
                return Ok(Some(line.to_string()));
            }
        }
    }
}

/// Parse an ASCII input file of `'0'`/`'1'` characters (any other byte is
/// ignored) into an ordered bit sequence.
pub fn parse_input_bits(contents: &str) -> Vec<bool> {
    contents
        .chars()
        .filter_map(|c| match c {
            '0' => Some(false),
            '1' => Some(true),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn stream_for(contents: &str) -> BufferedLineStream {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f.flush().unwrap();
        let file = File::open(f.path()).unwrap();
        BufferedLineStream::new(file)
    }

    #[test]
    fn parses_single_and_gate() {
        let mut s = stream_for("1 3 1 1 1\n0 1 2 AND\n");
        let circuit = Circuit::parse(&mut s).unwrap();
        assert_eq!(circuit.num_gates, 1);
        assert_eq!(circuit.gates[0].kind, GateKind::And);
    }

    #[test]
    fn rejects_non_topological_gate() {
        let mut s = stream_for("1 3 1 1 1\n2 1 0 AND\n");
        assert!(Circuit::parse(&mut s).is_err());
    }

    #[test]
    fn rejects_output_into_input_wire() {
        let mut s = stream_for("1 3 1 1 1\n0 1 0 AND\n");
        assert!(Circuit::parse(&mut s).is_err());
    }

    #[test]
    fn not_gate_uses_dash_rhs() {
        let mut s = stream_for("1 2 1 0 1\n0 - 1 NOT\n");
        let circuit = Circuit::parse(&mut s).unwrap();
        assert_eq!(circuit.gates[0].kind, GateKind::Not);
    }

    #[test]
    fn parse_input_bits_ignores_other_characters() {
        assert_eq!(
            parse_input_bits("01 1\n0x1"),
            vec![false, true, true, false, true]
        );
    }
}
