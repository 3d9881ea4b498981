//! End-to-end protocol tests: the real `GcSession` garbler/evaluator pair,
//! run over an in-process `UnixStream` pair (one side on a spawned
//! thread), checked against the plaintext oracle.

use anyhow::Result;
use gc::circuit::{Circuit, Gate, GateKind};
use gc::error::GcError;
use gc::session::GcSession;
use gc_integration_tests::plain_evaluator::evaluate_plain_circuit;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;

const GARBLER_SEED: [u8; 32] = [11u8; 32];
const EVALUATOR_SEED: [u8; 32] = [22u8; 32];

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

/// 1 input (garbler-only), 3 stacked NOT gates, 1 output.
fn not_chain_circuit() -> Circuit {
    Circuit {
        num_gates: 3,
        num_wires: 4,
        garbler_input_length: 1,
        evaluator_input_length: 0,
        output_length: 1,
        gates: vec![
            Gate {
                kind: GateKind::Not,
                lhs: 0,
                rhs: 0,
                output: 1,
            },
            Gate {
                kind: GateKind::Not,
                lhs: 1,
                rhs: 0,
                output: 2,
            },
            Gate {
                kind: GateKind::Not,
                lhs: 2,
                rhs: 0,
                output: 3,
            },
        ],
    }
}

/// 2 garbler inputs (a, b), 1 evaluator input (carry-in), 2 outputs (sum,
/// carry-out): a one-bit full adder.
fn full_adder_circuit() -> Circuit {
    // wires: 0=a (G), 1=b (G), 2=cin (E), 3=a^b, 4=a&b, 5=(a^b)&cin, 6=sum, 7=carry
    Circuit {
        num_gates: 5,
        num_wires: 8,
        garbler_input_length: 2,
        evaluator_input_length: 1,
        output_length: 2,
        gates: vec![
            Gate {
                kind: GateKind::Xor,
                lhs: 0,
                rhs: 1,
                output: 3,
            },
            Gate {
                kind: GateKind::And,
                lhs: 0,
                rhs: 1,
                output: 4,
            },
            Gate {
                kind: GateKind::And,
                lhs: 3,
                rhs: 2,
                output: 5,
            },
            Gate {
                kind: GateKind::Xor,
                lhs: 3,
                rhs: 2,
                output: 6,
            },
            Gate {
                kind: GateKind::Xor,
                lhs: 4,
                rhs: 5,
                output: 7,
            },
        ],
    }
}

/// Run the real protocol end-to-end over an in-process socket pair and
/// return the Garbler's and Evaluator's decoded output strings.
fn run_session(
    circuit: &Circuit,
    garbler_input: Vec<bool>,
    evaluator_input: Vec<bool>,
) -> Result<(String, String)> {
    let (sock_g, sock_e) = UnixStream::pair()?;
    let circuit_g = circuit.clone();

    let garbler_thread = std::thread::spawn(move || -> Result<String, GcError> {
        let mut rng = ChaCha12Rng::from_seed(GARBLER_SEED);
        let session = GcSession::new(sock_g);
        session.run_garbler(&circuit_g, &garbler_input, &mut rng)
    });

    let mut rng = ChaCha12Rng::from_seed(EVALUATOR_SEED);
    let session = GcSession::new(sock_e);
    let evaluator_output = session.run_evaluator(circuit, &evaluator_input, &mut rng)?;
    let garbler_output = garbler_thread.join().expect("garbler thread panicked")?;

    Ok((garbler_output, evaluator_output))
}

fn assert_matches_oracle(circuit: &Circuit, garbler_input: Vec<bool>, evaluator_input: Vec<bool>) {
    let expected = evaluate_plain_circuit(circuit, &garbler_input, &evaluator_input).unwrap();
    let (g_out, e_out) = run_session(circuit, garbler_input, evaluator_input).unwrap();
    assert_eq!(g_out, expected);
    assert_eq!(e_out, expected);
}

/// S1: single AND gate, all four input combinations.
#[test]
fn s1_single_and_gate() {
    let circuit = and_circuit();
    for &x in &[false, true] {
        for &y in &[false, true] {
            assert_matches_oracle(&circuit, vec![x], vec![y]);
        }
    }
}

/// S2: single XOR gate, all four input combinations; no table is
/// transmitted for this gate (checked at the unit level in `garbler.rs`).
#[test]
fn s2_single_xor_gate() {
    let circuit = xor_circuit();
    for &x in &[false, true] {
        for &y in &[false, true] {
            assert_matches_oracle(&circuit, vec![x], vec![y]);
        }
    }
}

/// S3: three stacked NOT gates. x=0 => output=1; x=1 => output=0.
#[test]
fn s3_not_chain() {
    let circuit = not_chain_circuit();
    let (g_out, e_out) = run_session(&circuit, vec![false], vec![]).unwrap();
    assert_eq!(g_out, "1");
    assert_eq!(e_out, "1");

    let (g_out, e_out) = run_session(&circuit, vec![true], vec![]).unwrap();
    assert_eq!(g_out, "0");
    assert_eq!(e_out, "0");
}

/// S4: one-bit full adder, all eight input combinations.
#[test]
fn s4_full_adder() {
    let circuit = full_adder_circuit();
    for &a in &[false, true] {
        for &b in &[false, true] {
            for &cin in &[false, true] {
                assert_matches_oracle(&circuit, vec![a, b], vec![cin]);
            }
        }
    }
}

/// A `Read + Write` proxy that flips one byte of the `n`th `write()` call
/// that passes through it, simulating a man-in-the-middle bit flip.
struct TamperingStream<S> {
    inner: S,
    writes_seen: usize,
    tamper_on_write: usize,
}

impl<S: Read + Write> Read for TamperingStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<S: Read + Write> Write for TamperingStream<S> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writes_seen += 1;
        if self.writes_seen == self.tamper_on_write && !buf.is_empty() {
            let mut tampered = buf.to_vec();
            let last = tampered.len() - 1;
            tampered[last] ^= 0x01;
            return self.inner.write(&tampered);
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// S5: flip one byte of the GarbledTables message in transit. Both parties
/// must abort; neither produces output. The GarbledTables payload is the
/// garbler's 4th `write()` call (DH length, DH payload, tables length,
/// tables payload).
#[test]
fn s5_integrity_tamper_aborts_both_sides() {
    let circuit = and_circuit();
    let (sock_g, sock_e) = UnixStream::pair().unwrap();
    let tampered_g = TamperingStream {
        inner: sock_g,
        writes_seen: 0,
        tamper_on_write: 4,
    };

    let garbler_thread = std::thread::spawn(move || -> Result<String, GcError> {
        let mut rng = ChaCha12Rng::from_seed(GARBLER_SEED);
        let session = GcSession::new(tampered_g);
        session.run_garbler(&circuit, &[true], &mut rng)
    });

    let mut rng = ChaCha12Rng::from_seed(EVALUATOR_SEED);
    let session = GcSession::new(sock_e);
    let evaluator_result = session.run_evaluator(&and_circuit(), &[true], &mut rng);

    assert!(evaluator_result.is_err());
    assert!(matches!(
        evaluator_result.unwrap_err(),
        GcError::IntegrityFailure
    ));

    // The garbler side still completes its own writes (it has no reason to
    // suspect tampering on its own outbound bytes) but its final receive
    // fails once the evaluator aborts without sending FinalLabels.
    let garbler_result = garbler_thread.join().expect("garbler thread panicked");
    assert!(garbler_result.is_err());
}

/// S6: evaluator's input file has fewer bits than `evaluator_input_length`.
/// The session must abort with `InputError` before any network activity.
#[test]
fn s6_mismatched_evaluator_input_length() {
    let circuit = and_circuit();
    let (_sock_g, sock_e) = UnixStream::pair().unwrap();
    let mut rng = ChaCha12Rng::from_seed(EVALUATOR_SEED);
    let session = GcSession::new(sock_e);

    // circuit expects 1 evaluator input bit; supply none.
    let result = session.run_evaluator(&circuit, &[], &mut rng);
    assert!(matches!(result, Err(GcError::InputError(_))));
}
