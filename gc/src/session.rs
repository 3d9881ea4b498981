//! The session protocol state machine: key exchange, table/label delivery,
//! OT, evaluation, and output decoding, in the order fixed by the protocol.
//!
//! ```text
//! INIT -> KEYEX -> TABLES -> GARBLER_INPUTS -> OT_PHASE -> EVAL -> OUTPUT -> DONE
//! ```
//! Any AEAD integrity failure, socket error, or unexpected message
//! immediately aborts the session; there is no retry.

use rand::RngCore;
use std::io::{Read, Write};

use crate::channel::{
    DhPublicValueMsg, FinalLabelsMsg, FinalOutputMsg, FramedChannel, GarbledTablesMsg,
    GarblerInputsMsg, WireGate, labels_from_wire, labels_to_wire,
};
use crate::circuit::Circuit;
use crate::crypto::{self, kdf_aes, kdf_mac, validate_public_value};
use crate::error::GcError;
use crate::evaluator::{decode_outputs, evaluate_circuit};
use crate::garbler::{GarbledGate, garble_circuit};
use crate::label::Label;
use crate::ot::{ot_recv, ot_send};
use num_bigint::BigUint;

/// Which of the two roles this process is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    Garbler,
    Evaluator,
}

/// Where the state machine currently is. Tracked for diagnostics (the CLI's
/// `--verbose` trace); every method asserts its own preconditions directly
/// rather than through a typestate, since the whole machine lives in one
/// function call per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    KeyExchanged,
    TablesSent,
    GarblerInputsSent,
    OtDone,
    Evaluated,
    OutputSent,
    Done,
}

/// Drives one party's half of the protocol over any `Read + Write`
/// transport.
pub struct GcSession<S> {
    channel: FramedChannel<S>,
    state: SessionState,
    on_transition: Option<Box<dyn FnMut(SessionState)>>,
}

fn to_gc_error(e: anyhow::Error) -> GcError {
    match e.downcast::<GcError>() {
        Ok(gc) => gc,
        Err(e) => GcError::ProtocolError(e.to_string()),
    }
}

impl<S: Read + Write> GcSession<S> {
    pub fn new(stream: S) -> Self {
        GcSession {
            channel: FramedChannel::new(stream),
            state: SessionState::Init,
            on_transition: None,
        }
    }

    /// Register a callback fired on every state transition, used by the CLI
    /// to print a trace under `--verbose`.
    pub fn on_transition(mut self, f: impl FnMut(SessionState) + 'static) -> Self {
        self.on_transition = Some(Box::new(f));
        self
    }

    fn transition(&mut self, state: SessionState) {
        self.state = state;
        if let Some(cb) = self.on_transition.as_mut() {
            cb(state);
        }
    }

    /// Run the key-exchange phase. `send_first` is true for the Garbler,
    /// which sends its DH public value before reading the peer's.
    fn key_exchange(&mut self, rng: &mut impl RngCore, send_first: bool) -> Result<(), GcError> {
        let own = crypto::DhKeyPair::generate(rng);

        let peer_public = if send_first {
            self.channel
                .send_plain(&DhPublicValueMsg {
                    public_value: own.public.to_bytes_be(),
                })
                .map_err(to_gc_error)?;
            let msg: DhPublicValueMsg = self.channel.recv_plain().map_err(to_gc_error)?;
            BigUint::from_bytes_be(&msg.public_value)
        } else {
            let msg: DhPublicValueMsg = self.channel.recv_plain().map_err(to_gc_error)?;
            let peer = BigUint::from_bytes_be(&msg.public_value);
            self.channel
                .send_plain(&DhPublicValueMsg {
                    public_value: own.public.to_bytes_be(),
                })
                .map_err(to_gc_error)?;
            peer
        };

        validate_public_value(&peer_public).map_err(to_gc_error)?;
        let shared = own.shared_secret(&peer_public);
        let aes_key = kdf_aes(&shared);
        let mac_key = kdf_mac(&shared);
        self.channel.install_keys(aes_key, mac_key);
        self.transition(SessionState::KeyExchanged);
        Ok(())
    }

    /// Run the full protocol as the Garbler, holding `garbler_input` (one
    /// bool per garbler-input wire). Returns the decoded output bit string.
    pub fn run_garbler(
        mut self,
        circuit: &Circuit,
        garbler_input: &[bool],
        rng: &mut impl RngCore,
    ) -> Result<String, GcError> {
        if garbler_input.len() != circuit.garbler_input_length {
            return Err(GcError::InputError(format!(
                "expected {} garbler input bits, got {}",
                circuit.garbler_input_length,
                garbler_input.len()
            )));
        }

        self.key_exchange(rng, true)?;

        let (labels, tables) = garble_circuit(circuit, rng).map_err(to_gc_error)?;

        let wire_tables: Vec<WireGate> = tables
            .iter()
            .map(|g| match g {
                GarbledGate::And(e) => WireGate {
                    entries: e.iter().map(|l| *l.as_bytes()).collect(),
                },
                GarbledGate::Not(e) => WireGate {
                    entries: e.iter().map(|l| *l.as_bytes()).collect(),
                },
                GarbledGate::Xor => WireGate { entries: vec![] },
            })
            .collect();
        self.channel
            .send_sealed(&GarbledTablesMsg { gates: wire_tables })
            .map_err(to_gc_error)?;
        self.transition(SessionState::TablesSent);

        let own_labels: Vec<Label> = (0..circuit.garbler_input_length)
            .map(|w| labels.label_for(w, garbler_input[w]))
            .collect();
        self.channel
            .send_sealed(&GarblerInputsMsg {
                labels: labels_to_wire(&own_labels),
            })
            .map_err(to_gc_error)?;
        self.transition(SessionState::GarblerInputsSent);

        for i in 0..circuit.evaluator_input_length {
            let wire = circuit.garbler_input_length + i;
            let zero = labels.zeros[wire];
            let one = labels.ones[wire];
            ot_send(&mut self.channel, &zero, &one, rng).map_err(to_gc_error)?;
        }
        self.transition(SessionState::OtDone);

        let final_labels: FinalLabelsMsg = self.channel.recv_sealed()?;
        if final_labels.labels.len() != circuit.output_length {
            return Err(GcError::ProtocolError(format!(
                "expected {} final labels, got {}",
                circuit.output_length,
                final_labels.labels.len()
            )));
        }
        let outputs = labels_from_wire(&final_labels.labels);
        self.transition(SessionState::Evaluated);

        let bits = decode_outputs(&outputs, &labels.zeros, &labels.ones, circuit.output_start())
            .map_err(|_| GcError::DecodeFailure)?;

        self.channel
            .send_sealed(&FinalOutputMsg { bits: bits.clone() })
            .map_err(to_gc_error)?;
        self.transition(SessionState::OutputSent);
        self.transition(SessionState::Done);

        Ok(bits)
    }

    /// Run the full protocol as the Evaluator, holding `evaluator_input`
    /// (one bool per evaluator-input wire). Returns the decoded output bit
    /// string.
    pub fn run_evaluator(
        mut self,
        circuit: &Circuit,
        evaluator_input: &[bool],
        rng: &mut impl RngCore,
    ) -> Result<String, GcError> {
        if evaluator_input.len() != circuit.evaluator_input_length {
            return Err(GcError::InputError(format!(
                "expected {} evaluator input bits, got {}",
                circuit.evaluator_input_length,
                evaluator_input.len()
            )));
        }

        self.key_exchange(rng, false)?;

        let tables_msg: GarbledTablesMsg = self.channel.recv_sealed()?;
        if tables_msg.gates.len() != circuit.gates.len() {
            return Err(GcError::ProtocolError(format!(
                "expected {} garbled gates, got {}",
                circuit.gates.len(),
                tables_msg.gates.len()
            )));
        }
        self.transition(SessionState::TablesSent);

        let garbler_inputs: GarblerInputsMsg = self.channel.recv_sealed()?;
        if garbler_inputs.labels.len() != circuit.garbler_input_length {
            return Err(GcError::ProtocolError(format!(
                "expected {} garbler input labels, got {}",
                circuit.garbler_input_length,
                garbler_inputs.labels.len()
            )));
        }
        self.transition(SessionState::GarblerInputsSent);

        let mut input_labels = labels_from_wire(&garbler_inputs.labels);
        for &bit in evaluator_input {
            let label = ot_recv(&mut self.channel, bit, rng).map_err(to_gc_error)?;
            input_labels.push(label);
        }
        self.transition(SessionState::OtDone);

        let outputs =
            evaluate_circuit(circuit, &input_labels, &tables_msg.gates).map_err(to_gc_error)?;
        self.transition(SessionState::Evaluated);

        self.channel
            .send_sealed(&FinalLabelsMsg {
                labels: labels_to_wire(&outputs),
            })
            .map_err(to_gc_error)?;
        self.transition(SessionState::OutputSent);

        let final_output: FinalOutputMsg = self.channel.recv_sealed()?;
        self.transition(SessionState::Done);

        Ok(final_output.bits)
    }
}
