//! Wire framing and the message types exchanged by the session protocol.
//!
//! Every message is length-prefixed (`u32` big-endian length, then payload)
//! before being written to the transport. Once the session keys are
//! installed, every payload is additionally wrapped by the session AEAD;
//! `DHPublicValue` is the only message ever sent unwrapped, since the keys
//! it establishes don't exist yet.

use anyhow::{Context, Result};
use rand::rngs::OsRng;
use serde::{Serialize, de::DeserializeOwned};
use std::io::{Read, Write};

use crate::constants::{AES_KEY_LEN, LABEL_LEN};
use crate::crypto::{aead_open, aead_seal};
use crate::error::GcError;
use crate::label::Label;

const MAX_FRAME_LEN: u32 = 1024 * 1024 * 1024;

/// A `Read + Write` transport plus the session's symmetric keys, once
/// established.
pub struct FramedChannel<S> {
    stream: S,
    keys: Option<([u8; AES_KEY_LEN], [u8; 32])>,
}

impl<S: Read + Write> FramedChannel<S> {
    /// Wrap a transport before key exchange has happened.
    pub fn new(stream: S) -> Self {
        FramedChannel { stream, keys: None }
    }

    #[cfg(test)]
    pub(crate) fn new_with_keys(stream: S, aes_key: [u8; AES_KEY_LEN], mac_key: [u8; 32]) -> Self {
        FramedChannel {
            stream,
            keys: Some((aes_key, mac_key)),
        }
    }

    /// Install the session keys derived from the DH shared secret. All
    /// messages sent/received after this point are AEAD-wrapped.
    pub fn install_keys(&mut self, aes_key: [u8; AES_KEY_LEN], mac_key: [u8; 32]) {
        self.keys = Some((aes_key, mac_key));
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), GcError> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| GcError::ProtocolError("message too large to frame".into()))?;
        self.stream.write_all(&len.to_be_bytes())?;
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, GcError> {
        let mut len_bytes = [0u8; 4];
        self.stream.read_exact(&mut len_bytes)?;
        let len = u32::from_be_bytes(len_bytes);
        if len > MAX_FRAME_LEN {
            return Err(GcError::ProtocolError(format!(
                "frame length {len} exceeds maximum"
            )));
        }
        let mut buf = vec![0u8; len as usize];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Send a message without AEAD wrapping. Used only for the first
    /// `DHPublicValue` exchange, before the session keys exist.
    pub fn send_plain<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(msg, bincode::config::standard())
            .context("encoding plain message")?;
        self.write_frame(&bytes).context("writing plain frame")
    }

    /// Receive a message without AEAD unwrapping.
    pub fn recv_plain<T: DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.read_frame().context("reading plain frame")?;
        let (msg, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
            .context("decoding plain message")?;
        Ok(msg)
    }

    /// Seal and send a message under the installed session keys.
    pub fn send_sealed<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        let (aes_key, mac_key) = self.keys.context("session keys not installed")?;
        let bytes = bincode::serde::encode_to_vec(msg, bincode::config::standard())
            .context("encoding sealed message")?;
        let framed = aead_seal(&aes_key, &mac_key, &bytes, &mut OsRng);
        self.write_frame(&framed).context("writing sealed frame")
    }

    /// Receive, verify, and open a message sealed under the session keys.
    /// Any integrity failure is reported as `GcError::IntegrityFailure`.
    pub fn recv_sealed<T: DeserializeOwned>(&mut self) -> Result<T, GcError> {
        let (aes_key, mac_key) = self
            .keys
            .ok_or_else(|| GcError::ProtocolError("session keys not installed".into()))?;
        let framed = self.read_frame()?;
        let bytes = aead_open(&aes_key, &mac_key, &framed).ok_or(GcError::IntegrityFailure)?;
        let (msg, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
            .map_err(|e| GcError::ProtocolError(format!("decoding sealed message: {e}")))?;
        Ok(msg)
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// `G→E`/`E→G` Diffie-Hellman public value, sent before any keys exist.
#[derive(Debug, Serialize, serde::Deserialize)]
pub struct DhPublicValueMsg {
    pub public_value: Vec<u8>,
}

/// Sender's (or receiver's) OT public value.
#[derive(Debug, Serialize, serde::Deserialize)]
pub struct OtPublicValue {
    pub public_value: Vec<u8>,
}

/// The sender's two ciphertexts with their IVs for one OT round.
#[derive(Debug, Serialize, serde::Deserialize)]
pub struct OtCiphertexts {
    pub e0: Vec<u8>,
    pub iv0: Vec<u8>,
    pub e1: Vec<u8>,
    pub iv1: Vec<u8>,
}

/// One garbled gate as it goes over the wire: entry count depends on gate
/// kind (0 for XOR, 1 for NOT, 3 for AND).
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct WireGate {
    pub entries: Vec<[u8; LABEL_LEN]>,
}

/// `G→E`: every gate's garbled table, in circuit order.
#[derive(Debug, Serialize, serde::Deserialize)]
pub struct GarbledTablesMsg {
    pub gates: Vec<WireGate>,
}

/// `G→E`: the garbler's own input labels, corresponding to its plaintext
/// bits.
#[derive(Debug, Serialize, serde::Deserialize)]
pub struct GarblerInputsMsg {
    pub labels: Vec<[u8; LABEL_LEN]>,
}

/// `E→G`: the evaluator's recovered output-wire labels.
#[derive(Debug, Serialize, serde::Deserialize)]
pub struct FinalLabelsMsg {
    pub labels: Vec<[u8; LABEL_LEN]>,
}

/// `G→E`: the decoded output bit string.
#[derive(Debug, Serialize, serde::Deserialize)]
pub struct FinalOutputMsg {
    pub bits: String,
}

pub(crate) fn labels_to_wire(labels: &[Label]) -> Vec<[u8; LABEL_LEN]> {
    labels.iter().map(|l| *l.as_bytes()).collect()
}

pub(crate) fn labels_from_wire(bytes: &[[u8; LABEL_LEN]]) -> Vec<Label> {
    bytes.iter().map(|b| Label::from_bytes(*b)).collect()
}
