//! Two-party secure function evaluation via Yao's garbled-circuit protocol.
//!
//! Implements Free-XOR, point-and-permute with GRR3 row reduction, and a
//! Diffie-Hellman Bellare-Micali 1-of-2 oblivious transfer, sequenced by a
//! session state machine over any `Read + Write` transport.

pub mod channel;
pub mod circuit;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod evaluator;
pub mod garbler;
pub mod label;
pub mod ot;
pub mod session;
pub mod stream;
