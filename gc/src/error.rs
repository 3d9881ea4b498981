//! Typed error surface for the session-protocol seam.
//!
//! Internal helpers (parsing, garbling, crypto primitives) return
//! `anyhow::Result` and propagate with `?`/`.context(..)`, matching the rest
//! of this crate. `GcError` exists only where a caller outside this crate
//! (the CLI, integration tests) needs to distinguish error kinds, per the
//! error classes a session can abort with.

use thiserror::Error;

/// An error raised by the session protocol state machine.
#[derive(Debug, Error)]
pub enum GcError {
    /// AEAD verification failed on a wrapped message.
    #[error("integrity check failed on wrapped message")]
    IntegrityFailure,

    /// The underlying transport failed or closed mid-message.
    #[error("transport error: {0}")]
    TransportError(#[from] std::io::Error),

    /// A message had the wrong kind, wrong length, or an out-of-range field.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// An output label matched neither `L^0` nor `L^1` of its wire.
    #[error("output label did not match either value for its wire")]
    DecodeFailure,

    /// A malformed circuit or input file was rejected before the session
    /// started.
    #[error("invalid input: {0}")]
    InputError(String),
}
