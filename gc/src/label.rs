//! Wire label algebra: fixed-width byte strings, XOR, and the permute bit.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::LABEL_LEN;

/// A fixed-width wire label. The most significant bit of byte 0 is the
/// permute bit; the rest is uniformly random.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label(pub [u8; LABEL_LEN]);

impl Label {
    /// Build a label from raw bytes, taking the permute bit as-is.
    pub fn from_bytes(bytes: [u8; LABEL_LEN]) -> Self {
        Label(bytes)
    }

    /// A uniformly random label with the permute bit forced to `p`.
    pub fn fresh(p: bool, rng: &mut impl RngCore) -> Self {
        let mut bytes = [0u8; LABEL_LEN];
        rng.fill_bytes(&mut bytes);
        bytes[0] = (bytes[0] & 0x7f) | ((p as u8) << 7);
        Label(bytes)
    }

    /// A one-time, uniformly random global offset with permute bit 1.
    pub fn global_offset(rng: &mut impl RngCore) -> Self {
        Self::fresh(true, rng)
    }

    /// Length-matched bitwise XOR.
    pub fn xor(&self, other: &Label) -> Label {
        let mut out = [0u8; LABEL_LEN];
        for i in 0..LABEL_LEN {
            out[i] = self.0[i] ^ other.0[i];
        }
        Label(out)
    }

    /// Extract the permute bit: the MSB of byte 0.
    pub fn permute_bit(&self) -> bool {
        (self.0[0] & 0x80) != 0
    }

    pub fn as_bytes(&self) -> &[u8; LABEL_LEN] {
        &self.0
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label(p={}, ", self.permute_bit() as u8)?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}
