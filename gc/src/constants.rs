//! Fixed sizes and public constants shared across the protocol.

/// Width of a wire label in bytes.
pub const LABEL_LEN: usize = 16;

/// Trailing tag width appended to a plaintext label before GRR-less
/// encryption. Unused once GRR3 row reduction is applied, kept at zero.
pub const TAG_LEN: usize = 0;

/// Public, fixed-content right-hand operand fed to `H` for NOT gates, so the
/// hash always takes two arguments. Its permute bit is fixed to 1 by
/// construction; the remaining bytes are zero. Callers MUST NOT treat this
/// value as secret.
pub const DUMMY_RHS: [u8; LABEL_LEN] = {
    let mut bytes = [0u8; LABEL_LEN];
    bytes[0] = 0x80;
    bytes
};

/// How often the garbling progress bar repaints, in gates processed.
pub const PROGRESS_UPDATE_INTERVAL: u64 = 1000;

/// AES-CBC block and key width used by the session AEAD and OT ciphers.
pub const AES_KEY_LEN: usize = 16;
pub const AES_BLOCK_LEN: usize = 16;

/// HMAC-SHA256 tag width used by the session AEAD wrapper.
pub const MAC_TAG_LEN: usize = 32;
