//! Cryptographic primitives: the dual-input hash, the DH group, key
//! derivation, and the session AEAD wrapper.
//!
//! The DH group is a fixed 2048-bit MODP safe-prime group (RFC 3526 group
//! 14), generator 2. AEAD is encrypt-then-MAC: AES-128-CBC under a random
//! IV, then HMAC-SHA256 over `iv || ciphertext`.

use aes::Aes128;
use anyhow::{Result, bail};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::constants::{AES_KEY_LEN, LABEL_LEN, MAC_TAG_LEN};
use crate::label::Label;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// RFC 3526 group 14: 2048-bit MODP group, generator 2.
const GROUP_14_HEX: &str = concat!(
    "FFFFFFFF FFFFFFFF C90FDAA2 2168C234 C4C6628B 80DC1CD1 ",
    "29024E08 8A67CC74 020BBEA6 3B139B22 514A0879 8E3404DD ",
    "EF9519B3 CD3A431B 302B0A6D F25F1437 4FE1356D 6D51C245 ",
    "E485B576 625E7EC6 F44C42E9 A637ED6B 0BFF5CB6 F406B7ED ",
    "EE386BFB 5A899FA5 AE9F2411 7C4B1FE6 49286651 ECE45B3D ",
    "C2007CB8 A163BF05 98DA4836 1C55D39A 69163FA8 FD24CF5F ",
    "83655D23 DCA3AD96 1C62F356 208552BB 9ED52907 7096966D ",
    "670C354E 4ABC9804 F1746C08 CA18217C 32905E46 2E36CE3B ",
    "E39E772C 180E8603 9B2783A2 EC07A28F B5C55DF0 6F4C52C9 ",
    "DE2BCBF6 95581718 3995497C EA956AE5 15D22618 98FA0510 ",
    "15728E5A 8AACAA68 FFFFFFFF FFFFFFFF",
);

fn group_modulus() -> BigUint {
    // The constant above is assembled from RFC 3526 group 14 in upper-hex;
    // stray digit-grouping artifacts from the source formatting are
    // tolerated by filtering to hex digits only.
    let filtered: String = GROUP_14_HEX.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    BigUint::parse_bytes(filtered.as_bytes(), 16).expect("group modulus is valid hex")
}

fn group_generator() -> BigUint {
    BigUint::from(2u32)
}

/// One party's ephemeral Diffie-Hellman key pair for a single session.
pub struct DhKeyPair {
    private: BigUint,
    pub public: BigUint,
}

impl DhKeyPair {
    /// Sample a fresh private exponent and compute the matching public
    /// value `G^a mod P`.
    pub fn generate(rng: &mut impl RngCore) -> Self {
        let p = group_modulus();
        let g = group_generator();
        let mut bytes = vec![0u8; 256];
        rng.fill_bytes(&mut bytes);
        let private = BigUint::from_bytes_be(&bytes) % (&p - BigUint::one());
        let public = g.modpow(&private, &p);
        DhKeyPair { private, public }
    }

    /// Compute the shared secret `peer_public^private mod P`.
    pub fn shared_secret(&self, peer_public: &BigUint) -> BigUint {
        peer_public.modpow(&self.private, &group_modulus())
    }

    pub fn private_exponent(&self) -> &BigUint {
        &self.private
    }
}

/// Reject a received public value that is out of range for the group.
pub fn validate_public_value(value: &BigUint) -> Result<()> {
    if value.is_zero() || *value >= group_modulus() {
        bail!("DH public value out of range");
    }
    Ok(())
}

/// Modular multiplicative inverse of `a` mod `p`, via Fermat's little
/// theorem (`p` is prime): `a^{p-2} mod p`.
pub fn mod_inverse(a: &BigUint, p: &BigUint) -> BigUint {
    a.modpow(&(p - BigUint::from(2u32)), p)
}

/// `(b * a^{-1}) mod p` — the second shared-key input the OT sender needs
/// in the Bellare-Micali protocol.
pub fn div_mod(b: &BigUint, a: &BigUint, p: &BigUint) -> BigUint {
    (b * mod_inverse(a, p)) % p
}

pub fn modulus() -> BigUint {
    group_modulus()
}

pub fn generator() -> BigUint {
    group_generator()
}

/// The dual-input hash `H(a, b)`, modelled as a random oracle. Truncated to
/// `LABEL_LEN` bytes of a SHA-256 digest over `a || b`.
pub fn hash_labels(a: &Label, b: &Label) -> [u8; LABEL_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(a.as_bytes());
    hasher.update(b.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; LABEL_LEN];
    out.copy_from_slice(&digest[..LABEL_LEN]);
    out
}

/// Derive the AES session key from a DH shared secret.
pub fn kdf_aes(secret: &BigUint) -> [u8; AES_KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(b"gc-aes-key");
    hasher.update(secret.to_bytes_be());
    let digest = hasher.finalize();
    let mut out = [0u8; AES_KEY_LEN];
    out.copy_from_slice(&digest[..AES_KEY_LEN]);
    out
}

/// Derive the HMAC session key from a DH shared secret.
pub fn kdf_mac(secret: &BigUint) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"gc-mac-key");
    hasher.update(secret.to_bytes_be());
    hasher.finalize().into()
}

/// Seal a message under the session AES and HMAC keys: AES-128-CBC with a
/// fresh random IV, then HMAC-SHA256 over `iv || ciphertext`. Framed as
/// `iv || ciphertext || tag`.
pub fn aead_seal(aes_key: &[u8; AES_KEY_LEN], mac_key: &[u8; 32], msg: &[u8], rng: &mut impl RngCore) -> Vec<u8> {
    let mut iv = [0u8; 16];
    rng.fill_bytes(&mut iv);

    let ciphertext = Aes128CbcEnc::new(aes_key.into(), &iv.into())
        .encrypt_padded_vec_mut::<cbc::cipher::block_padding::Pkcs7>(msg);

    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key).expect("HMAC accepts any key length");
    mac.update(&iv);
    mac.update(&ciphertext);
    let tag = mac.finalize().into_bytes();

    let mut framed = Vec::with_capacity(iv.len() + ciphertext.len() + tag.len());
    framed.extend_from_slice(&iv);
    framed.extend_from_slice(&ciphertext);
    framed.extend_from_slice(&tag);
    framed
}

/// Verify and open a framed message. Returns `None` on any integrity
/// failure, which the caller must treat as fatal.
pub fn aead_open(aes_key: &[u8; AES_KEY_LEN], mac_key: &[u8; 32], framed: &[u8]) -> Option<Vec<u8>> {
    if framed.len() < 16 + MAC_TAG_LEN {
        return None;
    }
    let (iv_and_ct, tag) = framed.split_at(framed.len() - MAC_TAG_LEN);
    let (iv, ciphertext) = iv_and_ct.split_at(16);

    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key).expect("HMAC accepts any key length");
    mac.update(iv);
    mac.update(ciphertext);
    if mac.verify_slice(tag).is_err() {
        return None;
    }

    let mut iv_arr = [0u8; 16];
    iv_arr.copy_from_slice(iv);
    Aes128CbcDec::new(aes_key.into(), &iv_arr.into())
        .decrypt_padded_vec_mut::<cbc::cipher::block_padding::Pkcs7>(ciphertext)
        .ok()
}
