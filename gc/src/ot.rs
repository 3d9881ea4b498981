//! Bellare-Micali 1-out-of-2 oblivious transfer over the shared DH group.
//!
//! Grounded directly on the five-step protocol this spec distills: the
//! sender's two shared-key derivations (`B^a` and `(B * A^-1)^a`) and the
//! receiver's `B = A * G^b` construction for choice bit 1.

use anyhow::{Context, Result, bail};
use rand::RngCore;

use crate::channel::{FramedChannel, OtCiphertexts, OtPublicValue};
use crate::constants::LABEL_LEN;
use crate::crypto::{self, div_mod};
use crate::error::GcError;
use crate::label::Label;

/// Sender half: transfer exactly one of `(m0, m1)` to the peer according to
/// its hidden choice bit.
pub fn ot_send(
    channel: &mut FramedChannel<impl std::io::Read + std::io::Write>,
    m0: &Label,
    m1: &Label,
    rng: &mut impl RngCore,
) -> Result<()> {
    let p = crypto::modulus();
    let sender = crypto::DhKeyPair::generate(rng);

    channel
        .send_sealed(&OtPublicValue {
            public_value: sender.public.to_bytes_be(),
        })
        .context("sending OT sender public value")?;

    let receiver_msg: OtPublicValue = channel
        .recv_sealed()
        .map_err(|_| GcError::IntegrityFailure)
        .context("receiving OT receiver public value")?;
    let b = num_bigint::BigUint::from_bytes_be(&receiver_msg.public_value);
    crypto::validate_public_value(&b)?;

    let k0_secret = sender.shared_secret(&b);
    let second_pub = div_mod(&b, &sender.public, &p);
    let k1_secret = sender.shared_secret(&second_pub);

    let k0 = crypto::kdf_aes(&k0_secret);
    let k1 = crypto::kdf_aes(&k1_secret);

    let mut iv0 = [0u8; 16];
    let mut iv1 = [0u8; 16];
    rng.fill_bytes(&mut iv0);
    rng.fill_bytes(&mut iv1);

    let e0 = aes_cbc_encrypt(&k0, &iv0, m0.as_bytes());
    let e1 = aes_cbc_encrypt(&k1, &iv1, m1.as_bytes());

    channel
        .send_sealed(&OtCiphertexts {
            e0,
            iv0: iv0.to_vec(),
            e1,
            iv1: iv1.to_vec(),
        })
        .context("sending OT ciphertexts")?;

    Ok(())
}

/// Receiver half: recover exactly `m_choice`, learning nothing about the
/// other plaintext.
pub fn ot_recv(
    channel: &mut FramedChannel<impl std::io::Read + std::io::Write>,
    choice: bool,
    rng: &mut impl RngCore,
) -> Result<Label> {
    let p = crypto::modulus();
    let receiver = crypto::DhKeyPair::generate(rng);

    let sender_msg: OtPublicValue = channel
        .recv_sealed()
        .map_err(|_| GcError::IntegrityFailure)
        .context("receiving OT sender public value")?;
    let a = num_bigint::BigUint::from_bytes_be(&sender_msg.public_value);
    crypto::validate_public_value(&a)?;

    let public_to_send = if choice {
        (&a * &receiver.public) % &p
    } else {
        receiver.public.clone()
    };

    channel
        .send_sealed(&OtPublicValue {
            public_value: public_to_send.to_bytes_be(),
        })
        .context("sending OT receiver public value")?;

    let choice_secret = receiver.shared_secret(&a);
    let choice_key = crypto::kdf_aes(&choice_secret);

    let ciphertexts: OtCiphertexts = channel
        .recv_sealed()
        .map_err(|_| GcError::IntegrityFailure)
        .context("receiving OT ciphertexts")?;

    let (chosen_ct, chosen_iv) = if choice {
        (&ciphertexts.e1, &ciphertexts.iv1)
    } else {
        (&ciphertexts.e0, &ciphertexts.iv0)
    };
    if chosen_iv.len() != 16 {
        bail!("OT ciphertext IV has unexpected length");
    }
    let mut iv = [0u8; 16];
    iv.copy_from_slice(chosen_iv);

    let plaintext = aes_cbc_decrypt(&choice_key, &iv, chosen_ct)
        .ok_or_else(|| anyhow::anyhow!("OT ciphertext failed to decrypt under chosen key"))?;
    if plaintext.len() != LABEL_LEN {
        bail!("OT plaintext has unexpected length {}", plaintext.len());
    }
    let mut bytes = [0u8; LABEL_LEN];
    bytes.copy_from_slice(&plaintext);
    Ok(Label::from_bytes(bytes))
}

fn aes_cbc_encrypt(key: &[u8; 16], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    use aes::Aes128;
    use cbc::cipher::{BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
    cbc::Encryptor::<Aes128>::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

fn aes_cbc_decrypt(key: &[u8; 16], iv: &[u8; 16], ciphertext: &[u8]) -> Option<Vec<u8>> {
    use aes::Aes128;
    use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};
    cbc::Decryptor::<Aes128>::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;
    use std::os::unix::net::UnixStream;

    #[test]
    fn ot_transfers_chosen_message() {
        let (sock_a, sock_b) = UnixStream::pair().unwrap();
        let m0 = Label::from_bytes([0x11; LABEL_LEN]);
        let m1 = Label::from_bytes([0x22; LABEL_LEN]);

        let sender = std::thread::spawn(move || {
            let mut rng = ChaCha12Rng::from_seed([20u8; 32]);
            let mut channel = FramedChannel::new_with_keys(sock_a, [1u8; 16], [2u8; 32]);
            ot_send(&mut channel, &m0, &m1, &mut rng).unwrap();
        });

        let mut rng = ChaCha12Rng::from_seed([21u8; 32]);
        let mut channel = FramedChannel::new_with_keys(sock_b, [1u8; 16], [2u8; 32]);
        let received = ot_recv(&mut channel, true, &mut rng).unwrap();
        sender.join().unwrap();

        assert_eq!(received, Label::from_bytes([0x22; LABEL_LEN]));
    }

    #[test]
    fn ot_transfers_zero_choice() {
        let (sock_a, sock_b) = UnixStream::pair().unwrap();
        let m0 = Label::from_bytes([0x33; LABEL_LEN]);
        let m1 = Label::from_bytes([0x44; LABEL_LEN]);

        let sender = std::thread::spawn(move || {
            let mut rng = ChaCha12Rng::from_seed([22u8; 32]);
            let mut channel = FramedChannel::new_with_keys(sock_a, [3u8; 16], [4u8; 32]);
            ot_send(&mut channel, &m0, &m1, &mut rng).unwrap();
        });

        let mut rng = ChaCha12Rng::from_seed([23u8; 32]);
        let mut channel = FramedChannel::new_with_keys(sock_b, [3u8; 16], [4u8; 32]);
        let received = ot_recv(&mut channel, false, &mut rng).unwrap();
        sender.join().unwrap();

        assert_eq!(received, Label::from_bytes([0x33; LABEL_LEN]));
    }
}
