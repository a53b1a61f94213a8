//! Recipient-sealed envelope used by `Veritum::compile` when `recipients`
//! is non-empty (spec §4.4 step 1).
//!
//! Wire format (all integers big-endian, concatenated with no padding):
//!
//! ```text
//! [1 byte   recipient_count]
//! [32 bytes sender X25519 public key]           CRYPTO_PUBKEY
//! [24 bytes content nonce]
//! repeat recipient_count times:
//!   [32 bytes recipient X25519 public key]
//!   [48 bytes wrapped content key (32-byte key + 16-byte Poly1305 tag)]
//! [remainder: XChaCha20-Poly1305 ciphertext of the plaintext body, tag
//!  appended by the AEAD]
//! ```
//!
//! The per-recipient wrap key is `HKDF-SHA256(ikm = X25519(sender_sk,
//! recipient_pk), info = "veritum recipient wrap v1")`. The wrap itself
//! uses an all-zero nonce: each wrap key is the output of a DH shared
//! secret unique to the (sender, recipient, ephemeral content key) triple
//! and is used to encrypt exactly once, so nonce reuse is not a concern.

use crate::error::{Error, Result};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use ed25519_dalek::SigningKey;
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret as X25519Secret};

const WRAP_INFO: &[u8] = b"veritum recipient wrap v1";
const ZERO_NONCE: [u8; 24] = [0u8; 24];

fn wrap_key(shared_secret: &x25519_dalek::SharedSecret) -> Key {
    let hk = Hkdf::<Sha256>::new(None, shared_secret.as_bytes());
    let mut okm = [0u8; 32];
    hk.expand(WRAP_INFO, &mut okm).expect("32 is a valid HKDF-SHA256 output length");
    *Key::from_slice(&okm)
}

/// Seal `plaintext` for all of `recipients`, sealing under the sender's
/// X25519 static secret (derived by the caller from its Ed25519 signing
/// key via [`cube_core::crypto::derive_x25519_keypair`]).
pub fn seal(
    plaintext: &[u8],
    sender_secret: &X25519Secret,
    sender_public: &X25519Public,
    recipients: &[X25519Public],
) -> Result<Vec<u8>> {
    if recipients.is_empty() {
        return Err(Error::MissingEncryptionMaterial);
    }
    let mut rng = rand::rngs::OsRng;

    let mut content_key_bytes = [0u8; 32];
    rng.fill_bytes(&mut content_key_bytes);
    let content_key = *Key::from_slice(&content_key_bytes);
    let content_cipher = XChaCha20Poly1305::new(&content_key);

    let mut content_nonce_bytes = [0u8; 24];
    rng.fill_bytes(&mut content_nonce_bytes);
    let content_nonce = XNonce::from_slice(&content_nonce_bytes);
    let ciphertext = content_cipher
        .encrypt(content_nonce, plaintext)
        .map_err(|_| Error::MalformedEnvelope)?;

    let mut out = Vec::with_capacity(1 + 32 + 24 + recipients.len() * 80 + ciphertext.len());
    out.push(recipients.len() as u8);
    out.extend_from_slice(sender_public.as_bytes());
    out.extend_from_slice(&content_nonce_bytes);

    for recipient in recipients {
        let shared = sender_secret.diffie_hellman(recipient);
        let wk = wrap_key(&shared);
        let wrap_cipher = XChaCha20Poly1305::new(&wk);
        let wrapped = wrap_cipher
            .encrypt(XNonce::from_slice(&ZERO_NONCE), content_key_bytes.as_slice())
            .map_err(|_| Error::MalformedEnvelope)?;
        out.extend_from_slice(recipient.as_bytes());
        out.extend_from_slice(&wrapped);
    }

    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Attempt to open an envelope under `recipient_secret`. Returns `None`
/// (not an error) if none of the wrapped entries match this recipient's
/// public key, or if AEAD verification fails for any reason.
pub fn open(blob: &[u8], recipient_secret: &X25519Secret) -> Result<Vec<u8>> {
    if blob.len() < 1 + 32 + 24 {
        return Err(Error::MalformedEnvelope);
    }
    let recipient_count = blob[0] as usize;
    let sender_public = X25519Public::from(<[u8; 32]>::try_from(&blob[1..33]).unwrap());
    let content_nonce_bytes = <[u8; 24]>::try_from(&blob[33..57]).unwrap();

    let entries_start = 57;
    let entries_end = entries_start + recipient_count * 80;
    if blob.len() < entries_end {
        return Err(Error::MalformedEnvelope);
    }
    let recipient_public = X25519Public::from(recipient_secret);

    let mut content_key_bytes = None;
    for i in 0..recipient_count {
        let entry = &blob[entries_start + i * 80..entries_start + (i + 1) * 80];
        let candidate = &entry[..32];
        if candidate != recipient_public.as_bytes() {
            continue;
        }
        let wrapped = &entry[32..80];
        let shared = recipient_secret.diffie_hellman(&sender_public);
        let wk = wrap_key(&shared);
        let wrap_cipher = XChaCha20Poly1305::new(&wk);
        if let Ok(key_bytes) = wrap_cipher.decrypt(XNonce::from_slice(&ZERO_NONCE), wrapped) {
            content_key_bytes = Some(key_bytes);
            break;
        }
    }
    let Some(content_key_bytes) = content_key_bytes else {
        return Err(Error::DecryptionFailed);
    };
    if content_key_bytes.len() != 32 {
        return Err(Error::MalformedEnvelope);
    }
    let content_key = *Key::from_slice(&content_key_bytes);
    let content_cipher = XChaCha20Poly1305::new(&content_key);
    let ciphertext = &blob[entries_end..];
    content_cipher
        .decrypt(XNonce::from_slice(&content_nonce_bytes), ciphertext)
        .map_err(|_| Error::DecryptionFailed)
}

/// Convenience: derive the sender's X25519 keypair from its Ed25519
/// signing key via curve conversion (spec §4.4: "X25519 derived from the
/// sender's signing key (curve conversion)").
pub fn sender_x25519_keypair(signing_key: &SigningKey) -> (X25519Secret, X25519Public) {
    cube_core::crypto::derive_x25519_keypair(signing_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_and_open_round_trip() {
        let sender_signing = SigningKey::from_bytes(&[1u8; 32]);
        let (sender_secret, sender_public) = sender_x25519_keypair(&sender_signing);

        let recipient_signing = SigningKey::from_bytes(&[2u8; 32]);
        let (recipient_secret, recipient_public) = sender_x25519_keypair(&recipient_signing);

        let plaintext = b"the quick brown fox";
        let blob = seal(plaintext, &sender_secret, &sender_public, &[recipient_public]).unwrap();
        let opened = open(&blob, &recipient_secret).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn wrong_recipient_fails_closed() {
        let sender_signing = SigningKey::from_bytes(&[3u8; 32]);
        let (sender_secret, sender_public) = sender_x25519_keypair(&sender_signing);
        let recipient_signing = SigningKey::from_bytes(&[4u8; 32]);
        let (_, recipient_public) = sender_x25519_keypair(&recipient_signing);
        let outsider_signing = SigningKey::from_bytes(&[5u8; 32]);
        let (outsider_secret, _) = sender_x25519_keypair(&outsider_signing);

        let blob = seal(b"secret", &sender_secret, &sender_public, &[recipient_public]).unwrap();
        assert!(open(&blob, &outsider_secret).is_err());
    }

    #[test]
    fn multi_recipient_each_can_open() {
        let sender_signing = SigningKey::from_bytes(&[6u8; 32]);
        let (sender_secret, sender_public) = sender_x25519_keypair(&sender_signing);
        let a_signing = SigningKey::from_bytes(&[7u8; 32]);
        let (a_secret, a_public) = sender_x25519_keypair(&a_signing);
        let b_signing = SigningKey::from_bytes(&[8u8; 32]);
        let (b_secret, b_public) = sender_x25519_keypair(&b_signing);

        let blob = seal(b"group message", &sender_secret, &sender_public, &[a_public, b_public]).unwrap();
        assert_eq!(open(&blob, &a_secret).unwrap(), b"group message");
        assert_eq!(open(&blob, &b_secret).unwrap(), b"group message");
    }
}
