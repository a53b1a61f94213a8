//! Hashing, signing, and key-conversion primitives (spec §6: "Hashes and
//! keys: SHA3-256 throughout; curve Ed25519 for signing, converted to
//! X25519 for sealed-box-style key wrapping").

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::Sha512;
use sha3::{Digest, Sha3_256};

/// SHA3-256 over arbitrary bytes.
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Count trailing zero bits of a 32-byte hash, MSB-first within each byte
/// (i.e. the hashcash target counts from the *end* of the digest, as is
/// conventional for hashcash-style proof of work over a fixed digest).
pub fn trailing_zero_bits(hash: &[u8; 32]) -> u32 {
    let mut count = 0u32;
    for byte in hash.iter().rev() {
        if *byte == 0 {
            count += 8;
            continue;
        }
        count += byte.trailing_zeros();
        break;
    }
    count
}

/// Sign `message` with an Ed25519 signing key, returning the raw 64-byte
/// signature.
pub fn sign(signing_key: &SigningKey, message: &[u8]) -> [u8; 64] {
    signing_key.sign(message).to_bytes()
}

/// Verify a raw 64-byte Ed25519 signature under `public_key`.
pub fn verify(public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let sig = Signature::from_bytes(signature);
    verifying_key.verify(message, &sig).is_ok()
}

/// Convert an Ed25519 signing key to an X25519 static secret, the way
/// libsodium's `crypto_sign_ed25519_sk_to_curve25519` does: hash the
/// 32-byte seed with SHA-512 and clamp the low 32 bytes as a Curve25519
/// scalar. Used to derive a Veritum sender's / Identity's encryption
/// keypair from its signing keypair (spec §4.4, §4.5).
pub fn ed25519_seed_to_x25519_scalar(seed: &[u8; 32]) -> [u8; 32] {
    use sha2::Digest as _;
    let mut hasher = Sha512::new();
    hasher.update(seed);
    let digest = hasher.finalize();
    let mut scalar = [0u8; 32];
    scalar.copy_from_slice(&digest[..32]);
    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;
    scalar
}

/// Derive the X25519 static secret / public key pair for a given Ed25519
/// signing key, via curve conversion of its seed.
pub fn derive_x25519_keypair(signing_key: &SigningKey) -> (x25519_dalek::StaticSecret, x25519_dalek::PublicKey) {
    let scalar = ed25519_seed_to_x25519_scalar(&signing_key.to_bytes());
    let secret = x25519_dalek::StaticSecret::from(scalar);
    let public = x25519_dalek::PublicKey::from(&secret);
    (secret, public)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_zero_bits_all_zero() {
        assert_eq!(trailing_zero_bits(&[0u8; 32]), 256);
    }

    #[test]
    fn trailing_zero_bits_none() {
        let mut hash = [0u8; 32];
        hash[31] = 1;
        assert_eq!(trailing_zero_bits(&hash), 0);
    }

    #[test]
    fn trailing_zero_bits_counts_across_byte_boundary() {
        let mut hash = [0u8; 32];
        hash[31] = 0; // last byte all-zero: 8 bits
        hash[30] = 0b0000_0100; // contributes 2 more trailing zero bits
        assert_eq!(trailing_zero_bits(&hash), 10);
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let msg = b"hello cube";
        let sig = sign(&signing_key, msg);
        let public = signing_key.verifying_key().to_bytes();
        assert!(verify(&public, msg, &sig));
        assert!(!verify(&public, b"tampered", &sig));
    }

    #[test]
    fn x25519_conversion_is_deterministic() {
        let signing_key = SigningKey::from_bytes(&[9u8; 32]);
        let (_, pub1) = derive_x25519_keypair(&signing_key);
        let (_, pub2) = derive_x25519_keypair(&signing_key);
        assert_eq!(pub1.as_bytes(), pub2.as_bytes());
    }
}
