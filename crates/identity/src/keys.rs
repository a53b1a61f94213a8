//! Master-key derivation and the subkey KDF for extension Cubes (spec §4.5,
//! §6 "Subkey seed").

use crate::error::{Error, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use cube_core::crypto::sha3_256;
use ed25519_dalek::SigningKey;
use hkdf::Hkdf;
use sha2::Sha256;

/// Context string the spec names for the extension-Cube KDF.
const EXTENSION_KEY_CONTEXT: &[u8] = b"MUC extension key";

/// Argon2id master-key derivation over `username || passphrase`. The salt
/// must itself be deterministic (so `Identity::load` can reproduce the
/// same master key from credentials alone): we derive it from the
/// username via SHA3-256, truncated to Argon2's minimum salt length. This
/// is an implementation decision the spec leaves open (see DESIGN.md).
pub fn derive_master_key(username: &str, passphrase: &str, cpu_hardness: u32, memory_hardness: u32) -> Result<[u8; 32]> {
    let salt = sha3_256(username.as_bytes());
    let params = Params::new(memory_hardness, cpu_hardness, 1, Some(32))
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut master_key = [0u8; 32];
    let mut input = Vec::with_capacity(username.len() + passphrase.len());
    input.extend_from_slice(username.as_bytes());
    input.extend_from_slice(passphrase.as_bytes());
    argon2
        .hash_password_into(&input, &salt[..16], &mut master_key)
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;
    Ok(master_key)
}

/// Ed25519 signing keypair derived directly from the master key, the way
/// libsodium's `crypto_sign_seed_keypair` treats a 32-byte seed.
pub fn derive_signing_key(master_key: &[u8; 32]) -> SigningKey {
    SigningKey::from_bytes(master_key)
}

/// Deterministic 5-byte avatar seed (spec §4.5 "Create").
pub fn derive_avatar_seed(master_key: &[u8; 32]) -> [u8; 5] {
    let hash = sha3_256(master_key);
    let mut seed = [0u8; 5];
    seed.copy_from_slice(&hash[..5]);
    seed
}

/// Derive the signing key for extension Cube number `index` (0-based, in
/// chain order) from the owner's master key, via HKDF-SHA256 with the
/// info string `"MUC extension key" || index`.
pub fn derive_extension_signing_key(master_key: &[u8; 32], index: u8) -> SigningKey {
    let hk = Hkdf::<Sha256>::new(None, master_key);
    let mut info = Vec::with_capacity(EXTENSION_KEY_CONTEXT.len() + 1);
    info.extend_from_slice(EXTENSION_KEY_CONTEXT);
    info.push(index);
    let mut subkey_seed = [0u8; 32];
    hk.expand(&info, &mut subkey_seed)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    SigningKey::from_bytes(&subkey_seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_key_derivation_is_deterministic() {
        let a = derive_master_key("alice", "hunter2", 3, 1 << 14).unwrap();
        let b = derive_master_key("alice", "hunter2", 3, 1 << 14).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_credentials_yield_different_keys() {
        let a = derive_master_key("alice", "hunter2", 3, 1 << 14).unwrap();
        let b = derive_master_key("alice", "hunter3", 3, 1 << 14).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn extension_keys_are_distinct_per_index_and_stable() {
        let master_key = [7u8; 32];
        let k0a = derive_extension_signing_key(&master_key, 0);
        let k0b = derive_extension_signing_key(&master_key, 0);
        let k1 = derive_extension_signing_key(&master_key, 1);
        assert_eq!(k0a.to_bytes(), k0b.to_bytes());
        assert_ne!(k0a.to_bytes(), k1.to_bytes());
    }
}
