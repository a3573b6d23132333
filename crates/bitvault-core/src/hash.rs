//! Hash and key-derivation primitives.
//!
//! Thin, deterministic wrappers over `bitcoin::hashes` and RustCrypto's
//! `pbkdf2`/`hkdf`/`hmac` crates. Nothing here allocates more than its
//! output, and nothing here talks to the network or disk.

use bitcoin::hashes::{hash160, ripemd160, sha256, sha256d, Hash};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::{Sha256, Sha512};

use crate::error::PrimitiveError;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256::Hash::hash(data).to_byte_array()
}

pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    ripemd160::Hash::hash(data).to_byte_array()
}

/// `RIPEMD160(SHA256(data))` — the hash used for P2PKH/P2WPKH/P2SH scripts.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

/// HMAC-SHA512, as used by BIP32 chain code derivation and BIP39 root
/// entropy (the `bip39` crate does this internally for seed derivation;
/// this is exposed for callers that need the primitive directly, e.g.
/// BIP32 child derivation done outside the `bitcoin` crate's own bip32
/// module).
pub fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; 64], PrimitiveError> {
    let mut mac = Hmac::<Sha512>::new_from_slice(key)
        .map_err(|e| PrimitiveError::Internal(e.to_string()))?;
    mac.update(data);
    let result = mac.finalize().into_bytes();
    let mut out = [0u8; 64];
    out.copy_from_slice(&result);
    Ok(out)
}

/// PBKDF2-HMAC-SHA512, used by BIP39 seed derivation
/// (`mnemonic + passphrase -> 64-byte seed`, 2048 iterations).
pub fn pbkdf2_sha512(password: &[u8], salt: &[u8], iterations: u32, out_len: usize) -> Vec<u8> {
    let mut out = vec![0u8; out_len];
    pbkdf2::pbkdf2_hmac::<Sha512>(password, salt, iterations, &mut out);
    out
}

/// PBKDF2-HMAC-SHA256, used by [`bitvault-vault`](../bitvault_vault/index.html)
/// to derive the AES-256-GCM key from a user PIN.
pub fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32, out_len: usize) -> Vec<u8> {
    let mut out = vec![0u8; out_len];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
    out
}

/// HKDF-SHA256 (extract-then-expand), used for deriving sub-keys from
/// already-high-entropy input keying material (e.g. splitting a cosigner
/// seed into per-purpose keys) without burning PBKDF2 iterations on data
/// that is not a human password.
pub fn hkdf_sha256(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
    out_len: usize,
) -> Result<Vec<u8>, PrimitiveError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut out = vec![0u8; out_len];
    hk.expand(info, &mut out)
        .map_err(|e| PrimitiveError::Internal(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash160_matches_sha256_then_ripemd160() {
        let data = b"correct horse battery staple";
        let expected = ripemd160(&sha256(data));
        assert_eq!(hash160(data), expected);
    }

    #[test]
    fn sha256d_is_sha256_twice() {
        let data = b"hello";
        let once = sha256(data);
        let twice = sha256(&once);
        assert_eq!(sha256d(data), twice);
    }

    #[test]
    fn hmac_sha512_is_deterministic() {
        let a = hmac_sha512(b"key", b"data").unwrap();
        let b = hmac_sha512(b"key", b"data").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn pbkdf2_sha512_matches_known_length() {
        let out = pbkdf2_sha512(b"mnemonic", b"mnemonicsalt", 2048, 64);
        assert_eq!(out.len(), 64);
        // deterministic
        let out2 = pbkdf2_sha512(b"mnemonic", b"mnemonicsalt", 2048, 64);
        assert_eq!(out, out2);
    }

    #[test]
    fn hkdf_sha256_expands_to_requested_length() {
        let out = hkdf_sha256(b"ikm-material", b"salt", b"info", 48).unwrap();
        assert_eq!(out.len(), 48);
    }
}
