//! PIN-derived AEAD envelope for secrets at rest.
//!
//! Encrypted record format: `salt (16 bytes) || nonce (12 bytes) ||
//! ciphertext+tag`. Key derivation is PBKDF2-HMAC-SHA256 with a per-entry
//! random salt, at least 100,000 iterations.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use zeroize::Zeroizing;

use bitvault_core::hash::pbkdf2_sha256;

use crate::error::VaultError;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

#[derive(Debug, Clone)]
pub struct EncryptedRecord {
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl EncryptedRecord {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        if bytes.len() < SALT_LEN + NONCE_LEN + 16 {
            return Err(VaultError::InvalidPinOrTampered);
        }
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        salt.copy_from_slice(&bytes[..SALT_LEN]);
        nonce.copy_from_slice(&bytes[SALT_LEN..SALT_LEN + NONCE_LEN]);
        let ciphertext = bytes[SALT_LEN + NONCE_LEN..].to_vec();
        Ok(Self {
            salt,
            nonce,
            ciphertext,
        })
    }
}

fn derive_key(pin: &str, salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
    let derived = pbkdf2_sha256(pin.as_bytes(), salt, MIN_PBKDF2_ITERATIONS, KEY_LEN);
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&derived);
    Zeroizing::new(key)
}

/// Encrypt `plaintext` under a key derived from `pin`, with a fresh
/// random salt and nonce.
pub fn encrypt(pin: &str, plaintext: &[u8]) -> Result<EncryptedRecord, VaultError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let key = derive_key(pin, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| VaultError::Internal("encryption failure".to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(&nonce);

    Ok(EncryptedRecord {
        salt,
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt a record with `pin`. A wrong PIN and a tampered ciphertext
/// both surface as [`VaultError::InvalidPinOrTampered`] — this function
/// does not distinguish them, by design.
pub fn decrypt(pin: &str, record: &EncryptedRecord) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    let key = derive_key(pin, &record.salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&record.nonce), record.ciphertext.as_slice())
        .map_err(|_| VaultError::InvalidPinOrTampered)?;
    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_correct_pin() {
        let record = encrypt("1234", b"top secret mnemonic").unwrap();
        let plaintext = decrypt("1234", &record).unwrap();
        assert_eq!(plaintext.as_slice(), b"top secret mnemonic");
    }

    #[test]
    fn wrong_pin_fails() {
        let record = encrypt("1234", b"top secret mnemonic").unwrap();
        assert!(matches!(
            decrypt("4321", &record),
            Err(VaultError::InvalidPinOrTampered)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_identically() {
        let record = encrypt("1234", b"top secret mnemonic").unwrap();
        let mut bytes = record.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let tampered = EncryptedRecord::from_bytes(&bytes).unwrap();
        assert!(matches!(
            decrypt("1234", &tampered),
            Err(VaultError::InvalidPinOrTampered)
        ));
    }

    #[test]
    fn to_bytes_from_bytes_roundtrips() {
        let record = encrypt("000000", b"seed").unwrap();
        let bytes = record.to_bytes();
        let restored = EncryptedRecord::from_bytes(&bytes).unwrap();
        let plaintext = decrypt("000000", &restored).unwrap();
        assert_eq!(plaintext.as_slice(), b"seed");
    }

    #[test]
    fn distinct_encryptions_use_distinct_salts() {
        let a = encrypt("1234", b"seed").unwrap();
        let b = encrypt("1234", b"seed").unwrap();
        assert_ne!(a.salt, b.salt);
    }
}
