//! ECDSA and BIP340 Schnorr signing/verification over secp256k1.

use bitcoin::hashes::Hash;
use secp256k1::{ecdsa, schnorr, Keypair, Message, PublicKey, Secp256k1, SecretKey, XOnlyPublicKey};

use crate::error::PrimitiveError;
use crate::hash::sha256;

/// BIP340 tagged hash: `sha256(sha256(tag) || sha256(tag) || msg)`.
pub fn tagged_hash(tag: &str, msg: &[u8]) -> [u8; 32] {
    let tag_hash = sha256(tag.as_bytes());
    let mut data = Vec::with_capacity(64 + msg.len());
    data.extend_from_slice(&tag_hash);
    data.extend_from_slice(&tag_hash);
    data.extend_from_slice(msg);
    sha256(&data)
}

pub fn ecdsa_sign(secret_key: &SecretKey, digest: &[u8; 32]) -> Result<ecdsa::Signature, PrimitiveError> {
    let secp = Secp256k1::signing_only();
    let msg = Message::from_digest(*digest);
    Ok(secp.sign_ecdsa(&msg, secret_key))
}

pub fn ecdsa_verify(
    public_key: &PublicKey,
    digest: &[u8; 32],
    sig: &ecdsa::Signature,
) -> Result<(), PrimitiveError> {
    let secp = Secp256k1::verification_only();
    let msg = Message::from_digest(*digest);
    secp.verify_ecdsa(&msg, sig, public_key)
        .map_err(|e| PrimitiveError::SignatureFailed(e.to_string()))
}

/// BIP340 Schnorr sign. `aux_rand` should be fresh randomness (all-zero is
/// valid but discouraged — see BIP340's auxiliary-randomness rationale).
pub fn schnorr_sign(
    keypair: &Keypair,
    digest: &[u8; 32],
    aux_rand: [u8; 32],
) -> schnorr::Signature {
    let secp = Secp256k1::signing_only();
    let msg = Message::from_digest(*digest);
    secp.sign_schnorr_with_aux_rand(&msg, keypair, &aux_rand)
}

pub fn schnorr_verify(
    xonly: &XOnlyPublicKey,
    digest: &[u8; 32],
    sig: &schnorr::Signature,
) -> Result<(), PrimitiveError> {
    let secp = Secp256k1::verification_only();
    let msg = Message::from_digest(*digest);
    secp.verify_schnorr(sig, &msg, xonly)
        .map_err(|e| PrimitiveError::SignatureFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::rand::rngs::OsRng;

    #[test]
    fn ecdsa_roundtrip() {
        let secp = Secp256k1::new();
        let (sk, pk) = secp.generate_keypair(&mut OsRng);
        let digest = sha256(b"hello world");
        let sig = ecdsa_sign(&sk, &digest).unwrap();
        assert!(ecdsa_verify(&pk, &digest, &sig).is_ok());
    }

    #[test]
    fn ecdsa_rejects_wrong_message() {
        let secp = Secp256k1::new();
        let (sk, pk) = secp.generate_keypair(&mut OsRng);
        let digest = sha256(b"hello world");
        let other = sha256(b"goodbye world");
        let sig = ecdsa_sign(&sk, &digest).unwrap();
        assert!(ecdsa_verify(&pk, &other, &sig).is_err());
    }

    #[test]
    fn schnorr_roundtrip() {
        let secp = Secp256k1::new();
        let keypair = Keypair::new(&secp, &mut OsRng);
        let (xonly, _parity) = keypair.x_only_public_key();
        let digest = sha256(b"taproot message");
        let sig = schnorr_sign(&keypair, &digest, [0u8; 32]);
        assert!(schnorr_verify(&xonly, &digest, &sig).is_ok());
    }

    #[test]
    fn tagged_hash_is_deterministic_and_tag_sensitive() {
        let a = tagged_hash("TapTweak", b"data");
        let b = tagged_hash("TapTweak", b"data");
        let c = tagged_hash("TapLeaf", b"data");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
