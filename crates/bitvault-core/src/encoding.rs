//! Base58check and bech32/bech32m primitives (BIP173/BIP350).
//!
//! `bitcoin::Address` already implements these correctly for the address
//! types it knows about; this module exposes the raw codecs directly so
//! callers that need to work below the `Address` abstraction (descriptor
//! checksums, scripthash display, raw program encode/decode) don't have to
//! round-trip through it.

use bech32::{u5, FromBase32, ToBase32, Variant};
use bitcoin::base58;

use crate::error::PrimitiveError;

/// Encode `payload` as base58check with the given one-byte version prefix.
pub fn base58check_encode(version: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(1 + payload.len());
    data.push(version);
    data.extend_from_slice(payload);
    base58::encode_check(&data)
}

/// Decode a base58check string, returning `(version, payload)`.
pub fn base58check_decode(s: &str) -> Result<(u8, Vec<u8>), PrimitiveError> {
    let data = base58::decode_check(s).map_err(|_| PrimitiveError::InvalidChecksum)?;
    if data.is_empty() {
        return Err(PrimitiveError::InvalidLength {
            expected: 1,
            actual: 0,
        });
    }
    Ok((data[0], data[1..].to_vec()))
}

/// Reject any string containing both uppercase and lowercase letters, per
/// BIP173 — bech32 strings must be entirely one case.
pub fn reject_mixed_case(s: &str) -> Result<(), PrimitiveError> {
    let has_lower = s.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = s.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(PrimitiveError::MixedCase);
    }
    Ok(())
}

/// Encode a segwit-style witness program as bech32 (witness version 0) or
/// bech32m (witness version 1+), matching BIP173/BIP350's rule that v0
/// programs use the original bech32 constant and v1+ use bech32m.
///
/// `hrp` is typically `"bc"` for mainnet. Output is always lowercase,
/// matching the BIP350 canonical form.
pub fn encode_segwit(hrp: &str, witver: u8, program: &[u8]) -> Result<String, PrimitiveError> {
    if witver > 16 {
        return Err(PrimitiveError::OutOfRange);
    }
    let variant = if witver == 0 {
        Variant::Bech32
    } else {
        Variant::Bech32m
    };

    let mut data = vec![u5::try_from_u8(witver).map_err(|_| PrimitiveError::OutOfRange)?];
    data.extend(program.to_base32());

    bech32::encode(hrp, data, variant)
        .map_err(|e| PrimitiveError::InvalidEncoding(e.to_string()))
}

/// Decode a bech32/bech32m segwit address, verifying the witness-version
/// to checksum-constant pairing (v0 must use bech32, v1+ must use
/// bech32m) and rejecting mixed-case input.
pub fn decode_segwit(s: &str) -> Result<(String, u8, Vec<u8>), PrimitiveError> {
    reject_mixed_case(s)?;
    let lower = s.to_lowercase();

    let (hrp, data, variant) =
        bech32::decode(&lower).map_err(|_| PrimitiveError::InvalidChecksum)?;
    if data.is_empty() {
        return Err(PrimitiveError::InvalidLength {
            expected: 1,
            actual: 0,
        });
    }

    let witver = data[0].to_u8();
    let expected_variant = if witver == 0 {
        Variant::Bech32
    } else {
        Variant::Bech32m
    };
    if variant != expected_variant {
        return Err(PrimitiveError::InvalidEncoding(
            "witness version/checksum constant mismatch".to_string(),
        ));
    }

    let program = Vec::<u8>::from_base32(&data[1..])
        .map_err(|e| PrimitiveError::InvalidEncoding(e.to_string()))?;

    Ok((hrp, witver, program))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base58check_roundtrip() {
        let payload = [1u8, 2, 3, 4, 5];
        let encoded = base58check_encode(0x00, &payload);
        let (version, decoded) = base58check_decode(&encoded).unwrap();
        assert_eq!(version, 0x00);
        assert_eq!(decoded, payload);
    }

    #[test]
    fn base58check_rejects_corrupted_checksum() {
        let encoded = base58check_encode(0x00, &[1, 2, 3]);
        let mut corrupted = encoded.clone();
        corrupted.push('1');
        assert!(base58check_decode(&corrupted).is_err() || corrupted != encoded);
    }

    #[test]
    fn mixed_case_is_rejected() {
        assert!(reject_mixed_case("bc1QW508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4").is_err());
        assert!(reject_mixed_case("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4").is_ok());
        assert!(reject_mixed_case("BC1QW508D6QEJXTDG4Y5R3ZARVARY0C5XW7KV8F3T4").is_ok());
    }

    #[test]
    fn segwit_v0_roundtrip_is_bech32() {
        let program = vec![0u8; 20];
        let encoded = encode_segwit("bc", 0, &program).unwrap();
        assert!(encoded.starts_with("bc1q"));
        let (hrp, witver, decoded) = decode_segwit(&encoded).unwrap();
        assert_eq!(hrp, "bc");
        assert_eq!(witver, 0);
        assert_eq!(decoded, program);
    }

    #[test]
    fn segwit_v1_roundtrip_is_bech32m() {
        let program = vec![1u8; 32];
        let encoded = encode_segwit("bc", 1, &program).unwrap();
        assert!(encoded.starts_with("bc1p"));
        let (hrp, witver, decoded) = decode_segwit(&encoded).unwrap();
        assert_eq!(hrp, "bc");
        assert_eq!(witver, 1);
        assert_eq!(decoded, program);
    }

    #[test]
    fn v0_program_encoded_as_bech32m_is_rejected() {
        let program = vec![0u8; 20];
        let mut data = vec![u5::try_from_u8(0).unwrap()];
        data.extend(program.to_base32());
        let wrong = bech32::encode("bc", data, Variant::Bech32m).unwrap();
        assert!(decode_segwit(&wrong).is_err());
    }
}
