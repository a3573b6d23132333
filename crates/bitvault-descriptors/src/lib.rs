//! BitVault Descriptor Engine
//!
//! Parsing, validation, and checksum handling for the subset of BIP380
//! output descriptors this wallet supports: `pkh`, `wpkh`, `sh(wpkh(..))`,
//! `tr`, `multi/sortedmulti(..)` (bare, normalized to p2wsh),
//! `wsh(multi/sortedmulti(..))`, `sh(wsh(multi/sortedmulti(..)))`.

pub mod cache;
pub mod checksum;
pub mod error;
pub mod keyexpr;
pub mod parser;

use serde::{Deserialize, Serialize};

pub use bitvault_keys::ScriptType;
pub use cache::DescriptorCache;
pub use error::DescriptorError;
pub use keyexpr::{KeyExpression, KeyOrigin, Wildcard};
pub use parser::DescriptorFunction;

/// The parsed, validated shape of a descriptor, as handed back to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorInfo {
    pub descriptor: String,
    pub script_type: ScriptType,
    #[serde(skip)]
    pub function: DescriptorFunction,
    pub is_range: bool,
    pub is_multisig: bool,
    pub threshold: Option<u32>,
    pub total_keys: usize,
    pub keys: Vec<KeyExpression>,
    pub checksum: Option<String>,
    pub is_valid: bool,
}

fn build_info(descriptor: &str, checksum: Option<String>) -> Result<DescriptorInfo, DescriptorError> {
    let body = checksum::strip_checksum(descriptor)?;
    let parsed = parser::parse_body(&body)?;
    let is_range = parsed.keys.iter().any(|k| k.is_range());

    Ok(DescriptorInfo {
        descriptor: descriptor.to_string(),
        script_type: parsed.script_type,
        function: parsed.function,
        is_range,
        is_multisig: parsed.is_multisig,
        threshold: parsed.threshold,
        total_keys: parsed.keys.len(),
        keys: parsed.keys,
        checksum,
        is_valid: true,
    })
}

/// Parse and validate a descriptor string, consulting and populating
/// `cache` keyed by the exact input string.
pub fn parse_descriptor(
    descriptor: &str,
    cache: &DescriptorCache,
) -> Result<DescriptorInfo, DescriptorError> {
    if let Some(cached) = cache.get(descriptor) {
        return Ok(cached);
    }

    let checksum = descriptor
        .split_once('#')
        .map(|(_, checksum)| checksum.to_string());

    let info = build_info(descriptor, checksum)?;
    cache.insert(descriptor.to_string(), info.clone());
    Ok(info)
}

/// Parse without consulting or populating any cache.
pub fn parse_descriptor_uncached(descriptor: &str) -> Result<DescriptorInfo, DescriptorError> {
    let checksum = descriptor
        .split_once('#')
        .map(|(_, checksum)| checksum.to_string());
    build_info(descriptor, checksum)
}

/// Produce the canonical form of a descriptor with its checksum appended
/// (computing one if the input lacks it, validating it if present).
pub fn canonicalize(descriptor: &str) -> Result<String, DescriptorError> {
    let body = checksum::strip_checksum(descriptor)?;
    checksum::add_checksum(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const XPUB_A: &str = "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8";
    const XPUB_B: &str = "xpub69H7F5d8KSRgmmdJg2KhpAK8SR3DjMwAdkxj3ZuxV27CprR9LgpeyGmXUbC6wb7ERfvrnKZjXoUmmDznezpbZb7ap6r1D3tgFxHmwMkQTPH";

    #[test]
    fn parses_wpkh_with_wildcard_range() {
        let desc = format!("wpkh({XPUB_A}/0/*)");
        let info = parse_descriptor_uncached(&desc).unwrap();
        assert_eq!(info.script_type, ScriptType::P2wpkh);
        assert!(info.is_range);
        assert!(!info.is_multisig);
        assert_eq!(info.total_keys, 1);
    }

    #[test]
    fn parses_checksummed_multisig_descriptor() {
        let body = format!("wsh(sortedmulti(2,{XPUB_A},{XPUB_B}))");
        let full = canonicalize(&body).unwrap();
        let info = parse_descriptor_uncached(&full).unwrap();
        assert!(info.is_multisig);
        assert_eq!(info.threshold, Some(2));
        assert_eq!(info.total_keys, 2);
        assert!(info.checksum.is_some());
    }

    #[test]
    fn invalid_checksum_is_rejected() {
        let body = format!("wpkh({XPUB_A})");
        let mut full = canonicalize(&body).unwrap();
        let last = full.pop().unwrap();
        full.push(if last == 'q' { 'p' } else { 'q' });
        assert!(parse_descriptor_uncached(&full).is_err());
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let body = format!("tr({XPUB_A})");
        let once = canonicalize(&body).unwrap();
        let twice = canonicalize(&once).unwrap();
        assert_eq!(once, twice);
    }
}
