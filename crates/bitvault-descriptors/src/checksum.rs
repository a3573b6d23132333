//! BIP380 descriptor checksum (a BCH-style polymod over a 6-bit charset).

use crate::error::DescriptorError;

const INPUT_CHARSET: &str =
    "0123456789()[],'/*abcdefgh@:$%{}IJKLMNOPQRSTUVWXYZ&+-.;<=>?!^_|~ijklmnopqrstuvwxyzABCDEFGH`#\"\\ ";
const CHECKSUM_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

fn polymod(c: u64, val: u64) -> u64 {
    let c0 = c >> 35;
    let mut c = ((c & 0x7_ffff_ffff) << 5) ^ val;
    if c0 & 1 != 0 {
        c ^= 0xf5_dee5_1989;
    }
    if c0 & 2 != 0 {
        c ^= 0xa9_fdca_3312;
    }
    if c0 & 4 != 0 {
        c ^= 0x1b_ab10_e32d;
    }
    if c0 & 8 != 0 {
        c ^= 0x37_06b1_677a;
    }
    if c0 & 16 != 0 {
        c ^= 0x64_4d62_6ffd;
    }
    c
}

/// Compute the 8-character BIP380 checksum for a descriptor expression
/// (without its own checksum suffix).
pub fn compute_checksum(desc: &str) -> Result<String, DescriptorError> {
    let mut c: u64 = 1;
    let mut cls: u64 = 0;
    let mut clscount: u32 = 0;

    for ch in desc.chars() {
        let pos = INPUT_CHARSET
            .find(ch)
            .ok_or(DescriptorError::InvalidCharacter(ch))? as u64;
        c = polymod(c, pos & 31);
        cls = cls * 3 + (pos >> 5);
        clscount += 1;
        if clscount == 3 {
            c = polymod(c, cls);
            cls = 0;
            clscount = 0;
        }
    }
    if clscount > 0 {
        c = polymod(c, cls);
    }
    for _ in 0..8 {
        c = polymod(c, 0);
    }
    c ^= 1;

    let checksum_chars: Vec<char> = CHECKSUM_CHARSET.chars().collect();
    let mut ret = String::with_capacity(8);
    for j in 0..8 {
        let idx = (c >> (5 * (7 - j))) & 31;
        ret.push(checksum_chars[idx as usize]);
    }
    Ok(ret)
}

/// Append `#<checksum>` to a descriptor expression.
pub fn add_checksum(desc: &str) -> Result<String, DescriptorError> {
    let checksum = compute_checksum(desc)?;
    Ok(format!("{desc}#{checksum}"))
}

/// Remove any `#<checksum>` suffix, validating it if present. Returns the
/// bare expression.
pub fn strip_checksum(desc_with_maybe_checksum: &str) -> Result<String, DescriptorError> {
    match desc_with_maybe_checksum.split_once('#') {
        None => Ok(desc_with_maybe_checksum.to_string()),
        Some((body, checksum)) => {
            if checksum.len() != 8 {
                return Err(DescriptorError::MalformedChecksum);
            }
            let expected = compute_checksum(body)?;
            if expected != checksum {
                return Err(DescriptorError::ChecksumMismatch);
            }
            Ok(body.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_eight_chars_from_checksum_charset() {
        let checksum = compute_checksum("wpkh(xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8)").unwrap();
        assert_eq!(checksum.len(), 8);
        assert!(checksum.chars().all(|c| CHECKSUM_CHARSET.contains(c)));
    }

    #[test]
    fn add_then_strip_roundtrips() {
        let desc = "pkh(02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5)";
        let with_sum = add_checksum(desc).unwrap();
        let stripped = strip_checksum(&with_sum).unwrap();
        assert_eq!(stripped, desc);
    }

    #[test]
    fn tampered_checksum_is_rejected() {
        let desc = "pkh(02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5)";
        let with_sum = add_checksum(desc).unwrap();
        let mut tampered = with_sum.clone();
        let last = tampered.pop().unwrap();
        let replacement = if last == 'q' { 'p' } else { 'q' };
        tampered.push(replacement);
        assert_eq!(strip_checksum(&tampered), Err(DescriptorError::ChecksumMismatch));
    }

    #[test]
    fn bare_descriptor_without_checksum_passes_through() {
        let desc = "wpkh(xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8)";
        assert_eq!(strip_checksum(desc).unwrap(), desc);
    }
}
