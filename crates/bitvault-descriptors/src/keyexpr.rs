//! Key expression grammar: `[fingerprint/origin-path]key/chain/*`.

use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOrigin {
    /// 8 hex characters (4 bytes) identifying the master key.
    pub fingerprint: String,
    /// The hardened-or-not derivation path from the master to this key,
    /// e.g. `44'/0'/0'`.
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wildcard {
    None,
    /// Trailing `/*` — unhardened range.
    Unhardened,
    /// Trailing `/*'` or `/*h` — hardened range.
    Hardened,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyExpression {
    pub origin: Option<KeyOrigin>,
    /// The key material itself (xpub/xprv/pubkey hex/WIF), as written.
    pub key: String,
    /// Any fixed path segments between the key and the wildcard, e.g.
    /// the `0` in `.../0/*`.
    pub derivation_suffix: Vec<String>,
    pub wildcard: Wildcard,
}

impl KeyExpression {
    pub fn is_range(&self) -> bool {
        self.wildcard != Wildcard::None
    }
}

fn is_hardened_marker(s: &str) -> bool {
    s == "h" || s == "H" || s == "'"
}

/// Parse a single key expression (the argument to `pkh(...)`, `wpkh(...)`,
/// `tr(...)`, or a single entry inside `multi(...)`).
pub fn parse_key_expression(input: &str) -> Result<KeyExpression, DescriptorError> {
    if input.is_empty() {
        return Err(DescriptorError::MalformedKeyExpression(
            "empty key expression".to_string(),
        ));
    }

    let (origin, rest) = if let Some(stripped) = input.strip_prefix('[') {
        let close = stripped
            .find(']')
            .ok_or(DescriptorError::UnbalancedBrackets)?;
        let origin_str = &stripped[..close];
        let rest = &stripped[close + 1..];

        let (fingerprint, path) = match origin_str.split_once('/') {
            Some((fp, p)) => (fp, p),
            None => (origin_str, ""),
        };
        if fingerprint.len() != 8 || !fingerprint.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DescriptorError::MalformedKeyExpression(format!(
                "invalid fingerprint '{fingerprint}'"
            )));
        }
        (
            Some(KeyOrigin {
                fingerprint: fingerprint.to_lowercase(),
                path: path.to_string(),
            }),
            rest,
        )
    } else {
        (None, input)
    };

    if rest.is_empty() {
        return Err(DescriptorError::MalformedKeyExpression(
            "missing key material".to_string(),
        ));
    }

    let mut segments: Vec<&str> = rest.split('/').collect();
    let key = segments.remove(0).to_string();
    if key.is_empty() {
        return Err(DescriptorError::MalformedKeyExpression(
            "empty key material".to_string(),
        ));
    }

    let mut wildcard = Wildcard::None;
    if let Some(last) = segments.last().copied() {
        if last == "*" {
            wildcard = Wildcard::Unhardened;
            segments.pop();
        } else if last.starts_with('*') && last.len() > 1 && is_hardened_marker(&last[1..]) {
            wildcard = Wildcard::Hardened;
            segments.pop();
        }
    }

    Ok(KeyExpression {
        origin,
        key,
        derivation_suffix: segments.into_iter().map(|s| s.to_string()).collect(),
        wildcard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const XPUB: &str = "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8";

    #[test]
    fn plain_xpub_has_no_origin_or_wildcard() {
        let ke = parse_key_expression(XPUB).unwrap();
        assert!(ke.origin.is_none());
        assert_eq!(ke.key, XPUB);
        assert_eq!(ke.wildcard, Wildcard::None);
    }

    #[test]
    fn origin_prefix_is_parsed() {
        let input = format!("[d34db33f/44'/0'/0']{XPUB}");
        let ke = parse_key_expression(&input).unwrap();
        let origin = ke.origin.unwrap();
        assert_eq!(origin.fingerprint, "d34db33f");
        assert_eq!(origin.path, "44'/0'/0'");
        assert_eq!(ke.key, XPUB);
    }

    #[test]
    fn unhardened_wildcard_is_detected() {
        let input = format!("{XPUB}/0/*");
        let ke = parse_key_expression(&input).unwrap();
        assert_eq!(ke.wildcard, Wildcard::Unhardened);
        assert_eq!(ke.derivation_suffix, vec!["0".to_string()]);
    }

    #[test]
    fn hardened_wildcard_is_detected() {
        let input = format!("{XPUB}/0/*'");
        let ke = parse_key_expression(&input).unwrap();
        assert_eq!(ke.wildcard, Wildcard::Hardened);
    }

    #[test]
    fn invalid_fingerprint_length_is_rejected() {
        let input = format!("[d34db3/44'/0'/0']{XPUB}");
        assert!(parse_key_expression(&input).is_err());
    }

    #[test]
    fn unbalanced_origin_bracket_is_rejected() {
        let input = format!("[d34db33f/44'/0'/0'{XPUB}");
        assert!(parse_key_expression(&input).is_err());
    }
}
