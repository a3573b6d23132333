//! Address safety: deep sanitization, poisoning/similarity detection, and
//! recipient risk hints (spec §4.10).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeResult {
    pub cleaned: String,
    pub was_modified: bool,
}

const BECH32_PREFIXES: &[&str] = &["bc1", "tb1"];

/// Strip zero-width/invisible/whitespace characters an attacker could use
/// to make a spoofed address visually indistinguishable from the real
/// one, and lowercase a recognized bech32 prefix (legacy addresses are
/// case-sensitive and are left untouched). Idempotent.
pub fn deep_sanitize_address(input: &str) -> SanitizeResult {
    let cleaned: String = input
        .chars()
        .filter(|c| !is_stripped_char(*c))
        .collect();

    let lowered = lowercase_bech32_prefix(&cleaned);
    let was_modified = lowered != input;

    SanitizeResult { cleaned: lowered, was_modified }
}

fn is_stripped_char(c: char) -> bool {
    matches!(c,
        '\u{200B}'..='\u{200F}' // zero-width space/joiners, LTR/RTL marks
        | '\u{FEFF}'            // BOM
        | '\u{202A}'..='\u{202E}' // bidi overrides
        | '\u{2066}'..='\u{2069}' // bidi isolates
        | '\u{00A0}'            // NBSP
        | '\t' | '\n' | '\r' | ' '
    )
}

fn lowercase_bech32_prefix(s: &str) -> String {
    let lower = s.to_lowercase();
    for prefix in BECH32_PREFIXES {
        if lower.starts_with(prefix) {
            return lower;
        }
    }
    s.to_string()
}

/// Detect the canonical address-poisoning pattern: a candidate that is
/// not `addr` itself but shares the same first `prefix_len` and last
/// `suffix_len` characters (case-insensitive).
pub fn detect_address_similarity(
    addr: &str,
    candidates: &[String],
    prefix_len: usize,
    suffix_len: usize,
) -> Option<String> {
    let addr_lower = addr.to_lowercase();
    if addr_lower.len() < prefix_len + suffix_len {
        return None;
    }
    let addr_prefix = &addr_lower[..prefix_len];
    let addr_suffix = &addr_lower[addr_lower.len() - suffix_len..];

    candidates.iter().find_map(|candidate| {
        if candidate.eq_ignore_ascii_case(addr) {
            return None;
        }
        let lower = candidate.to_lowercase();
        if lower.len() < prefix_len + suffix_len {
            return None;
        }
        let prefix = &lower[..prefix_len];
        let suffix = &lower[lower.len() - suffix_len..];
        if prefix == addr_prefix && suffix == addr_suffix {
            Some(candidate.clone())
        } else {
            None
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Danger,
    Caution,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskHint {
    pub code: String,
    pub level: RiskLevel,
    pub message: String,
}

/// Produce sorted (danger < caution < info) risk hints for sending to
/// `addr`.
pub fn analyze_recipient_risk(
    addr: &str,
    own_addresses: &[String],
    recent_recipients: &[String],
    contact_addresses: &[String],
) -> Vec<RiskHint> {
    let mut hints = Vec::new();

    if own_addresses.iter().any(|a| a.eq_ignore_ascii_case(addr)) {
        hints.push(RiskHint {
            code: "SELF_SEND".to_string(),
            level: RiskLevel::Caution,
            message: "this address belongs to one of your own wallets".to_string(),
        });
    }

    let all_known: Vec<String> =
        own_addresses.iter().chain(recent_recipients.iter()).chain(contact_addresses.iter()).cloned().collect();
    if let Some(similar) = detect_address_similarity(addr, &all_known, 6, 6) {
        hints.push(RiskHint {
            code: "ADDRESS_SIMILARITY".to_string(),
            level: RiskLevel::Danger,
            message: format!("this address closely resembles a known address: {similar}"),
        });
    }

    let is_known = own_addresses.iter().chain(recent_recipients.iter()).chain(contact_addresses.iter())
        .any(|a| a.eq_ignore_ascii_case(addr));
    if !is_known {
        hints.push(RiskHint {
            code: "NEW_RECIPIENT".to_string(),
            level: RiskLevel::Info,
            message: "you have not sent to this address before".to_string(),
        });
    }

    hints.sort_by_key(|h| h.level);
    hints
}

/// Split `address` into chunks of `size` characters for display, e.g.
/// `bc1q...` into groups of 4. The last chunk may be shorter.
/// `chunks.join("") == address`.
pub fn format_address_chunked(address: &str, size: usize) -> Vec<String> {
    if size == 0 {
        return vec![address.to_string()];
    }
    address.chars().collect::<Vec<_>>().chunks(size).map(|c| c.iter().collect()).collect()
}
