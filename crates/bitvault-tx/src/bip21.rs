//! BIP21 URI parsing and construction (spec §4.9, SPEC_FULL §2 resolution
//! on amount rounding).

use crate::error::TxError;

#[derive(Debug, Clone, PartialEq)]
pub struct Bip21Payment {
    pub address: String,
    pub amount_sat: Option<u64>,
    pub label: Option<String>,
    pub message: Option<String>,
}

/// `round(amount * 10^8)` using round-half-away-from-zero, per spec §6.2.
fn btc_to_sat(amount_btc: f64) -> u64 {
    let scaled = amount_btc * 100_000_000.0;
    let rounded = if scaled >= 0.0 { (scaled + 0.5).floor() } else { (scaled - 0.5).ceil() };
    rounded as u64
}

fn sat_to_btc(amount_sat: u64) -> f64 {
    amount_sat as f64 / 100_000_000.0
}

pub fn parse_bip21(uri: &str) -> Result<Bip21Payment, TxError> {
    let (scheme, rest) = uri
        .split_once(':')
        .ok_or_else(|| TxError::InvalidBip21("missing bitcoin: scheme".to_string()))?;
    if !scheme.eq_ignore_ascii_case("bitcoin") {
        return Err(TxError::InvalidBip21("missing bitcoin: scheme".to_string()));
    }

    let (address_part, query) = match rest.split_once('?') {
        Some((addr, q)) => (addr, Some(q)),
        None => (rest, None),
    };

    if address_part.is_empty() {
        return Err(TxError::InvalidBip21("missing address".to_string()));
    }

    let mut amount_sat = None;
    let mut label = None;
    let mut message = None;

    if let Some(q) = query {
        for pair in q.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| TxError::InvalidBip21(format!("malformed query parameter: {pair}")))?;
            let decoded = percent_decode(value);
            match key {
                "amount" => {
                    let parsed: f64 = decoded
                        .parse()
                        .map_err(|_| TxError::InvalidBip21(format!("invalid amount: {decoded}")))?;
                    amount_sat = Some(btc_to_sat(parsed));
                }
                "label" => label = Some(decoded),
                "message" => message = Some(decoded),
                _ => {}
            }
        }
    }

    Ok(Bip21Payment { address: address_part.to_string(), amount_sat, label, message })
}

pub fn create_bip21(
    address: &str,
    amount_sat: Option<u64>,
    label: Option<&str>,
    message: Option<&str>,
) -> String {
    let mut uri = format!("bitcoin:{address}");
    let mut params = Vec::new();

    if let Some(sat) = amount_sat {
        params.push(format!("amount={}", format_btc_amount(sat_to_btc(sat))));
    }
    if let Some(l) = label {
        params.push(format!("label={}", percent_encode(l)));
    }
    if let Some(m) = message {
        params.push(format!("message={}", percent_encode(m)));
    }

    if !params.is_empty() {
        uri.push('?');
        uri.push_str(&params.join("&"));
    }
    uri
}

fn format_btc_amount(amount: f64) -> String {
    let s = format!("{amount:.8}");
    let trimmed = s.trim_end_matches('0');
    let trimmed = trimmed.trim_end_matches('.');
    if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() }
}

fn percent_encode(s: &str) -> String {
    let mut out = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or(""), 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
                out.push(bytes[i]);
                i += 1;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

    #[test]
    fn parses_amount_label_and_message() {
        let uri = format!("bitcoin:{ADDR}?amount=0.0005&label=Shop&message=Order%20123");
        let payment = parse_bip21(&uri).unwrap();
        assert_eq!(payment.address, ADDR);
        assert_eq!(payment.amount_sat, Some(50_000));
        assert_eq!(payment.label.as_deref(), Some("Shop"));
        assert_eq!(payment.message.as_deref(), Some("Order 123"));
    }

    #[test]
    fn address_only_uri_parses() {
        let uri = format!("bitcoin:{ADDR}");
        let payment = parse_bip21(&uri).unwrap();
        assert_eq!(payment.amount_sat, None);
    }

    #[test]
    fn missing_scheme_is_rejected() {
        assert!(parse_bip21(ADDR).is_err());
    }

    #[test]
    fn scheme_is_matched_case_insensitively() {
        let uri = format!("BITCOIN:{ADDR}?amount=0.0005");
        let payment = parse_bip21(&uri).unwrap();
        assert_eq!(payment.address, ADDR);
        assert_eq!(payment.amount_sat, Some(50_000));

        let mixed = format!("Bitcoin:{ADDR}");
        assert_eq!(parse_bip21(&mixed).unwrap().address, ADDR);
    }

    #[test]
    fn create_then_parse_round_trips() {
        let uri = create_bip21(ADDR, Some(123_456), Some("Alice"), Some("Coffee"));
        let payment = parse_bip21(&uri).unwrap();
        assert_eq!(payment.address, ADDR);
        assert_eq!(payment.amount_sat, Some(123_456));
        assert_eq!(payment.label.as_deref(), Some("Alice"));
        assert_eq!(payment.message.as_deref(), Some("Coffee"));
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(btc_to_sat(0.000_000_005), 1);
        assert_eq!(btc_to_sat(0.000_000_004), 0);
    }
}
