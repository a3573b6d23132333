//! Password entropy estimation and strength warnings.
//!
//! This is a warning system, not a gate — it backs the strength hint
//! shown when a user sets an encrypted-backup password
//! (`exportEncryptedBackup`). PINs are scored separately by
//! `bitvault-vault`'s lockout schedule, not by entropy.

use std::collections::HashSet;

pub const MIN_RECOMMENDED_ENTROPY: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PasswordStrength {
    Dangerous,
    Weak,
    Fair,
    Strong,
    Excellent,
}

impl PasswordStrength {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Dangerous => "Dangerous — trivially crackable, do not use for backup encryption",
            Self::Weak => "Weak — vulnerable to targeted attacks",
            Self::Fair => "Fair — adequate for casual threats but not recommended",
            Self::Strong => "Strong — resistant to well-funded attackers",
            Self::Excellent => "Excellent — beyond brute-force for the foreseeable future",
        }
    }

    pub fn is_recommended(&self) -> bool {
        *self >= Self::Strong
    }
}

#[derive(Debug, Clone)]
pub struct PasswordAnalysis {
    pub entropy_bits: f64,
    pub strength: PasswordStrength,
    pub warnings: Vec<String>,
    pub meets_minimum: bool,
}

const COMMON_PASSWORDS: &[&str] = &[
    "password", "123456", "12345678", "qwerty", "abc123", "monkey", "1234567", "letmein",
    "trustno1", "dragon", "baseball", "iloveyou", "master", "sunshine", "ashley", "bailey",
    "shadow", "123456789", "1234567890", "password1", "bitcoin", "satoshi", "nakamoto", "hodl",
    "moon", "lambo", "seed", "wallet", "crypto",
];

pub fn estimate_entropy(password: &str) -> PasswordAnalysis {
    let mut warnings = Vec::new();

    if password.is_empty() {
        return PasswordAnalysis {
            entropy_bits: 0.0,
            strength: PasswordStrength::Dangerous,
            warnings: vec!["Password is empty".to_string()],
            meets_minimum: false,
        };
    }

    let lower = password.to_lowercase();
    if COMMON_PASSWORDS.iter().any(|&cp| lower == cp || lower.contains(cp)) {
        warnings.push("Contains a commonly used password or word".to_string());
    }

    let mut has_lower = false;
    let mut has_upper = false;
    let mut has_digit = false;
    let mut has_symbol = false;
    let mut has_unicode = false;

    for ch in password.chars() {
        if ch.is_ascii_lowercase() {
            has_lower = true;
        } else if ch.is_ascii_uppercase() {
            has_upper = true;
        } else if ch.is_ascii_digit() {
            has_digit = true;
        } else if ch.is_ascii_punctuation() || ch == ' ' {
            has_symbol = true;
        } else {
            has_unicode = true;
        }
    }

    let mut charset_size: f64 = 0.0;
    if has_lower {
        charset_size += 26.0;
    }
    if has_upper {
        charset_size += 26.0;
    }
    if has_digit {
        charset_size += 10.0;
    }
    if has_symbol {
        charset_size += 33.0;
    }
    if has_unicode {
        charset_size += 100.0;
    }
    if charset_size < 1.0 {
        charset_size = 1.0;
    }

    let len = password.chars().count() as f64;
    let mut entropy = len * charset_size.log2();

    let unique_chars: HashSet<char> = password.chars().collect();
    let unique_ratio = unique_chars.len() as f64 / len;
    if unique_ratio < 0.5 {
        entropy -= (1.0 - unique_ratio) * entropy * 0.3;
        warnings.push("Too many repeated characters".to_string());
    }

    let sequential_count = count_sequential(password);
    if sequential_count > 2 {
        entropy -= sequential_count as f64 * 2.0;
        warnings.push("Contains sequential patterns".to_string());
    }

    if (has_lower != has_upper) && !has_digit && !has_symbol {
        entropy *= 0.85;
        if password.len() < 12 {
            warnings.push("Single character class — add numbers, symbols, or mixed case".to_string());
        }
    }

    let word_count = password.split_whitespace().count();
    if word_count >= 4 {
        entropy += (word_count as f64 - 3.0) * 3.0;
    }

    if entropy < 0.0 {
        entropy = 0.0;
    }

    if password.len() < 8 {
        warnings.push("Password is very short (< 8 characters)".to_string());
    } else if password.len() < 12 {
        warnings.push("Consider a longer password (12+ characters recommended)".to_string());
    }

    let strength = if entropy < 28.0 {
        PasswordStrength::Dangerous
    } else if entropy < 36.0 {
        PasswordStrength::Weak
    } else if entropy < 60.0 {
        PasswordStrength::Fair
    } else if entropy < 128.0 {
        PasswordStrength::Strong
    } else {
        PasswordStrength::Excellent
    };

    PasswordAnalysis {
        entropy_bits: entropy,
        strength,
        warnings,
        meets_minimum: strength >= PasswordStrength::Strong,
    }
}

fn count_sequential(password: &str) -> usize {
    let chars: Vec<u32> = password.chars().map(|c| c as u32).collect();
    let mut count = 0;
    for window in chars.windows(3) {
        let (a, b, c) = (window[0], window[1], window[2]);
        if b == a + 1 && c == b + 1 {
            count += 1;
        }
        if a > 1 && b == a - 1 && c == b - 1 {
            count += 1;
        }
    }
    count
}
