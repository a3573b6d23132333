//! BIP39 wordlist lookups.
//!
//! Thin wrapper over the `bip39` crate's English wordlist, exposed as a
//! primitive so higher layers (import validation, QR word-completion in
//! the UI boundary) don't need to depend on `bip39` types directly.

use bip39::Language;

use crate::error::PrimitiveError;

/// Look up the word at a given index (0..2047) in the BIP39 English list.
pub fn word_at_index(index: u16) -> Result<&'static str, PrimitiveError> {
    let words = Language::English.word_list();
    words
        .get(index as usize)
        .copied()
        .ok_or(PrimitiveError::OutOfRange)
}

/// Find the index of a word in the BIP39 English list, if present.
pub fn index_of_word(word: &str) -> Option<u16> {
    Language::English
        .word_list()
        .iter()
        .position(|&w| w == word)
        .map(|i| i as u16)
}

/// All words in the BIP39 English list sharing the given prefix, useful
/// for UI autocomplete during mnemonic entry.
pub fn words_with_prefix(prefix: &str) -> Vec<&'static str> {
    Language::English
        .word_list()
        .iter()
        .filter(|w| w.starts_with(prefix))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_word_is_abandon() {
        assert_eq!(word_at_index(0).unwrap(), "abandon");
    }

    #[test]
    fn last_word_index_is_2047() {
        assert!(word_at_index(2047).is_ok());
        assert!(word_at_index(2048).is_err());
    }

    #[test]
    fn index_of_word_roundtrips() {
        let idx = index_of_word("abandon").unwrap();
        assert_eq!(idx, 0);
        assert_eq!(word_at_index(idx).unwrap(), "abandon");
    }

    #[test]
    fn unknown_word_returns_none() {
        assert_eq!(index_of_word("notaword"), None);
    }

    #[test]
    fn prefix_search_finds_abandon_family() {
        let matches = words_with_prefix("aban");
        assert!(matches.contains(&"abandon"));
    }
}
