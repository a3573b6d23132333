//! Gap-limit address discovery (spec §4.7 step 1).
//!
//! This module is deliberately decoupled from the network: it takes a
//! per-index "has history" probe and returns which indices to derive.
//! The caller (the sync engine) supplies that probe backed by
//! `blockchain.scripthash.subscribe`.

pub const DEFAULT_GAP_LIMIT: u32 = 20;

/// Discover the highest used index for one chain (receiving or change),
/// given a callback answering "does address at this index have history".
///
/// Derives in windows of `gap_limit` addresses at a time: the first
/// window is `0..gap_limit`; each subsequent window starts right after
/// the highest hit seen so far. Discovery stops the first time an entire
/// window comes back with no history at all.
///
/// Returns the highest index with history, or `None` if the chain is
/// entirely unused.
pub fn discover_highest_used_index(
    gap_limit: u32,
    mut has_history: impl FnMut(u32) -> bool,
) -> Option<u32> {
    let mut highest_hit: Option<u32> = None;
    let mut window_start: u32 = 0;

    loop {
        let mut hit_in_window = false;
        for i in window_start..window_start + gap_limit {
            if has_history(i) {
                highest_hit = Some(i);
                hit_in_window = true;
            }
        }
        if !hit_in_window {
            break;
        }
        window_start = highest_hit.expect("hit_in_window implies highest_hit is set") + 1;
    }

    highest_hit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entirely_unused_chain_stops_at_gap_limit() {
        let mut probed = 0u32;
        let result = discover_highest_used_index(20, |_| {
            probed += 1;
            false
        });
        assert_eq!(result, None);
        assert_eq!(probed, 20);
    }

    #[test]
    fn history_at_last_index_of_first_window_extends_to_2g() {
        // A hit at the last index of the first window (i.e. the
        // G-th address) forces a second full window to be probed
        // before discovery can conclude (spec §8 boundary behavior).
        let mut probed = 0u32;
        let result = discover_highest_used_index(20, |i| {
            probed += 1;
            i == 19
        });
        assert_eq!(result, Some(19));
        assert_eq!(probed, 40);
    }

    #[test]
    fn history_only_at_index_zero() {
        let result = discover_highest_used_index(20, |i| i == 0);
        assert_eq!(result, Some(0));
    }

    #[test]
    fn dense_history_keeps_extending() {
        let result = discover_highest_used_index(5, |i| i < 50);
        assert_eq!(result, Some(49));
    }
}
