//! Exponential backoff with jitter for transient sync errors (spec §4.7).

use std::time::Duration;

use rand::Rng;

const BASE_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 30_000;

/// The delay before retry attempt `attempt` (0-indexed: the first retry
/// is `attempt == 0`), doubling each time and capped, with up to 20%
/// jitter to avoid thundering-herd reconnects.
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponential = BASE_DELAY_MS.saturating_mul(1u64 << attempt.min(16));
    let capped = exponential.min(MAX_DELAY_MS);
    let jitter_fraction: f64 = rand::thread_rng().gen_range(0.0..0.2);
    let jittered = capped as f64 * (1.0 - jitter_fraction);
    Duration::from_millis(jittered as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_is_near_base_delay() {
        let delay = backoff_delay(0);
        assert!(delay.as_millis() <= BASE_DELAY_MS as u128);
        assert!(delay.as_millis() >= (BASE_DELAY_MS as f64 * 0.8) as u128);
    }

    #[test]
    fn delay_is_capped() {
        let delay = backoff_delay(20);
        assert!(delay.as_millis() <= MAX_DELAY_MS as u128);
    }

    #[test]
    fn delay_grows_with_attempt_count() {
        let d0 = backoff_delay(0).as_millis();
        let d3 = backoff_delay(3).as_millis();
        assert!(d3 > d0);
    }
}
