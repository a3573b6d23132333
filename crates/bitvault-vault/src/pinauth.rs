//! Progressive lockout over failed PIN attempts, per wallet. State is
//! persisted so the lockout timer survives a process restart.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use crate::storage::SecureStore;

const LOCKOUT_STATE_TYPE: &str = "__pin_lockout";

/// Lockout schedule: (attempts threshold, lockout seconds). The last
/// entry repeats for any attempt count beyond it.
const LOCKOUT_SCHEDULE: &[(u32, u64)] = &[(5, 30), (8, 60), (10, 300), (12, 1800), (14, 3600)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutState {
    pub attempts: u32,
    pub lockout_until_epoch_ms: u64,
}

impl Default for LockoutState {
    fn default() -> Self {
        Self {
            attempts: 0,
            lockout_until_epoch_ms: 0,
        }
    }
}

pub enum PinLengthPolicy {
    Fixed4,
    Fixed6,
    Variable,
}

impl PinLengthPolicy {
    pub fn is_valid(&self, pin: &str) -> bool {
        let digits_only = pin.chars().all(|c| c.is_ascii_digit());
        if !digits_only {
            return false;
        }
        match self {
            PinLengthPolicy::Fixed4 => pin.len() == 4,
            PinLengthPolicy::Fixed6 => pin.len() == 6,
            PinLengthPolicy::Variable => pin.len() >= 4,
        }
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as u64
}

/// Lockout duration in seconds for a given attempt count, per the fixed
/// schedule, with the final tier repeating indefinitely.
fn lockout_seconds_for(attempts: u32) -> Option<u64> {
    LOCKOUT_SCHEDULE
        .iter()
        .rev()
        .find(|(threshold, _)| attempts >= *threshold)
        .map(|(_, secs)| *secs)
}

pub struct PinAuthCoordinator<'a> {
    store: &'a SecureStore,
}

impl<'a> PinAuthCoordinator<'a> {
    pub fn new(store: &'a SecureStore) -> Self {
        Self { store }
    }

    fn load(&self, wallet_id: &str) -> LockoutState {
        self.store
            .read(wallet_id, LOCKOUT_STATE_TYPE)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    fn save(&self, wallet_id: &str, state: LockoutState) -> Result<(), VaultError> {
        let bytes = serde_json::to_vec(&state).map_err(|e| VaultError::Serialization(e.to_string()))?;
        self.store.write(wallet_id, LOCKOUT_STATE_TYPE, &bytes)
    }

    /// Seconds remaining until unlock, or `None` if not currently locked.
    pub fn remaining_lockout_secs(&self, wallet_id: &str) -> Option<u64> {
        let state = self.load(wallet_id);
        let now = now_epoch_ms();
        if state.lockout_until_epoch_ms > now {
            Some((state.lockout_until_epoch_ms - now).div_ceil(1000))
        } else {
            None
        }
    }

    /// Call before attempting a PIN check. Returns `Err(Locked)` if still
    /// within a lockout window.
    pub fn check_not_locked(&self, wallet_id: &str) -> Result<(), VaultError> {
        if let Some(remaining_secs) = self.remaining_lockout_secs(wallet_id) {
            return Err(VaultError::Locked { remaining_secs });
        }
        Ok(())
    }

    /// Record a failed PIN attempt, possibly entering (or extending) a
    /// lockout window.
    pub fn record_failure(&self, wallet_id: &str) -> Result<LockoutState, VaultError> {
        let mut state = self.load(wallet_id);
        state.attempts += 1;
        if let Some(secs) = lockout_seconds_for(state.attempts) {
            state.lockout_until_epoch_ms = now_epoch_ms() + secs * 1000;
        }
        self.save(wallet_id, state)?;
        Ok(state)
    }

    /// Record a successful PIN authentication: resets attempts and
    /// lockout entirely.
    pub fn record_success(&self, wallet_id: &str) -> Result<(), VaultError> {
        self.save(wallet_id, LockoutState::default())
    }

    /// True once the attempt count has reached the threshold at which a
    /// destructive reset is offered to the user.
    pub fn can_reset(&self, wallet_id: &str) -> bool {
        self.load(wallet_id).attempts >= 14
    }

    pub fn attempts(&self, wallet_id: &str) -> u32 {
        self.load(wallet_id).attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_thresholds_match_spec() {
        assert_eq!(lockout_seconds_for(4), None);
        assert_eq!(lockout_seconds_for(5), Some(30));
        assert_eq!(lockout_seconds_for(7), Some(30));
        assert_eq!(lockout_seconds_for(8), Some(60));
        assert_eq!(lockout_seconds_for(10), Some(300));
        assert_eq!(lockout_seconds_for(12), Some(1800));
        assert_eq!(lockout_seconds_for(14), Some(3600));
        assert_eq!(lockout_seconds_for(20), Some(3600));
    }

    #[test]
    fn failures_below_threshold_do_not_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecureStore::open(dir.path()).unwrap();
        let coord = PinAuthCoordinator::new(&store);
        for _ in 0..4 {
            coord.record_failure("w1").unwrap();
        }
        assert!(coord.check_not_locked("w1").is_ok());
    }

    #[test]
    fn fifth_failure_locks_for_30_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecureStore::open(dir.path()).unwrap();
        let coord = PinAuthCoordinator::new(&store);
        for _ in 0..5 {
            coord.record_failure("w1").unwrap();
        }
        let remaining = coord.remaining_lockout_secs("w1").unwrap();
        assert!(remaining > 0 && remaining <= 30);
        assert!(coord.check_not_locked("w1").is_err());
    }

    #[test]
    fn success_resets_attempts_and_lockout() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecureStore::open(dir.path()).unwrap();
        let coord = PinAuthCoordinator::new(&store);
        for _ in 0..5 {
            coord.record_failure("w1").unwrap();
        }
        coord.record_success("w1").unwrap();
        assert_eq!(coord.attempts("w1"), 0);
        assert!(coord.check_not_locked("w1").is_ok());
    }

    #[test]
    fn can_reset_becomes_true_at_14_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecureStore::open(dir.path()).unwrap();
        let coord = PinAuthCoordinator::new(&store);
        for _ in 0..13 {
            coord.record_failure("w1").unwrap();
        }
        assert!(!coord.can_reset("w1"));
        coord.record_failure("w1").unwrap();
        assert!(coord.can_reset("w1"));
    }

    #[test]
    fn pin_length_policies() {
        assert!(PinLengthPolicy::Fixed4.is_valid("1234"));
        assert!(!PinLengthPolicy::Fixed4.is_valid("12345"));
        assert!(PinLengthPolicy::Fixed6.is_valid("123456"));
        assert!(PinLengthPolicy::Variable.is_valid("123456789"));
        assert!(!PinLengthPolicy::Variable.is_valid("123"));
        assert!(!PinLengthPolicy::Variable.is_valid("12a4"));
    }

    #[test]
    fn lockout_state_is_wallet_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecureStore::open(dir.path()).unwrap();
        let coord = PinAuthCoordinator::new(&store);
        for _ in 0..5 {
            coord.record_failure("w1").unwrap();
        }
        assert!(coord.check_not_locked("w2").is_ok());
    }
}
