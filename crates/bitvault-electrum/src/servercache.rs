//! ServerCacheManager: per-server reputation (latency, error rate,
//! last-used), persisted separately from everything else so it survives
//! a full reset (spec §4.6, §6.2, §6.4).

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerStats {
    pub samples: u32,
    pub total_latency_ms: u64,
    pub errors: u32,
    pub last_used_epoch_ms: Option<i64>,
}

impl ServerStats {
    pub fn average_latency_ms(&self) -> Option<u64> {
        if self.samples == 0 {
            None
        } else {
            Some(self.total_latency_ms / self.samples as u64)
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.errors as f64 / self.samples as f64
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCacheManager {
    servers: HashMap<String, ServerStats>,
}

impl ServerCacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, server: &str, latency: Duration, now_epoch_ms: i64) {
        let stats = self.servers.entry(server.to_string()).or_default();
        stats.samples += 1;
        stats.total_latency_ms += latency.as_millis() as u64;
        stats.last_used_epoch_ms = Some(now_epoch_ms);
    }

    pub fn record_error(&mut self, server: &str, now_epoch_ms: i64) {
        let stats = self.servers.entry(server.to_string()).or_default();
        stats.samples += 1;
        stats.errors += 1;
        stats.last_used_epoch_ms = Some(now_epoch_ms);
    }

    pub fn stats_for(&self, server: &str) -> Option<&ServerStats> {
        self.servers.get(server)
    }

    /// Rank known servers best-first: lowest error rate, then lowest
    /// average latency.
    pub fn ranked(&self) -> Vec<(&str, &ServerStats)> {
        let mut entries: Vec<(&str, &ServerStats)> =
            self.servers.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_by(|(_, a), (_, b)| {
            a.error_rate()
                .partial_cmp(&b.error_rate())
                .unwrap()
                .then(a.average_latency_ms().unwrap_or(u64::MAX).cmp(&b.average_latency_ms().unwrap_or(u64::MAX)))
        });
        entries
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_across_calls() {
        let mut cache = ServerCacheManager::new();
        cache.record_success("a.example:50002", Duration::from_millis(100), 1000);
        cache.record_success("a.example:50002", Duration::from_millis(200), 2000);
        let stats = cache.stats_for("a.example:50002").unwrap();
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.average_latency_ms(), Some(150));
    }

    #[test]
    fn ranked_prefers_lower_error_rate() {
        let mut cache = ServerCacheManager::new();
        cache.record_success("good:1", Duration::from_millis(50), 0);
        cache.record_error("bad:1", 0);
        let ranked = cache.ranked();
        assert_eq!(ranked[0].0, "good:1");
    }

    #[test]
    fn json_roundtrips() {
        let mut cache = ServerCacheManager::new();
        cache.record_success("a:1", Duration::from_millis(10), 0);
        let json = cache.to_json().unwrap();
        let restored = ServerCacheManager::from_json(&json).unwrap();
        assert_eq!(restored.stats_for("a:1").unwrap().samples, 1);
    }
}
