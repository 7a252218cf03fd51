// Live statistics aggregation — request counts, hit rates, transfer volumes.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub requests_total: u64,
    pub cache_hits: u64,
    pub fallback_hits: u64,
    pub fetched_bytes: u64,
    pub served_bytes: u64,
    pub cache_hit_rate: f64,
}

pub struct StatsCollector {
    requests_total: AtomicU64,
    cache_hits: AtomicU64,
    fallback_hits: AtomicU64,
    fetched_bytes: AtomicU64,
    served_bytes: AtomicU64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            fallback_hits: AtomicU64::new(0),
            fetched_bytes: AtomicU64::new(0),
            served_bytes: AtomicU64::new(0),
        }
    }

    /// Record an intercepted request; `hit` means it was served from cache.
    pub fn record_request(&self, hit: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an entry-point request answered from cache after a failed fetch.
    pub fn record_fallback(&self) {
        self.fallback_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetched(&self, bytes: u64) {
        self.fetched_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_served(&self, bytes: u64) {
        self.served_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_hit_rate = if requests > 0 {
            hits as f64 / requests as f64
        } else {
            0.0
        };

        StatsSnapshot {
            requests_total: requests,
            cache_hits: hits,
            fallback_hits: self.fallback_hits.load(Ordering::Relaxed),
            fetched_bytes: self.fetched_bytes.load(Ordering::Relaxed),
            served_bytes: self.served_bytes.load(Ordering::Relaxed),
            cache_hit_rate,
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_basic() {
        let stats = StatsCollector::new();
        stats.record_request(true);
        stats.record_request(false);
        stats.record_request(true);
        stats.record_request(true);

        stats.record_fallback();
        stats.record_fetched(1000);
        stats.record_served(400);

        let snap = stats.snapshot();
        assert_eq!(snap.requests_total, 4);
        assert_eq!(snap.cache_hits, 3);
        assert_eq!(snap.fallback_hits, 1);
        assert_eq!(snap.fetched_bytes, 1000);
        assert_eq!(snap.served_bytes, 400);
        assert!((snap.cache_hit_rate - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_rate_without_requests() {
        let stats = StatsCollector::new();
        assert_eq!(stats.snapshot().cache_hit_rate, 0.0);
    }
}
