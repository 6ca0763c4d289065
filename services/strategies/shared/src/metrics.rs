//! Trade loop metrics collection

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Point-in-time copy of the loop counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopMetrics {
    pub purchases_sent: u64,
    pub purchase_failures: u64,
    pub rate_limit_retries: u64,
    pub contracts_settled: u64,
    pub wins: u64,
    pub losses: u64,
}

impl LoopMetrics {
    /// Win share of settled contracts, 0.0 when nothing settled
    pub fn win_rate(&self) -> f64 {
        if self.contracts_settled == 0 {
            return 0.0;
        }
        self.wins as f64 / self.contracts_settled as f64
    }
}

/// Thread-safe metrics collector shared by the loop driver and its monitors
#[derive(Debug)]
pub struct LoopMetricsCollector {
    start_time: Instant,
    purchases_sent: AtomicU64,
    purchase_failures: AtomicU64,
    rate_limit_retries: AtomicU64,
    wins: AtomicU64,
    losses: AtomicU64,
}

impl LoopMetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            purchases_sent: AtomicU64::new(0),
            purchase_failures: AtomicU64::new(0),
            rate_limit_retries: AtomicU64::new(0),
            wins: AtomicU64::new(0),
            losses: AtomicU64::new(0),
        }
    }

    pub fn increment_purchases(&self) {
        self.purchases_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failures(&self) {
        self.purchase_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rate_limits(&self) {
        self.rate_limit_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_settlement(&self, won: bool) {
        if won {
            self.wins.fetch_add(1, Ordering::Relaxed);
        } else {
            self.losses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get_metrics(&self) -> LoopMetrics {
        let wins = self.wins.load(Ordering::Relaxed);
        let losses = self.losses.load(Ordering::Relaxed);
        LoopMetrics {
            purchases_sent: self.purchases_sent.load(Ordering::Relaxed),
            purchase_failures: self.purchase_failures.load(Ordering::Relaxed),
            rate_limit_retries: self.rate_limit_retries.load(Ordering::Relaxed),
            contracts_settled: wins + losses,
            wins,
            losses,
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for LoopMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settlement_counters() {
        let metrics = LoopMetricsCollector::new();
        metrics.increment_purchases();
        metrics.increment_purchases();
        metrics.record_settlement(true);
        metrics.record_settlement(false);
        metrics.record_settlement(false);

        let snapshot = metrics.get_metrics();
        assert_eq!(snapshot.purchases_sent, 2);
        assert_eq!(snapshot.contracts_settled, 3);
        assert_eq!(snapshot.wins, 1);
        assert!((snapshot.win_rate() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_win_rate() {
        assert_eq!(LoopMetrics::default().win_rate(), 0.0);
    }
}
