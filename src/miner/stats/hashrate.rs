// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/stats/hashrate.rs
// Version: 1.0.0
//
// This file implements the periodic hashrate reporter. Workers feed it the
// number of hashes they evaluated; once per report interval it turns the
// count into a rate and starts a fresh interval.
//
// Tree Location:
// - src/miner/stats/hashrate.rs (hashrate reporting)
// - Depends on: std

use std::time::{Duration, Instant};

/// Default spacing between two reports
pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct HashrateReporter {
    interval: Duration,
    count: u64,
    interval_start: Instant,
}

impl HashrateReporter {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            count: 0,
            interval_start: now,
        }
    }

    pub fn record(&mut self, hashes: u64) {
        self.count = self.count.saturating_add(hashes);
    }

    /// Close the interval if it has elapsed.
    ///
    /// Returns the rate in hashes per second, or `None` when the interval is
    /// still open or nothing was hashed during it.
    pub fn poll(&mut self, now: Instant) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let count = std::mem::take(&mut self.count);
        self.interval_start = now;
        if count == 0 {
            return None;
        }
        Some(count as f64 / elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_interval_elapses() {
        let start = Instant::now();
        let mut reporter = HashrateReporter::new(REPORT_INTERVAL, start);
        reporter.record(400);
        assert_eq!(reporter.poll(start + Duration::from_millis(500)), None);

        reporter.record(600);
        let rate = reporter.poll(start + Duration::from_secs(2)).unwrap();
        assert!((rate - 500.0).abs() < 1e-9);
    }

    #[test]
    fn idle_interval_emits_nothing() {
        let start = Instant::now();
        let mut reporter = HashrateReporter::new(REPORT_INTERVAL, start);
        assert_eq!(reporter.poll(start + Duration::from_secs(5)), None);

        // The idle stretch does not dilute the next report
        reporter.record(100);
        let rate = reporter.poll(start + Duration::from_secs(6)).unwrap();
        assert!((rate - 100.0).abs() < 1e-9);
    }
}
