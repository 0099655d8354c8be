// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/stats/worker_state.rs
// Version: 1.0.0
//
// This file implements per-worker bookkeeping for the work scheduler: whether
// the slot is running, how many hashes it evaluated and when it was last
// reset.
//
// Tree Location:
// - src/miner/stats/worker_state.rs (per-worker statistics)
// - Depends on: std

use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerState {
    pub index: usize,
    pub running: bool,
    /// Set when the worker stopped on a hash failure or panic
    pub faulted: bool,
    pub hashes: u64,
    pub shares: u64,
    pub last_reset: Instant,
}

impl WorkerState {
    pub fn new(index: usize, now: Instant) -> Self {
        Self {
            index,
            running: false,
            faulted: false,
            hashes: 0,
            shares: 0,
            last_reset: now,
        }
    }

    pub fn record_hashes(&mut self, count: u64) {
        self.hashes = self.hashes.saturating_add(count);
    }

    pub fn record_share(&mut self) {
        self.shares += 1;
    }

    pub fn mark_faulted(&mut self) {
        self.running = false;
        self.faulted = true;
    }

    /// Clear counters and flags
    pub fn reset(&mut self, now: Instant) {
        *self = Self::new(self.index, now);
    }

    /// Average rate since the last reset
    pub fn hashrate(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_reset).as_secs_f64();
        if elapsed > 0.0 { self.hashes as f64 / elapsed } else { 0.0 }
    }
}
