// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/stats/mod.rs
// Version: 1.0.0
//
// This file is the module declaration for scheduler statistics.
//
// Tree Location:
// - src/miner/stats/mod.rs (stats module entry point)
// - Submodules: hashrate, worker_state

pub mod hashrate;
pub mod worker_state;

// Re-export key types for convenience
pub use hashrate::{HashrateReporter, REPORT_INTERVAL};
pub use worker_state::WorkerState;
