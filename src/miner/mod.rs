// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/mod.rs
// Version: 1.0.0
//
// This file is the module declaration for the client-side work scheduler:
// hash workers, throttling, runtime signals and statistics.
//
// Tree Location:
// - src/miner/mod.rs (miner module entry point)
// - Submodules: scheduler, signals, stats, throttle, worker

pub mod scheduler;
pub mod signals;
pub mod stats;
pub mod throttle;
pub mod worker;

// Re-export key types for convenience
pub use scheduler::{HashrateCallback, SchedulerConfig, ShareCallback, WorkScheduler};
pub use signals::{ManualSignals, RuntimeSignals, SignalSource, SystemSignals};
pub use stats::{HashrateReporter, WorkerState};
pub use throttle::{ThrottleConfig, ThrottleController, compute_delay};
