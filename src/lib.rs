// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/lib.rs
// Version: 1.0.0
//
// This file serves as the library entry point for PoolBridge. It exports the
// WebSocket bridge, the pool connection, the work scheduler and the bridge
// miner client used by both binaries.
//
// Tree Location:
// - src/lib.rs (root library file)
// - Exports modules: bridge, client, config, core, error, miner, pool, utils

pub mod bridge;
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod miner;
pub mod pool;
pub mod utils;

// Re-export commonly used types at the crate root for convenience
pub use crate::bridge::{BridgeState, RateLimitConfig, RateLimiter, start_bridge_server};
pub use crate::client::{BridgeClient, ClientSettings};
pub use crate::config::{Args, BridgeConfig, MinerArgs};
pub use crate::core::{Algorithm, MiningJob, PowHasher, Share};
pub use crate::error::{BridgeError, ClientError, HashError, PoolError, SchedulerError};
pub use crate::miner::{SchedulerConfig, ThrottleConfig, WorkScheduler};
pub use crate::pool::{PoolConnection, PoolEndpoint};
