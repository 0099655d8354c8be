// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/error.rs
// Version: 1.0.0
//
// This file defines the error types shared by the bridge, the pool connection
// and the work scheduler.
//
// Tree Location:
// - src/error.rs (crate error types)
// - Depends on: thiserror

use thiserror::Error;

/// Failures opening or using a connection to a mining pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Invalid pool URL")]
    InvalidUrl,

    #[error("Could not resolve {0}")]
    Resolve(String),

    #[error("Connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection to {0} timed out")]
    Timeout(String),

    #[error("Pool connection is closed")]
    Closed,

    #[error("Pool I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures local to one bridge session.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Malformed message: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Not connected to a pool")]
    NotConnected,

    #[error("Already connected to a pool")]
    AlreadyConnected,

    #[error("Pool connection in progress")]
    Connecting,

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("Invalid session transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: crate::bridge::SessionState,
        to: crate::bridge::SessionState,
    },
}

/// Failures produced by a proof-of-work hash module.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("Hash backend failure: {0}")]
    Backend(String),
}

/// Failures controlling the work scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler already running with different parameters")]
    AlreadyRunning,

    #[error("Throttle factor must be between 0 and 1, got {0}")]
    InvalidThrottle(f64),

    #[error("Scheduler is not running")]
    NotRunning,

    #[error("No worker slot {0}")]
    UnknownWorker(usize),

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Failures of the bridge miner client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Bridge refused the session: {0}")]
    Refused(String),

    #[error("Bridge closed the connection before the pool was connected")]
    ClosedEarly,

    #[error("Cannot build login request for wallet {0:?}")]
    Login(String),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
