// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/mod.rs
// Version: 1.0.0
//
// This file is the module declaration for everything that talks to a mining
// pool: address parsing, the TCP connection, and stratum message helpers.
//
// Tree Location:
// - src/pool/mod.rs (pool module entry point)
// - Submodules: connection, endpoint, messages, protocol

pub mod connection;
pub mod endpoint;
pub mod messages;
pub mod protocol;

// Re-export key types for convenience
pub use connection::{PoolConnection, PoolConnectionState, PoolEvent};
pub use endpoint::{PoolEndpoint, POOL_SCHEME};
pub use messages::{parse_pool_message, PoolMessage};
pub use protocol::StratumProtocol;
