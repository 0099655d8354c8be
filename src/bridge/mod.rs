// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/bridge/mod.rs
// Version: 1.0.0
//
// This file is the module declaration for the WebSocket to stratum+tcp
// bridge.
//
// Tree Location:
// - src/bridge/mod.rs (bridge module entry point)
// - Submodules: messages, rate_limit, registry, server, session

pub mod messages;
pub mod rate_limit;
pub mod registry;
pub mod server;
pub mod session;

// Re-export key types for convenience
pub use messages::{ClientMessage, ServerMessage};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use registry::{SessionId, SessionRegistry};
pub use server::{router, serve, start_bridge_server, BridgeState};
pub use session::{Session, SessionState};
