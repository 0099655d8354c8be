// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/utils/logging.rs
// Version: 1.0.0
//
// This file installs the tracing subscriber shared by both binaries. The
// RUST_LOG environment variable selects what is shown; without it everything
// at INFO and above is printed.
//
// Tree Location:
// - src/utils/logging.rs (tracing setup)
// - Depends on: tracing-subscriber

use tracing_subscriber::filter::{EnvFilter, LevelFilter};

pub fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy()
}

/// Install the stdout subscriber. Calling it twice is harmless.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init();
}
