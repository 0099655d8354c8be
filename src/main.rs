// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/main.rs
// Version: 1.0.0
//
// Bridge server binary: relays WebSocket clients to stratum+tcp pools.

use clap::Parser;
use poolbridge::{Args, start_bridge_server, utils::logging::init_logging};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Err(err) = args.validate() {
        eprintln!("❌ Error: {}", err);
        std::process::exit(1);
    }

    init_logging();
    info!("🚀 PoolBridge v{} starting", env!("CARGO_PKG_VERSION"));

    start_bridge_server(args.to_config()).await?;
    Ok(())
}
