// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/bin/bridge_miner.rs
// Version: 1.0.0
//
// CPU miner binary that reaches its pool through a PoolBridge server.

use anyhow::Context;
use clap::Parser;
use poolbridge::{BridgeClient, MinerArgs, utils::logging::init_logging};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = MinerArgs::parse();

    if let Err(err) = args.validate() {
        eprintln!("❌ Error: {}", err);
        std::process::exit(1);
    }

    init_logging();
    let settings = args.client_settings().map_err(anyhow::Error::msg)?;
    info!(
        "⛏️ bridge-miner v{}: {} via {} ({} threads, throttle {:.2})",
        env!("CARGO_PKG_VERSION"),
        settings.pool,
        settings.bridge_url,
        if settings.threads == 0 { num_cpus::get() } else { settings.threads },
        settings.throttle.throttle_factor
    );

    let client = BridgeClient::new(settings);
    client
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("bridge session failed")?;

    let counters = client.counters();
    info!(
        "👋 Done: {} submitted, {} accepted, {} rejected",
        counters.submitted(),
        counters.accepted(),
        counters.rejected()
    );
    Ok(())
}
