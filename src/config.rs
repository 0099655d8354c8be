// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/config.rs
// Version: 1.0.0
//
// This file defines the command-line arguments of both binaries and the
// configuration values built from them. Every option can also be set through
// an environment variable.
//
// Tree Location:
// - src/config.rs (arguments and configuration)
// - Depends on: clap

use crate::bridge::RateLimitConfig;
use crate::client::ClientSettings;
use crate::core::Algorithm;
use crate::miner::{SchedulerConfig, ThrottleConfig};
use clap::Parser;
use std::time::Duration;

/// Command-line arguments for the bridge server
#[derive(Parser, Debug, Clone)]
#[command(
    name = "poolbridge",
    version,
    about = "WebSocket to stratum+tcp mining pool bridge",
    long_about = "PoolBridge lets WebSocket clients talk to TCP-only stratum pools.\n\
                  Each WebSocket connection becomes one session with its own pool connection.\n\n\
                  Examples:\n\
                    poolbridge --port 8080\n\
                    PORT=9000 poolbridge --rate-limit-max 20 --rate-limit-window 60"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080", value_name = "PORT")]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "BRIDGE_BIND", default_value = "0.0.0.0", value_name = "ADDR")]
    pub bind: String,

    /// Connections allowed per client address in one window
    #[arg(long, env = "BRIDGE_RATE_LIMIT_MAX", default_value = "100", value_name = "COUNT")]
    pub rate_limit_max: u32,

    /// Rate limit window length in seconds
    #[arg(long, env = "BRIDGE_RATE_LIMIT_WINDOW", default_value = "60", value_name = "SECONDS")]
    pub rate_limit_window: u64,

    /// Seconds between sweeps of expired rate limit windows
    #[arg(long, env = "BRIDGE_SWEEP_INTERVAL", default_value = "60", value_name = "SECONDS")]
    pub sweep_interval: u64,

    /// Seconds to wait for a pool TCP connection
    #[arg(long, env = "BRIDGE_CONNECT_TIMEOUT", default_value = "10", value_name = "SECONDS")]
    pub connect_timeout: u64,
}

impl Args {
    /// Validate arguments and return helpful errors
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_limit_window == 0 {
            return Err("Rate limit window must be greater than 0 seconds".to_string());
        }
        if self.sweep_interval == 0 {
            return Err("Sweep interval must be greater than 0 seconds".to_string());
        }
        if self.connect_timeout == 0 {
            return Err("Connect timeout must be greater than 0 seconds".to_string());
        }
        Ok(())
    }

    pub fn to_config(&self) -> BridgeConfig {
        BridgeConfig {
            bind: self.bind.clone(),
            port: self.port,
            rate_limit: RateLimitConfig::new(self.rate_limit_max, self.rate_limit_window),
            sweep_interval: Duration::from_secs(self.sweep_interval),
            connect_timeout: Duration::from_secs(self.connect_timeout),
        }
    }
}

/// Runtime settings of the bridge server
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub bind: String,
    pub port: u16,
    pub rate_limit: RateLimitConfig,
    pub sweep_interval: Duration,
    pub connect_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            rate_limit: RateLimitConfig::default(),
            sweep_interval: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl BridgeConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Command-line arguments for the bridge miner
#[derive(Parser, Debug, Clone)]
#[command(
    name = "bridge-miner",
    version,
    about = "CPU miner that reaches its pool through a PoolBridge WebSocket",
    long_about = "Connects to a PoolBridge server, asks it to open a stratum+tcp pool\n\
                  connection, and mines the jobs the pool sends with throttled CPU workers.\n\n\
                  Examples:\n\
                    bridge-miner -b ws://localhost:8080 -o stratum+tcp://pool.example.com:3333 -u WALLET\n\
                    bridge-miner -b ws://localhost:8080 -o stratum+tcp://127.0.0.1:3333 -u WALLET --throttle 0.5 --thermal-aware"
)]
pub struct MinerArgs {
    /// Bridge WebSocket URL
    #[arg(short = 'b', long, env = "BRIDGE_URL", default_value = "ws://127.0.0.1:8080", value_name = "URL")]
    pub bridge: String,

    /// Pool address the bridge should connect to
    #[arg(short = 'o', long, value_name = "stratum+tcp://HOST:PORT")]
    pub pool: String,

    /// Wallet address for mining rewards
    #[arg(short = 'u', long, value_name = "ADDRESS")]
    pub wallet: String,

    /// Worker identifier for the pool
    #[arg(long, default_value = "worker1", value_name = "NAME")]
    pub worker: String,

    /// Mining algorithm (sha3x, sha256d)
    #[arg(long, default_value = "sha3x", value_name = "ALGO")]
    pub algo: String,

    /// Number of CPU worker threads (0 = auto-detect)
    #[arg(short, long, default_value = "0", value_name = "COUNT")]
    pub threads: usize,

    /// Mining intensity between 0 (slowest) and 1 (no added delay)
    #[arg(long, default_value = "1.0", value_name = "FACTOR")]
    pub throttle: f64,

    /// Slow down when the battery runs low
    #[arg(long, default_value = "false")]
    pub battery_aware: bool,

    /// Slow down when the hardware runs hot
    #[arg(long, default_value = "false")]
    pub thermal_aware: bool,
}

impl MinerArgs {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.throttle) {
            return Err("Throttle must be between 0 and 1".to_string());
        }
        if self.wallet.is_empty() {
            return Err("Wallet address is required. Use --wallet YOUR_ADDRESS".to_string());
        }
        if self.threads > 1024 {
            return Err("Thread count cannot exceed 1024".to_string());
        }
        self.algo.parse::<Algorithm>()?;
        Ok(())
    }

    pub fn throttle_config(&self) -> ThrottleConfig {
        ThrottleConfig::new(self.throttle)
            .with_battery_aware(self.battery_aware)
            .with_thermal_aware(self.thermal_aware)
    }

    pub fn client_settings(&self) -> Result<ClientSettings, String> {
        Ok(ClientSettings {
            bridge_url: self.bridge.clone(),
            pool: self.pool.clone(),
            wallet: self.wallet.clone(),
            worker: self.worker.clone(),
            algo: self.algo.parse::<Algorithm>()?,
            threads: self.threads,
            throttle: self.throttle_config(),
            scheduler: SchedulerConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_defaults() {
        let args = Args::parse_from(["poolbridge"]);
        assert!(args.validate().is_ok());
        let config = args.to_config();
        assert_eq!(config.rate_limit, RateLimitConfig::new(100, 60));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn bridge_overrides() {
        let args = Args::parse_from(["poolbridge", "--port", "9000", "--bind", "127.0.0.1", "--rate-limit-max", "5"]);
        let config = args.to_config();
        assert_eq!(config.listen_addr(), "127.0.0.1:9000");
        assert_eq!(config.rate_limit.max_requests, 5);
    }

    #[test]
    fn miner_throttle_validation() {
        let mut args = MinerArgs::parse_from(["bridge-miner", "-o", "stratum+tcp://127.0.0.1:3333", "-u", "wallet"]);
        assert!(args.validate().is_ok());
        args.throttle = 1.5;
        assert!(args.validate().is_err());
        args.throttle = 0.5;
        args.algo = "scrypt".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn miner_settings_carry_throttle_flags() {
        let args = MinerArgs::parse_from([
            "bridge-miner",
            "-o",
            "stratum+tcp://127.0.0.1:3333",
            "-u",
            "wallet",
            "--algo",
            "sha256d",
            "--throttle",
            "0.25",
            "--thermal-aware",
        ]);
        let settings = args.client_settings().unwrap();
        assert_eq!(settings.algo, Algorithm::Sha256d);
        assert_eq!(settings.throttle.throttle_factor, 0.25);
        assert!(settings.throttle.thermal_aware);
        assert!(!settings.throttle.battery_aware);
    }
}
