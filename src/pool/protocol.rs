// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/protocol.rs
// Version: 1.0.0
//
// This file builds the stratum requests the bridge miner sends through the
// bridge: login and share submission.
//
// Tree Location:
// - src/pool/protocol.rs (Stratum request construction)
// - Depends on: serde_json, crate::core::types

use crate::core::Share;
use crate::utils::user_agent::user_agent;
use serde_json::{Value, json};
use tracing::{debug, error};

const LOG_TARGET: &str = "poolbridge::pool::protocol";

/// Request id used for login; share submissions start at `FIRST_SUBMIT_ID`
pub const LOGIN_ID: u64 = 1;
pub const FIRST_SUBMIT_ID: u64 = 100;

/// Constructs messages for the Stratum protocol
pub struct StratumProtocol;

impl StratumProtocol {
    /// Create a login request message
    pub fn create_login_request(wallet_address: &str, worker_name: &str, algo: &str) -> Option<Value> {
        if wallet_address.is_empty() {
            error!(target: LOG_TARGET, "Invalid wallet address: empty");
            return None;
        }
        Some(json!({
            "id": LOGIN_ID,
            "jsonrpc": "2.0",
            "method": "login",
            "params": {
                "login": wallet_address,
                "pass": worker_name,
                "agent": user_agent(),
                "algo": [algo]
            }
        }))
    }

    /// Create a share submission request message
    pub fn create_submit_request(wallet_address: &str, share: &Share, submit_id: u64) -> Option<Value> {
        if share.job_id.is_empty() {
            error!(target: LOG_TARGET, "Invalid share submission: empty job_id");
            return None;
        }
        Some(json!({
            "id": submit_id,
            "jsonrpc": "2.0",
            "method": "submit",
            "params": {
                "id": wallet_address,
                "job_id": share.job_id,
                "nonce": share.nonce_hex(),
                "result": share.digest_hex()
            }
        }))
    }

    /// Convert a JSON message to a string with newline
    pub fn to_message(json: &Value) -> String {
        debug!(target: LOG_TARGET, "Serialized Stratum message: {}", json);
        format!("{}\n", json)
    }
}
