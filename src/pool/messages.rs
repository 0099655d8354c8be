// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/messages.rs
// Version: 1.0.0
//
// This file interprets the pool lines the bridge miner receives inside
// pool_data frames: login results, job notifications and share responses.
// The bridge itself never parses pool traffic.

use super::protocol::{FIRST_SUBMIT_ID, LOGIN_ID};
use crate::core::difficulty::{parse_target_difficulty, target_from_difficulty};
use crate::core::{MiningJob, PoolJob, ShareResult, HASH_SIZE};
use serde_json::Value;
use tracing::{debug, warn};

const LOG_TARGET: &str = "poolbridge::pool::messages";

#[derive(Debug, Clone, PartialEq)]
pub enum PoolMessage {
    /// Login accepted, possibly carrying the first job
    LoginSuccess(Option<MiningJob>),
    NewJob(MiningJob),
    ShareResponse { submit_id: u64, accepted: bool },
    Error(String),
}

/// Parse one pool line. Lines that carry nothing the miner acts on give `Ok(None)`.
pub fn parse_pool_message(line: &str) -> Result<Option<PoolMessage>, serde_json::Error> {
    let message: Value = serde_json::from_str(line)?;

    if let Some(method) = message.get("method").and_then(|m| m.as_str()) {
        return Ok(match method {
            "job" => message.get("params").cloned().and_then(job_from_value).map(PoolMessage::NewJob),
            other => {
                debug!(target: LOG_TARGET, "Ignoring pool method: {}", other);
                None
            }
        });
    }

    if let Some(error) = message.get("error").filter(|e| !e.is_null()) {
        return Ok(Some(PoolMessage::Error(error.to_string())));
    }

    let id = message.get("id").and_then(|id| id.as_u64());
    let result = message.get("result").cloned().unwrap_or(Value::Null);
    Ok(match id {
        Some(LOGIN_ID) => {
            let job = result.get("job").cloned().and_then(job_from_value);
            Some(PoolMessage::LoginSuccess(job))
        }
        Some(submit_id) if submit_id >= FIRST_SUBMIT_ID => {
            let accepted = serde_json::from_value::<ShareResult>(result)
                .map(|r| r.is_accepted())
                .unwrap_or(false);
            Some(PoolMessage::ShareResponse { submit_id, accepted })
        }
        _ => None,
    })
}

fn job_from_value(value: Value) -> Option<MiningJob> {
    let job: PoolJob = match serde_json::from_value(value) {
        Ok(job) => job,
        Err(e) => {
            warn!(target: LOG_TARGET, "Malformed job: {}", e);
            return None;
        }
    };
    pool_job_to_mining_job(&job)
}

/// Convert the pool's job into the fixed-size form the scheduler works on
pub fn pool_job_to_mining_job(job: &PoolJob) -> Option<MiningJob> {
    let blob = hex::decode(job.blob.as_deref().unwrap_or_default()).ok()?;
    let header: [u8; HASH_SIZE] = match blob.try_into() {
        Ok(header) => header,
        Err(blob) => {
            warn!(target: LOG_TARGET, "Job {} header is {} bytes, expected {}", job.job_id, blob.len(), HASH_SIZE);
            return None;
        }
    };
    let difficulty = job
        .difficulty
        .or_else(|| job.target.as_deref().map(parse_target_difficulty))
        .unwrap_or(1);

    Some(MiningJob::new(job.job_id.clone(), header, target_from_difficulty(difficulty), job.height))
}
