// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/types.rs
// Version: 1.0.0
//
// This file defines the job and share types exchanged between the pool,
// the work scheduler and its hash workers.
//
// Tree Location:
// - src/core/types.rs (core data structures)
// - Depends on: serde, hex

use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;

/// Size of job headers, targets and digests in bytes
pub const HASH_SIZE: usize = 32;

/// Mining algorithm variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha3x,
    Sha256d,
}

impl Algorithm {
    /// Name announced to the pool at login
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Sha3x => "sha3x",
            Algorithm::Sha256d => "sha256d",
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha3x" => Ok(Algorithm::Sha3x),
            "sha256d" | "sha256" => Ok(Algorithm::Sha256d),
            other => Err(format!("Unknown algorithm: {}", other)),
        }
    }
}

/// Work handed to the hash workers.
///
/// Jobs are immutable once issued; a new job replaces the old one instead of
/// mutating it. Workers hold it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningJob {
    /// Job identifier assigned by the pool
    pub job_id: String,

    /// Header template the nonce is hashed against
    pub header: [u8; HASH_SIZE],

    /// Share target, compared as a big-endian 256-bit integer
    pub target: [u8; HASH_SIZE],

    /// Blockchain height for this job
    pub height: u64,
}

impl MiningJob {
    pub fn new(job_id: impl Into<String>, header: [u8; HASH_SIZE], target: [u8; HASH_SIZE], height: u64) -> Self {
        Self {
            job_id: job_id.into(),
            header,
            target,
            height,
        }
    }
}

/// A nonce whose digest met the job target.
///
/// Serializes as `{"jobId": .., "nonce": .., "digest": "<hex>"}`, the shape
/// handed to the share submission callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    /// Job ID this share is for
    pub job_id: String,

    /// Nonce value that produced the digest
    pub nonce: u64,

    /// The resulting digest
    #[serde(serialize_with = "serialize_hex")]
    pub digest: [u8; HASH_SIZE],

    /// Worker slot that found this share
    #[serde(skip)]
    pub worker: usize,
}

impl Share {
    pub fn new(job_id: String, nonce: u64, digest: [u8; HASH_SIZE], worker: usize) -> Self {
        Self {
            job_id,
            nonce,
            digest,
            worker,
        }
    }

    /// Nonce as little-endian hex, the encoding pools expect in `submit`
    pub fn nonce_hex(&self) -> String {
        hex::encode(self.nonce.to_le_bytes())
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

fn serialize_hex<S: Serializer>(bytes: &[u8; HASH_SIZE], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// Raw job data received from the mining pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolJob {
    /// Unique job identifier from the pool
    pub job_id: String,

    /// Hex-encoded target (8 bytes, little-endian)
    #[serde(default)]
    pub target: Option<String>,

    /// Current blockchain height
    #[serde(default)]
    pub height: u64,

    /// Optional difficulty value (some pools send this directly)
    #[serde(default)]
    pub difficulty: Option<u64>,

    /// Hex-encoded header template (32 bytes when decoded)
    #[serde(default)]
    pub blob: Option<String>,
}

/// Possible share submission results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShareResult {
    /// Simple boolean result (some pools)
    Bool(bool),

    /// Status object result (Tari pools)
    Status { status: String },

    /// Null result (often means accepted)
    Null,
}

impl ShareResult {
    pub fn is_accepted(&self) -> bool {
        match self {
            ShareResult::Bool(accepted) => *accepted,
            ShareResult::Status { status } => matches!(status.to_lowercase().as_str(), "ok" | "accepted"),
            ShareResult::Null => true,
        }
    }
}


// Changelog:
// - v1.0.0 (2026-10-18): Fixed-size job and share types.
//   - MiningJob carries a 32-byte header and a 32-byte target instead of a
//     u64 target difficulty.
//   - Share serializes to the {jobId, nonce, digest} submission shape.
