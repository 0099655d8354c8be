// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/mod.rs
// Version: 1.0.0
//
// This file is the module declaration for the core mining types, the hash
// capability and the target comparison rule.

pub mod difficulty;
pub mod hasher;
pub mod types;

// Re-export the most commonly used items
pub use difficulty::{meets_target, target_from_difficulty, MAX_TARGET};
pub use hasher::{hasher_for, PowHasher, Sha256dHasher, Sha3xHasher};
pub use types::{Algorithm, MiningJob, PoolJob, Share, ShareResult, HASH_SIZE};
