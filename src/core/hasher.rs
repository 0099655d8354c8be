// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/hasher.rs
// Version: 1.0.0
//
// This file defines the pluggable proof-of-work capability used by the hash
// workers, together with the SHA3x (triple SHA3-256) and double SHA-256
// implementations.
//
// Tree Location:
// - src/core/hasher.rs (hash capability and implementations)
// - Depends on: sha3, sha2

use super::types::{Algorithm, HASH_SIZE};
use crate::error::HashError;
use sha2::Sha256;
use sha3::{Digest, Sha3_256};
use std::sync::Arc;

/// Proof-of-work hash function `H(header, nonce, height) -> digest`.
///
/// Implementations are constructed explicitly and handed to the scheduler, so
/// independent schedulers in one process may run different algorithms.
pub trait PowHasher: Send + Sync {
    fn name(&self) -> &'static str;

    fn hash(&self, header: &[u8; HASH_SIZE], nonce: u64, height: u64) -> Result<[u8; HASH_SIZE], HashError>;
}

/// SHA3x triple hash: SHA3-256 applied three times over `nonce || header || 0x01`.
///
/// Height does not take part in SHA3x.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha3xHasher;

impl PowHasher for Sha3xHasher {
    fn name(&self) -> &'static str {
        "sha3x"
    }

    fn hash(&self, header: &[u8; HASH_SIZE], nonce: u64, _height: u64) -> Result<[u8; HASH_SIZE], HashError> {
        let mut input = [0u8; 8 + HASH_SIZE + 1];
        input[..8].copy_from_slice(&nonce.to_le_bytes());
        input[8..8 + HASH_SIZE].copy_from_slice(header);
        input[8 + HASH_SIZE] = 1u8;

        let hash1 = Sha3_256::digest(input);
        let hash2 = Sha3_256::digest(hash1);
        let hash3 = Sha3_256::digest(hash2);
        Ok(hash3.into())
    }
}

/// Double SHA-256 over `header || nonce_le || height_le`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256dHasher;

impl PowHasher for Sha256dHasher {
    fn name(&self) -> &'static str {
        "sha256d"
    }

    fn hash(&self, header: &[u8; HASH_SIZE], nonce: u64, height: u64) -> Result<[u8; HASH_SIZE], HashError> {
        let mut hasher = Sha256::new();
        hasher.update(header);
        hasher.update(nonce.to_le_bytes());
        hasher.update(height.to_le_bytes());
        let first = hasher.finalize();
        Ok(Sha256::digest(first).into())
    }
}

/// Build the hash module for an algorithm
pub fn hasher_for(algo: Algorithm) -> Arc<dyn PowHasher> {
    match algo {
        Algorithm::Sha3x => Arc::new(Sha3xHasher),
        Algorithm::Sha256d => Arc::new(Sha256dHasher),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha3x_matches_manual_triple_hash() {
        let header = [0u8; HASH_SIZE];
        let nonce = 12345u64;
        let hash = Sha3xHasher.hash(&header, nonce, 0).unwrap();

        let mut input = Vec::new();
        input.extend_from_slice(&nonce.to_le_bytes());
        input.extend_from_slice(&header);
        input.push(1u8);
        let expected = Sha3_256::digest(Sha3_256::digest(Sha3_256::digest(&input)));

        assert_eq!(hash.to_vec(), expected.to_vec());
    }

    #[test]
    fn sha256d_depends_on_height() {
        let header = [7u8; HASH_SIZE];
        let a = Sha256dHasher.hash(&header, 1, 100).unwrap();
        let b = Sha256dHasher.hash(&header, 1, 101).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn factory_selects_algorithm() {
        assert_eq!(hasher_for(Algorithm::Sha3x).name(), "sha3x");
        assert_eq!(hasher_for(Algorithm::Sha256d).name(), "sha256d");
    }
}
