// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/difficulty.rs
// Version: 1.0.0
//
// This file holds the digest-versus-target comparison rule and the
// conversions between pool difficulty values and 256-bit targets.
//
// Byte order: digests and targets are always read as big-endian magnitudes,
// byte 0 being the most significant. Both sides of a comparison use the same
// rule.

use super::types::HASH_SIZE;
use tracing::warn;
use uint::construct_uint;

const LOG_TARGET: &str = "poolbridge::core::difficulty";

construct_uint! {
    pub struct U256(4);
}

/// Easiest possible target, every digest qualifies
pub const MAX_TARGET: [u8; HASH_SIZE] = [0xFF; HASH_SIZE];

/// True when `digest <= target` as big-endian unsigned integers.
pub fn meets_target(digest: &[u8; HASH_SIZE], target: &[u8; HASH_SIZE]) -> bool {
    U256::from_big_endian(digest) <= U256::from_big_endian(target)
}

/// Target for a pool difficulty: `U256::MAX / difficulty`.
pub fn target_from_difficulty(difficulty: u64) -> [u8; HASH_SIZE] {
    if difficulty <= 1 {
        return MAX_TARGET;
    }
    (U256::MAX / U256::from(difficulty)).to_big_endian()
}

/// Difficulty a digest achieves, saturating at `u64::MAX`.
pub fn digest_difficulty(digest: &[u8; HASH_SIZE]) -> u64 {
    let value = U256::from_big_endian(digest);
    if value.is_zero() {
        return u64::MAX;
    }
    let difficulty = U256::MAX / value;
    if difficulty > U256::from(u64::MAX) {
        u64::MAX
    } else {
        difficulty.low_u64()
    }
}

/// Parse a SHA3x pool target (8 bytes, little-endian hex) into a difficulty
pub fn parse_target_difficulty(target_hex: &str) -> u64 {
    match hex::decode(target_hex) {
        Ok(bytes) if bytes.len() >= 8 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[..8]);
            let target = u64::from_le_bytes(raw);
            if target > 0 {
                u64::MAX / target
            } else {
                warn!(target: LOG_TARGET, "Invalid pool target: zero value");
                1
            }
        }
        Ok(bytes) => {
            warn!(target: LOG_TARGET, "Invalid pool target: too short ({} bytes)", bytes.len());
            1
        }
        Err(e) => {
            warn!(target: LOG_TARGET, "Failed to decode pool target hex: {}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_byte(index: usize, value: u8) -> [u8; HASH_SIZE] {
        let mut bytes = [0u8; HASH_SIZE];
        bytes[index] = value;
        bytes
    }

    #[test]
    fn comparison_is_big_endian() {
        // 0x01 in the most significant byte outweighs 0xFF in the least
        let high = with_byte(0, 0x01);
        let low = with_byte(HASH_SIZE - 1, 0xFF);
        assert!(meets_target(&low, &high));
        assert!(!meets_target(&high, &low));
    }

    #[test]
    fn equal_digest_qualifies() {
        let value = with_byte(5, 0x42);
        assert!(meets_target(&value, &value));
    }

    #[test]
    fn max_target_accepts_everything() {
        assert!(meets_target(&[0xFF; HASH_SIZE], &MAX_TARGET));
        assert!(!meets_target(&with_byte(0, 1), &[0u8; HASH_SIZE]));
    }

    #[test]
    fn harder_difficulty_gives_smaller_target() {
        let easy = U256::from_big_endian(&target_from_difficulty(10));
        let hard = U256::from_big_endian(&target_from_difficulty(1000));
        assert!(hard < easy);
        assert_eq!(target_from_difficulty(1), MAX_TARGET);
    }

    #[test]
    fn digest_difficulty_roundtrips_target() {
        let target = target_from_difficulty(5000);
        assert_eq!(digest_difficulty(&target), 5000);
        assert_eq!(digest_difficulty(&[0u8; HASH_SIZE]), u64::MAX);
    }

    #[test]
    fn parse_sha3x_target() {
        assert_eq!(parse_target_difficulty("0100000000000000"), u64::MAX);
        assert_eq!(parse_target_difficulty("00"), 1);
        assert_eq!(parse_target_difficulty("zz"), 1);
    }
}

// Changelog:
// - v1.0.0 (2026-10-18): Single 256-bit comparison rule.
//   - meets_target compares digest and target as big-endian U256 values.
//   - target_from_difficulty and digest_difficulty replace the per-algorithm
//     u64 difficulty math.
