// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rotating numeric check-in codes.
//!
//! Shifts may carry a short numeric code that on-site staff display at the
//! door. Only the SHA-256 hash is persisted; rotation replaces the hash and
//! stamps the rotation time.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of digits in a generated check-in code.
pub const CODE_LEN: usize = 6;

/// Generate a fresh zero-padded numeric code.
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}

/// Hash a code for storage.
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a supplied code against a stored hash.
pub fn verify_code(code: &str, stored_hash: &str) -> bool {
    hash_code(code) == stored_hash
}
