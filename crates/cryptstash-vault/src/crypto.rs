// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Randomness and digest helpers shared by stages and key handlers.
//!
//! All randomness comes from the system CSPRNG. Nothing here ever caches or
//! reuses random output between calls.

use cryptstash_core::CryptstashError;
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Fill `buf` from the system CSPRNG.
pub fn fill_random(buf: &mut [u8]) -> Result<(), CryptstashError> {
    SystemRandom::new()
        .fill(buf)
        .map_err(|_| CryptstashError::Crypto("failed to generate random bytes".to_string()))
}

/// `len` fresh random bytes.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, CryptstashError> {
    let mut out = vec![0u8; len];
    fill_random(&mut out)?;
    Ok(out)
}

/// `len` fresh random bytes intended as key material.
pub fn random_key(len: usize) -> Result<Zeroizing<Vec<u8>>, CryptstashError> {
    let mut key = Zeroizing::new(vec![0u8; len]);
    fill_random(key.as_mut_slice())?;
    Ok(key)
}

/// Lowercase hex SHA-512 of `data`.
pub fn sha512_hex(data: &[u8]) -> String {
    hex::encode(digest::digest(&digest::SHA512, data))
}

/// Compare two byte strings without an early exit on the first difference.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
