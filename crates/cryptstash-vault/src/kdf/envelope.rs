// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase-sealed envelopes in the scrypt encrypted-data format.
//!
//! Layout (version 0):
//!
//! ```text
//! offset  len  field
//!      0    6  "scrypt"
//!      6    1  version (0)
//!      7    1  log2(N)
//!      8    4  r, big endian
//!     12    4  p, big endian
//!     16   32  salt
//!     48   16  SHA-256(bytes 0..48), truncated
//!     64   32  HMAC-SHA-256(bytes 0..64)
//!     96    n  AES-256-CTR payload
//!   96+n   32  HMAC-SHA-256(bytes 0..96+n)
//! ```
//!
//! The 64-byte scrypt output is split into the AES key (first half) and the
//! HMAC key (second half).

use std::time::{Duration, Instant};

use ctr::cipher::{KeyIvInit, StreamCipher};
use cryptstash_core::CryptstashError;
use ring::{digest, hmac};
use zeroize::Zeroizing;

use crate::crypto;

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

const MAGIC: &[u8; 6] = b"scrypt";
const VERSION: u8 = 0;
const SALT_LEN: usize = 32;
const HEADER_LEN: usize = 96;
const MAC_LEN: usize = 32;
const DERIVED_LEN: usize = 64;

/// Cheapest cost ever produced, and the cost used to time the machine.
pub const MIN_LOG_N: u8 = 10;
/// Hard ceiling accepted when opening; larger headers are treated as corrupt.
pub const MAX_LOG_N: u8 = 24;
const BLOCK_SIZE_R: u32 = 8;
const PARALLELISM_P: u32 = 1;
const MAX_R: u32 = 32;
const MAX_P: u32 = 16;
/// scrypt's working set is `128 * r * N` bytes; headers asking for more than
/// the default `r` at [`MAX_LOG_N`] (16 GiB) are refused.
const MAX_MEMORY: u64 = 128 * BLOCK_SIZE_R as u64 * (1 << MAX_LOG_N);

/// scrypt cost parameters recorded in an envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostParams {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

impl CostParams {
    pub const MINIMUM: CostParams = CostParams {
        log_n: MIN_LOG_N,
        r: BLOCK_SIZE_R,
        p: PARALLELISM_P,
    };

    fn is_acceptable(&self) -> bool {
        (1..=MAX_LOG_N).contains(&self.log_n)
            && (1..=MAX_R).contains(&self.r)
            && (1..=MAX_P).contains(&self.p)
            && self.memory() <= MAX_MEMORY
    }

    /// Bytes of scratch memory one derivation needs.
    fn memory(&self) -> u64 {
        (128 * u64::from(self.r)) << self.log_n
    }
}

/// Pick the most expensive cost that fits in `budget` of CPU time.
///
/// One derivation at [`CostParams::MINIMUM`] is timed; every increment of
/// `log_n` doubles the work. The result never exceeds `max_log_n`.
pub fn calibrate(budget: Duration, max_log_n: u8) -> Result<CostParams, CryptstashError> {
    let ceiling = max_log_n.clamp(MIN_LOG_N, MAX_LOG_N);
    if budget.is_zero() || ceiling == MIN_LOG_N {
        return Ok(CostParams::MINIMUM);
    }

    let started = Instant::now();
    derive(b"calibration", &[0u8; SALT_LEN], CostParams::MINIMUM)?;
    let mut estimate = started.elapsed().max(Duration::from_micros(1));

    let mut params = CostParams::MINIMUM;
    while params.log_n < ceiling {
        let next = estimate.saturating_mul(2);
        if next > budget {
            break;
        }
        estimate = next;
        params.log_n += 1;
    }
    Ok(params)
}

/// Seal `payload` under `passphrase` with the given cost.
pub fn seal(payload: &[u8], passphrase: &[u8], params: CostParams) -> Result<Vec<u8>, CryptstashError> {
    if !params.is_acceptable() {
        return Err(CryptstashError::Crypto(format!("unsupported scrypt cost {params:?}")));
    }
    let mut salt = [0u8; SALT_LEN];
    crypto::fill_random(&mut salt)?;
    let dk = derive(passphrase, &salt, params)?;
    let (enc_key, mac_key) = dk.split_at(DERIVED_LEN / 2);
    let mac_key = hmac::Key::new(hmac::HMAC_SHA256, mac_key);

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + MAC_LEN);
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.push(params.log_n);
    out.extend_from_slice(&params.r.to_be_bytes());
    out.extend_from_slice(&params.p.to_be_bytes());
    out.extend_from_slice(&salt);
    let checksum = digest::digest(&digest::SHA256, &out);
    out.extend_from_slice(&checksum.as_ref()[..16]);
    let header_mac = hmac::sign(&mac_key, &out);
    out.extend_from_slice(header_mac.as_ref());

    let body_start = out.len();
    out.extend_from_slice(payload);
    Aes256Ctr::new_from_slices(enc_key, &[0u8; 16])
        .map_err(|e| CryptstashError::Crypto(format!("invalid envelope key: {e}")))?
        .apply_keystream(&mut out[body_start..]);

    let trailer = hmac::sign(&mac_key, &out);
    out.extend_from_slice(trailer.as_ref());
    Ok(out)
}

/// Open an envelope. `None` covers every failure: wrong passphrase,
/// truncation, tampering, unsupported header.
pub fn open(envelope: &[u8], passphrase: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    if envelope.len() < HEADER_LEN + MAC_LEN
        || &envelope[..6] != MAGIC
        || envelope[6] != VERSION
    {
        return None;
    }
    let checksum = digest::digest(&digest::SHA256, &envelope[..48]);
    if checksum.as_ref()[..16] != envelope[48..64] {
        return None;
    }

    let params = read_params(envelope)?;
    let dk = derive(passphrase, &envelope[16..48], params).ok()?;
    let (enc_key, mac_key) = dk.split_at(DERIVED_LEN / 2);
    let mac_key = hmac::Key::new(hmac::HMAC_SHA256, mac_key);

    hmac::verify(&mac_key, &envelope[..64], &envelope[64..HEADER_LEN]).ok()?;
    let trailer_at = envelope.len() - MAC_LEN;
    hmac::verify(&mac_key, &envelope[..trailer_at], &envelope[trailer_at..]).ok()?;

    let mut payload = Zeroizing::new(envelope[HEADER_LEN..trailer_at].to_vec());
    Aes256Ctr::new_from_slices(enc_key, &[0u8; 16])
        .ok()?
        .apply_keystream(payload.as_mut_slice());
    Some(payload)
}

/// Cost parameters of an envelope, if its header is well formed.
pub fn read_params(envelope: &[u8]) -> Option<CostParams> {
    if envelope.len() < 16 {
        return None;
    }
    let params = CostParams {
        log_n: envelope[7],
        r: u32::from_be_bytes(envelope[8..12].try_into().ok()?),
        p: u32::from_be_bytes(envelope[12..16].try_into().ok()?),
    };
    params.is_acceptable().then_some(params)
}

fn derive(passphrase: &[u8], salt: &[u8], params: CostParams) -> Result<Zeroizing<[u8; DERIVED_LEN]>, CryptstashError> {
    let scrypt_params = scrypt::Params::new(params.log_n, params.r, params.p, DERIVED_LEN)
        .map_err(|e| CryptstashError::Crypto(format!("invalid scrypt parameters: {e}")))?;
    let mut dk = Zeroizing::new([0u8; DERIVED_LEN]);
    scrypt::scrypt(passphrase, salt, &scrypt_params, dk.as_mut())
        .map_err(|e| CryptstashError::Crypto(format!("scrypt derivation failed: {e}")))?;
    Ok(dk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let sealed = seal(b"random key bytes", b"hunter2", CostParams::MINIMUM).unwrap();
        assert_eq!(sealed.len(), HEADER_LEN + 16 + MAC_LEN);
        assert_eq!(&sealed[..6], b"scrypt");
        let opened = open(&sealed, b"hunter2").unwrap();
        assert_eq!(opened.as_slice(), b"random key bytes");
    }

    #[test]
    fn wrong_passphrase_does_not_open() {
        let sealed = seal(b"payload", b"right", CostParams::MINIMUM).unwrap();
        assert!(open(&sealed, b"wrong").is_none());
    }

    #[test]
    fn any_flipped_bit_is_rejected() {
        let sealed = seal(b"payload", b"pw", CostParams::MINIMUM).unwrap();
        for idx in [0, 7, 20, 50, 70, HEADER_LEN, sealed.len() - 1] {
            let mut tampered = sealed.clone();
            tampered[idx] ^= 0x01;
            assert!(open(&tampered, b"pw").is_none(), "byte {idx} flip accepted");
        }
    }

    #[test]
    fn truncated_envelope_is_rejected() {
        let sealed = seal(b"payload", b"pw", CostParams::MINIMUM).unwrap();
        assert!(open(&sealed[..HEADER_LEN], b"pw").is_none());
        assert!(open(b"", b"pw").is_none());
    }

    #[test]
    fn same_payload_seals_differently() {
        let a = seal(b"payload", b"pw", CostParams::MINIMUM).unwrap();
        let b = seal(b"payload", b"pw", CostParams::MINIMUM).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn header_records_cost() {
        let sealed = seal(b"k", b"pw", CostParams::MINIMUM).unwrap();
        assert_eq!(read_params(&sealed), Some(CostParams::MINIMUM));
    }

    #[test]
    fn oversized_cost_is_refused() {
        let mut sealed = seal(b"k", b"pw", CostParams::MINIMUM).unwrap();
        sealed[7] = 40;
        assert!(read_params(&sealed).is_none());
        assert!(open(&sealed, b"pw").is_none());
    }

    #[test]
    fn memory_hungry_cost_is_refused() {
        let mut sealed = seal(b"k", b"pw", CostParams::MINIMUM).unwrap();
        sealed[7] = MAX_LOG_N;
        sealed[8..12].copy_from_slice(&MAX_R.to_be_bytes());
        let checksum = digest::digest(&digest::SHA256, &sealed[..48]);
        sealed[48..64].copy_from_slice(&checksum.as_ref()[..16]);

        assert!(read_params(&sealed).is_none());
        assert!(open(&sealed, b"pw").is_none());

        let largest = CostParams {
            log_n: MAX_LOG_N,
            r: BLOCK_SIZE_R,
            p: MAX_P,
        };
        assert!(largest.is_acceptable());
        assert!(!CostParams { r: BLOCK_SIZE_R + 1, ..largest }.is_acceptable());
        assert!(seal(b"k", b"pw", CostParams { r: MAX_R, ..largest }).is_err());
    }

    #[test]
    fn zero_budget_calibrates_to_minimum() {
        assert_eq!(calibrate(Duration::ZERO, 20).unwrap(), CostParams::MINIMUM);
    }

    #[test]
    fn calibration_respects_ceiling() {
        let params = calibrate(Duration::from_secs(3600), 11).unwrap();
        assert!(params.log_n <= 11);
        assert!(params.log_n >= MIN_LOG_N);
    }
}
