// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integrity frame: `check:<byte length>:<hex sha512>:<text>`.
//!
//! The explicit length lets the loader drop whatever block padding the
//! stages appended; the digest catches a wrong key or corrupted bytes.

use cryptstash_core::CryptstashError;

use crate::crypto;

const TAG: &[u8] = b"check:";

/// Frame `text` for encryption.
pub fn wrap(text: &[u8]) -> Vec<u8> {
    let header = format!("check:{}:{}:", text.len(), crypto::sha512_hex(text));
    let mut framed = Vec::with_capacity(header.len() + text.len());
    framed.extend_from_slice(header.as_bytes());
    framed.extend_from_slice(text);
    framed
}

/// Recover the framed text from decrypted, possibly padded, bytes.
///
/// Every failure is [`CryptstashError::IntegrityCheckFailure`].
pub fn unwrap(data: &[u8]) -> Result<&[u8], CryptstashError> {
    parse(data).ok_or(CryptstashError::IntegrityCheckFailure)
}

fn parse(data: &[u8]) -> Option<&[u8]> {
    let rest = data.strip_prefix(TAG)?;

    let len_end = rest.iter().position(|&b| b == b':')?;
    let len_digits = &rest[..len_end];
    if len_digits.is_empty() || !len_digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let len: usize = std::str::from_utf8(len_digits).ok()?.parse().ok()?;
    let rest = &rest[len_end + 1..];

    let digest_end = rest.iter().position(|&b| b == b':')?;
    let digest = &rest[..digest_end];
    let text = rest[digest_end + 1..].get(..len)?;

    crypto::constant_time_eq(crypto::sha512_hex(text).as_bytes(), digest).then_some(text)
}
