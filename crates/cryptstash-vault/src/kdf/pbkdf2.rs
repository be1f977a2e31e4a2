// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PBKDF2-HMAC-SHA512 key handler.
//!
//! Persists `{salt, iterations, hash}` where `hash` is the hex SHA-512 of the
//! derived key, used to tell a wrong passphrase apart from a right one.

use std::fmt;
use std::num::NonZeroU32;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use cryptstash_core::{CryptstashError, KeyHandler, OptionSpec, OptionValues};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto;

pub const NAME: &str = "pbkdf2";
pub const SALT_LEN: usize = 64;
pub const DEFAULT_ITERATIONS: u32 = 20_000;

pub const OPTIONS: &[OptionSpec] = &[OptionSpec {
    name: "iterations",
    help: "PBKDF2-HMAC-SHA512 iteration count",
    pattern: Some("[1-9][0-9]*"),
    default: Some("20000"),
}];

/// Typed form of the pbkdf2 options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pbkdf2Options {
    pub iterations: NonZeroU32,
}

impl TryFrom<&OptionValues> for Pbkdf2Options {
    type Error = CryptstashError;

    fn try_from(values: &OptionValues) -> Result<Self, Self::Error> {
        Ok(Self {
            iterations: values.get("iterations")?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredParams {
    salt: String,
    iterations: u32,
    hash: String,
}

/// Derive `key_len` bytes with PBKDF2 using HMAC-SHA512.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8],
    iterations: NonZeroU32,
    key_len: usize,
) -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(vec![0u8; key_len]);
    ring::pbkdf2::derive(
        ring::pbkdf2::PBKDF2_HMAC_SHA512,
        iterations,
        salt,
        passphrase,
        key.as_mut_slice(),
    );
    key
}

#[derive(Default)]
pub struct Pbkdf2KeyHandler {
    salt: Vec<u8>,
    iterations: Option<NonZeroU32>,
    hash: String,
    key: Option<Zeroizing<Vec<u8>>>,
}

impl fmt::Debug for Pbkdf2KeyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pbkdf2KeyHandler")
            .field("iterations", &self.iterations)
            .field("salt_len", &self.salt.len())
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Pbkdf2KeyHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iterations(&self) -> Option<NonZeroU32> {
        self.iterations
    }
}

pub(crate) fn construct() -> Box<dyn KeyHandler> {
    Box::new(Pbkdf2KeyHandler::new())
}

impl KeyHandler for Pbkdf2KeyHandler {
    fn name(&self) -> &'static str {
        NAME
    }

    fn option_specs(&self) -> &'static [OptionSpec] {
        OPTIONS
    }

    fn make_key(
        &mut self,
        key_len: usize,
        options: &OptionValues,
        passphrase: &SecretString,
    ) -> Result<(), CryptstashError> {
        let options = Pbkdf2Options::try_from(options)?;
        let salt = crypto::random_bytes(SALT_LEN)?;
        let key = derive_key(
            passphrase.expose_secret().as_bytes(),
            &salt,
            options.iterations,
            key_len,
        );
        self.hash = crypto::sha512_hex(&key);
        self.salt = salt;
        self.iterations = Some(options.iterations);
        self.key = Some(key);
        Ok(())
    }

    fn store(&self) -> Result<serde_json::Value, CryptstashError> {
        let iterations = self
            .iterations
            .ok_or_else(|| CryptstashError::Crypto("pbkdf2 key was never derived".to_string()))?;
        let params = StoredParams {
            salt: STANDARD.encode(&self.salt),
            iterations: iterations.get(),
            hash: self.hash.clone(),
        };
        serde_json::to_value(params).map_err(|e| CryptstashError::Internal(e.to_string()))
    }

    fn load(
        &mut self,
        key_len: usize,
        data: &serde_json::Value,
        passphrase: &SecretString,
    ) -> Result<bool, CryptstashError> {
        let params: StoredParams = serde_json::from_value(data.clone())
            .map_err(|e| CryptstashError::MalformedFile(format!("pbkdf2 key data: {e}")))?;
        let salt = STANDARD
            .decode(&params.salt)
            .map_err(|e| CryptstashError::MalformedFile(format!("pbkdf2 salt: {e}")))?;
        let iterations = NonZeroU32::new(params.iterations).ok_or_else(|| {
            CryptstashError::MalformedFile("pbkdf2 iterations must be positive".to_string())
        })?;

        let key = derive_key(passphrase.expose_secret().as_bytes(), &salt, iterations, key_len);
        let digest = crypto::sha512_hex(&key);
        if !crypto::constant_time_eq(digest.as_bytes(), params.hash.to_ascii_lowercase().as_bytes()) {
            return Ok(false);
        }

        self.salt = salt;
        self.iterations = Some(iterations);
        self.hash = digest;
        self.key = Some(key);
        Ok(true)
    }

    fn key(&self) -> Option<&[u8]> {
        self.key.as_ref().map(|k| k.as_slice())
    }

    fn rekey_options(&self) -> OptionValues {
        let iterations = self
            .iterations
            .map_or(DEFAULT_ITERATIONS, NonZeroU32::get);
        OptionValues::new().with("iterations", iterations.to_string())
    }
}
