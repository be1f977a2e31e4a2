// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! scrypt key handler.
//!
//! The stage key is random. It is sealed under the passphrase in a scrypt
//! envelope whose cost is calibrated against a CPU-time budget, and the
//! envelope (base64) is what gets persisted.

use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use cryptstash_core::{CryptstashError, KeyHandler, OptionSpec, OptionValues};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use zeroize::Zeroizing;

use super::envelope::{self, MAX_LOG_N, MIN_LOG_N};
use crate::crypto;

pub const NAME: &str = "scrypt";
pub const DEFAULT_MAX_TIME: &str = "1";
pub const DEFAULT_MAX_LOG_N: &str = "18";

pub const OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        name: "time",
        help: "CPU seconds to spend deriving the key",
        pattern: Some(r"[0-9]+(\.[0-9]+)?"),
        default: Some(DEFAULT_MAX_TIME),
    },
    OptionSpec {
        name: "max_log_n",
        help: "upper bound for the scrypt cost exponent (10-24)",
        pattern: Some("[0-9]+"),
        default: Some(DEFAULT_MAX_LOG_N),
    },
];

/// Typed form of the scrypt options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScryptOptions {
    pub max_time: Duration,
    pub max_log_n: u8,
}

impl TryFrom<&OptionValues> for ScryptOptions {
    type Error = CryptstashError;

    fn try_from(values: &OptionValues) -> Result<Self, Self::Error> {
        let secs: f64 = values.get("time")?;
        let max_time = Duration::try_from_secs_f64(secs).map_err(|e| CryptstashError::InvalidOption {
            name: "time".to_string(),
            reason: e.to_string(),
        })?;
        let max_log_n: u8 = values.get("max_log_n")?;
        if !(MIN_LOG_N..=MAX_LOG_N).contains(&max_log_n) {
            return Err(CryptstashError::InvalidOption {
                name: "max_log_n".to_string(),
                reason: format!("must be between {MIN_LOG_N} and {MAX_LOG_N}"),
            });
        }
        Ok(Self { max_time, max_log_n })
    }
}

#[derive(Default)]
pub struct ScryptKeyHandler {
    envelope: Vec<u8>,
    options: Option<OptionValues>,
    key: Option<Zeroizing<Vec<u8>>>,
}

impl fmt::Debug for ScryptKeyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScryptKeyHandler")
            .field("cost", &envelope::read_params(&self.envelope))
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ScryptKeyHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

pub(crate) fn construct() -> Box<dyn KeyHandler> {
    Box::new(ScryptKeyHandler::new())
}

impl KeyHandler for ScryptKeyHandler {
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
        let typed = ScryptOptions::try_from(options)?;
        let key = crypto::random_key(key_len)?;
        let cost = envelope::calibrate(typed.max_time, typed.max_log_n)?;
        debug!(log_n = cost.log_n, r = cost.r, p = cost.p, "scrypt cost calibrated");
        self.envelope = envelope::seal(&key, passphrase.expose_secret().as_bytes(), cost)?;
        self.options = Some(options.clone());
        self.key = Some(key);
        Ok(())
    }

    fn store(&self) -> Result<serde_json::Value, CryptstashError> {
        if self.envelope.is_empty() {
            return Err(CryptstashError::Crypto("scrypt key was never sealed".to_string()));
        }
        Ok(serde_json::Value::String(STANDARD.encode(&self.envelope)))
    }

    fn load(
        &mut self,
        key_len: usize,
        data: &serde_json::Value,
        passphrase: &SecretString,
    ) -> Result<bool, CryptstashError> {
        let encoded = data.as_str().ok_or_else(|| {
            CryptstashError::MalformedFile("scrypt key data must be a base64 string".to_string())
        })?;
        let sealed = STANDARD
            .decode(encoded)
            .map_err(|e| CryptstashError::MalformedFile(format!("scrypt key data: {e}")))?;

        let Some(key) = envelope::open(&sealed, passphrase.expose_secret().as_bytes()) else {
            return Ok(false);
        };
        if key.len() != key_len {
            return Ok(false);
        }
        self.envelope = sealed;
        self.key = Some(key);
        Ok(true)
    }

    fn key(&self) -> Option<&[u8]> {
        self.key.as_ref().map(|k| k.as_slice())
    }

    fn rekey_options(&self) -> OptionValues {
        self.options.clone().unwrap_or_else(|| {
            OptionValues::new()
                .with("time", DEFAULT_MAX_TIME)
                .with("max_log_n", DEFAULT_MAX_LOG_N)
        })
    }
}
