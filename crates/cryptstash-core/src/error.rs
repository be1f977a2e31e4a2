// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the cryptstash vault.

use std::path::PathBuf;

use thiserror::Error;

/// Message shared by every failure that must not reveal which check failed.
pub const BAD_PASSPHRASE_MESSAGE: &str = "bad passphrase or corrupted file";

/// The primary error type used across the cryptstash crates.
#[derive(Debug, Error)]
pub enum CryptstashError {
    /// Configuration errors (invalid TOML, bad stage list, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// A key-handler option value failed validation.
    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: String, reason: String },

    /// A cipher or key-handler name is not in the registry.
    #[error("unknown {kind} `{name}`")]
    UnknownVariant { kind: &'static str, name: String },

    /// A stage key could not be established from the supplied passphrase.
    #[error("bad passphrase or corrupted file")]
    KeyDerivationFailure,

    /// The decrypted payload failed its length or digest check.
    #[error("bad passphrase or corrupted file")]
    IntegrityCheckFailure,

    /// The persisted vault file is structurally invalid.
    #[error("malformed vault file: {0}")]
    MalformedFile(String),

    /// Reading or writing the vault file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Passphrase acquisition failed or was cancelled.
    #[error("passphrase error: {0}")]
    Passphrase(String),

    /// Cryptographic primitive failure (RNG, missing key material, bad key size).
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CryptstashError {
    /// True for the undifferentiated "bad passphrase or corrupted file" outcomes.
    ///
    /// Front ends use this to decide whether re-prompting makes sense.
    pub fn is_bad_passphrase(&self) -> bool {
        matches!(
            self,
            CryptstashError::KeyDerivationFailure | CryptstashError::IntegrityCheckFailure
        )
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CryptstashError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn unknown_cipher(name: impl Into<String>) -> Self {
        CryptstashError::UnknownVariant {
            kind: "cipher",
            name: name.into(),
        }
    }

    pub fn unknown_key_handler(name: impl Into<String>) -> Self {
        CryptstashError::UnknownVariant {
            kind: "key handler",
            name: name.into(),
        }
    }
}
