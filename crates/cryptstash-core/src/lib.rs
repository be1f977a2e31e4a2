// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the cryptstash vault.
//!
//! This crate provides the error type, the key-handler and passphrase
//! provider traits, and the option and stage-spec types shared by the
//! vault engine, the configuration layer and the front end.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CryptstashError, BAD_PASSPHRASE_MESSAGE};
pub use traits::{KeyHandler, PassphraseProvider};
pub use types::{OptionSpec, OptionValues, PassphrasePurpose, PassphraseRequest, StageSpec};
