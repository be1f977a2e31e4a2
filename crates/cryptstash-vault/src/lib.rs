// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered, passphrase-protected secret store.
//!
//! Entries are serialized, wrapped in a length- and digest-checked frame and
//! then encrypted by an ordered chain of stages. Each stage pairs a CBC block
//! cipher with a key handler (PBKDF2 or a scrypt-sealed random key) that
//! persists only what it needs to re-derive its key.

pub mod cipher;
pub mod crypto;
pub mod format;
pub mod frame;
pub mod kdf;
pub mod prompt;
pub mod stage;
pub mod store;

pub use cipher::{lookup_cipher, CipherDescriptor, CIPHERS};
pub use format::{StageDescriptor, VaultFile};
pub use kdf::{KeyHandlerEntry, KeyHandlerRegistry};
pub use prompt::{PerStagePassphrases, StaticPassphrase, TerminalPrompt, PASSPHRASE_ENV_VAR};
pub use stage::Stage;
pub use store::{default_stage_specs, Store};
