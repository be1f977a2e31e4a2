// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits implemented by key-derivation variants and front ends.

pub mod key_handler;
pub mod passphrase;

pub use key_handler::KeyHandler;
pub use passphrase::PassphraseProvider;
