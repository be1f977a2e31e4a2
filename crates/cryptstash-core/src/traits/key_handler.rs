// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-derivation strategy trait.

use secrecy::SecretString;

use crate::error::CryptstashError;
use crate::types::{OptionSpec, OptionValues};

/// Turns a passphrase into raw key bytes and persists only what is needed
/// to repeat that derivation.
///
/// A handler holds its derived key in memory for the lifetime of the open
/// vault. [`KeyHandler::store`] must never include the key itself.
pub trait KeyHandler: std::fmt::Debug + Send {
    /// Stable registry name, persisted in the vault file.
    fn name(&self) -> &'static str;

    /// Options accepted by [`KeyHandler::make_key`].
    fn option_specs(&self) -> &'static [OptionSpec];

    /// Draw fresh randomness and produce a `key_len`-byte key from the passphrase.
    ///
    /// `options` must already be validated against [`KeyHandler::option_specs`].
    fn make_key(
        &mut self,
        key_len: usize,
        options: &OptionValues,
        passphrase: &SecretString,
    ) -> Result<(), CryptstashError>;

    /// Public parameters needed to re-derive the key later.
    fn store(&self) -> Result<serde_json::Value, CryptstashError>;

    /// Re-derive the key from persisted parameters.
    ///
    /// Returns `Ok(false)` when the passphrase is wrong or the parameters do
    /// not verify; `Err` is reserved for structurally unusable data.
    fn load(
        &mut self,
        key_len: usize,
        data: &serde_json::Value,
        passphrase: &SecretString,
    ) -> Result<bool, CryptstashError>;

    /// The derived key, once `make_key` or a successful `load` has run.
    fn key(&self) -> Option<&[u8]>;

    /// Options that reproduce the current cost parameters on passphrase rotation.
    fn rekey_options(&self) -> OptionValues;
}
