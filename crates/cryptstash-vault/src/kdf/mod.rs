// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-handler variants and the registry that maps persisted names to them.
//!
//! The registry is keyed by the stable handler name written to the vault
//! file. Loading a file only ever looks handlers up here, so adding a new
//! variant is a single [`KeyHandlerRegistry::register`] call.

pub mod envelope;
pub mod pbkdf2;
pub mod scrypt;

use std::collections::BTreeMap;

use cryptstash_core::{CryptstashError, KeyHandler, OptionSpec};

/// Factory signature for a fresh, keyless handler instance.
pub type HandlerConstructor = fn() -> Box<dyn KeyHandler>;

/// A single entry in the key-handler registry.
#[derive(Debug, Clone, Copy)]
pub struct KeyHandlerEntry {
    /// Persisted name.
    pub name: &'static str,
    /// One-line description shown by front ends.
    pub description: &'static str,
    /// Options accepted at key creation.
    pub options: &'static [OptionSpec],
    pub construct: HandlerConstructor,
}

/// Known key-handler variants, keyed by name.
#[derive(Debug, Clone)]
pub struct KeyHandlerRegistry {
    entries: BTreeMap<&'static str, KeyHandlerEntry>,
}

impl Default for KeyHandlerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KeyHandlerRegistry {
    /// A registry with no variants.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The built-in variants: `pbkdf2` and `scrypt`.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(KeyHandlerEntry {
            name: pbkdf2::NAME,
            description: "PBKDF2-HMAC-SHA512 with a random 64-byte salt",
            options: pbkdf2::OPTIONS,
            construct: pbkdf2::construct,
        });
        registry.register(KeyHandlerEntry {
            name: scrypt::NAME,
            description: "random key sealed in a time-calibrated scrypt envelope",
            options: scrypt::OPTIONS,
            construct: scrypt::construct,
        });
        registry
    }

    /// Add or replace a variant.
    pub fn register(&mut self, entry: KeyHandlerEntry) {
        self.entries.insert(entry.name, entry);
    }

    /// Find a variant by its persisted name.
    pub fn lookup(&self, name: &str) -> Result<&KeyHandlerEntry, CryptstashError> {
        self.entries
            .get(name)
            .ok_or_else(|| CryptstashError::unknown_key_handler(name))
    }

    /// A fresh handler instance for `name`.
    pub fn instantiate(&self, name: &str) -> Result<Box<dyn KeyHandler>, CryptstashError> {
        Ok((self.lookup(name)?.construct)())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = &KeyHandlerEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptstash_core::OptionValues;
    use secrecy::SecretString;

    #[derive(Debug, Default)]
    struct FixedKey {
        key: Option<Vec<u8>>,
    }

    impl KeyHandler for FixedKey {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn option_specs(&self) -> &'static [OptionSpec] {
            &[]
        }

        fn make_key(
            &mut self,
            key_len: usize,
            _options: &OptionValues,
            _passphrase: &SecretString,
        ) -> Result<(), CryptstashError> {
            self.key = Some(vec![0x42; key_len]);
            Ok(())
        }

        fn store(&self) -> Result<serde_json::Value, CryptstashError> {
            Ok(serde_json::Value::Null)
        }

        fn load(
            &mut self,
            key_len: usize,
            _data: &serde_json::Value,
            _passphrase: &SecretString,
        ) -> Result<bool, CryptstashError> {
            self.key = Some(vec![0x42; key_len]);
            Ok(true)
        }

        fn key(&self) -> Option<&[u8]> {
            self.key.as_deref()
        }

        fn rekey_options(&self) -> OptionValues {
            OptionValues::new()
        }
    }

    #[test]
    fn builtin_has_both_handlers() {
        let registry = KeyHandlerRegistry::builtin();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["pbkdf2", "scrypt"]);
        assert_eq!(registry.instantiate("pbkdf2").unwrap().name(), "pbkdf2");
        assert_eq!(registry.instantiate("scrypt").unwrap().name(), "scrypt");
    }

    #[test]
    fn unknown_handler_is_an_unknown_variant() {
        let err = KeyHandlerRegistry::builtin().lookup("argon2").unwrap_err();
        assert!(matches!(err, CryptstashError::UnknownVariant { kind: "key handler", .. }));
    }

    #[test]
    fn custom_variant_can_be_registered() {
        let mut registry = KeyHandlerRegistry::builtin();
        registry.register(KeyHandlerEntry {
            name: "fixed",
            description: "test-only constant key",
            options: &[],
            construct: || -> Box<dyn KeyHandler> { Box::new(FixedKey::default()) },
        });
        let mut handler = registry.instantiate("fixed").unwrap();
        handler
            .make_key(8, &OptionValues::new(), &SecretString::from("x".to_string()))
            .unwrap();
        assert_eq!(handler.key(), Some(&[0x42u8; 8][..]));
        assert_eq!(registry.entries().count(), 3);
    }
}
