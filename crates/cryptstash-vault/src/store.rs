// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The vault: an ordered chain of stages plus the label to secret entries.
//!
//! Saving serializes the entries, wraps them in the integrity frame and folds
//! the frame through the stages from first to last. Loading re-establishes
//! every stage key, folds the ciphertext back from last to first and
//! verifies the frame. A wrong passphrase and a corrupted file surface as
//! the same error.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use cryptstash_core::{
    CryptstashError, OptionValues, PassphraseProvider, PassphrasePurpose, PassphraseRequest, StageSpec,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::cipher::{lookup_cipher, CipherDescriptor};
use crate::crypto;
use crate::format::VaultFile;
use crate::frame;
use crate::kdf::{KeyHandlerEntry, KeyHandlerRegistry};
use crate::prompt::StaticPassphrase;
use crate::stage::Stage;

/// The stage chain used when nothing else is configured: AES then Blowfish,
/// both keyed by PBKDF2.
pub fn default_stage_specs() -> Vec<StageSpec> {
    vec![StageSpec::new("aes", "pbkdf2"), StageSpec::new("blowfish", "pbkdf2")]
}

pub struct Store {
    stages: Vec<Stage>,
    entries: BTreeMap<String, String>,
    modified: bool,
    registry: KeyHandlerRegistry,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("stages", &self.stages)
            .field("entries", &format_args!("[{} REDACTED]", self.entries.len()))
            .field("modified", &self.modified)
            .finish()
    }
}

struct ResolvedStage<'r> {
    cipher: &'static CipherDescriptor,
    handler: &'r KeyHandlerEntry,
    options: OptionValues,
}

impl Store {
    /// Create a fresh vault with the built-in key handlers.
    pub fn create(specs: &[StageSpec], provider: impl PassphraseProvider) -> Result<Self, CryptstashError> {
        Self::create_with_registry(KeyHandlerRegistry::builtin(), specs, provider)
    }

    /// Create a fresh vault.
    ///
    /// Every spec is checked before the provider is asked for anything.
    pub fn create_with_registry(
        registry: KeyHandlerRegistry,
        specs: &[StageSpec],
        mut provider: impl PassphraseProvider,
    ) -> Result<Self, CryptstashError> {
        if specs.is_empty() {
            return Err(CryptstashError::Config("a vault needs at least one stage".to_string()));
        }
        let stages = {
            let resolved = specs
                .iter()
                .map(|spec| resolve(&registry, spec))
                .collect::<Result<Vec<_>, _>>()?;

            let names: Vec<(&str, &str)> = resolved.iter().map(|r| (r.cipher.id, r.handler.name)).collect();
            let passphrases = collect_passphrases(&mut provider, PassphrasePurpose::Create, &names)?;

            let mut stages = Vec::with_capacity(resolved.len());
            for (index, (r, passphrase)) in resolved.iter().zip(&passphrases).enumerate() {
                let mut handler = (r.handler.construct)();
                handler.make_key(r.cipher.key_size, &r.options, passphrase)?;
                debug!(stage = index, cipher = r.cipher.id, key_handler = r.handler.name, "stage keyed");
                stages.push(Stage::new(r.cipher, handler));
            }
            stages
        };

        info!(stages = stages.len(), "vault created");
        Ok(Self {
            stages,
            entries: BTreeMap::new(),
            modified: true,
            registry,
        })
    }

    /// Load a vault file with the built-in key handlers.
    pub fn load(path: &Path, provider: impl PassphraseProvider) -> Result<Self, CryptstashError> {
        Self::load_with_registry(KeyHandlerRegistry::builtin(), path, provider)
    }

    pub fn load_with_registry(
        registry: KeyHandlerRegistry,
        path: &Path,
        provider: impl PassphraseProvider,
    ) -> Result<Self, CryptstashError> {
        let file = VaultFile::read(path)?;
        let store = Self::from_vault_file(registry, &file, provider)?;
        info!(path = %path.display(), stages = store.stages.len(), entries = store.entries.len(), "vault loaded");
        Ok(store)
    }

    /// Rebuild a vault from an already parsed document.
    ///
    /// The stage list, cipher and handler names and the ciphertext encoding
    /// are checked before any passphrase is requested.
    pub fn from_vault_file(
        registry: KeyHandlerRegistry,
        file: &VaultFile,
        mut provider: impl PassphraseProvider,
    ) -> Result<Self, CryptstashError> {
        if file.stages.is_empty() {
            return Err(CryptstashError::MalformedFile("vault has no stages".to_string()));
        }
        let mut resolved = Vec::with_capacity(file.stages.len());
        for descriptor in &file.stages {
            let cipher = lookup_cipher(&descriptor.cipher)?;
            let handler = registry.lookup(&descriptor.key_handler)?;
            resolved.push((cipher, handler, &descriptor.key_data));
        }
        let ciphertext = file.ciphertext_bytes()?;

        let count = resolved.len();
        let mut stages = Vec::with_capacity(count);
        let mut previous: Option<SecretString> = None;
        for (index, (cipher, entry, key_data)) in resolved.into_iter().enumerate() {
            let mut handler = (entry.construct)();

            let mut unlocked = match &previous {
                Some(prev) if handler.load(cipher.key_size, key_data, prev)? => Some(prev.clone()),
                _ => None,
            };

            let mut attempt = 0u32;
            while unlocked.is_none() {
                let request = PassphraseRequest {
                    purpose: PassphrasePurpose::Unlock,
                    stage: index,
                    stages: count,
                    cipher: cipher.id,
                    key_handler: entry.name,
                    attempt,
                };
                let Some(candidate) = provider.passphrase(&request)? else {
                    warn!(stage = index, attempts = attempt, "no passphrase unlocked stage");
                    return Err(CryptstashError::KeyDerivationFailure);
                };
                let already_tried = previous.as_ref().is_some_and(|prev| same_secret(prev, &candidate));
                if !already_tried && handler.load(cipher.key_size, key_data, &candidate)? {
                    unlocked = Some(candidate);
                } else {
                    warn!(stage = index, attempt, "stage passphrase rejected");
                    attempt += 1;
                }
            }

            debug!(stage = index, cipher = cipher.id, key_handler = entry.name, "stage unlocked");
            previous = unlocked;
            stages.push(Stage::new(cipher, handler));
        }

        let mut data = Zeroizing::new(ciphertext);
        for stage in stages.iter().rev() {
            data = Zeroizing::new(stage.decrypt(&data)?);
        }
        let text = frame::unwrap(&data)?;
        let entries: BTreeMap<String, String> =
            serde_json::from_slice(text).map_err(|_| CryptstashError::IntegrityCheckFailure)?;

        Ok(Self {
            stages,
            entries,
            modified: false,
            registry,
        })
    }

    /// Load `path` if it exists, otherwise create a new, unsaved vault.
    pub fn open_or_create(
        path: &Path,
        specs: &[StageSpec],
        provider: impl PassphraseProvider,
    ) -> Result<Self, CryptstashError> {
        if path.exists() {
            Self::load(path, provider)
        } else {
            info!(path = %path.display(), "vault file not found, creating");
            Self::create(specs, provider)
        }
    }

    /// Encrypt the entries into a vault document without touching disk.
    pub fn to_vault_file(&self) -> Result<VaultFile, CryptstashError> {
        let text = Zeroizing::new(
            serde_json::to_vec(&self.entries).map_err(|e| CryptstashError::Internal(e.to_string()))?,
        );
        let mut data = Zeroizing::new(frame::wrap(&text));
        for stage in &self.stages {
            data = Zeroizing::new(stage.encrypt(&data)?);
        }
        let descriptors = self
            .stages
            .iter()
            .map(Stage::describe)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VaultFile::new(descriptors, &data))
    }

    /// Encrypt and write the vault. The file is only replaced once the whole
    /// document has been produced.
    pub fn save(&mut self, path: &Path) -> Result<(), CryptstashError> {
        self.to_vault_file()?.write(path)?;
        self.modified = false;
        info!(path = %path.display(), entries = self.entries.len(), "vault saved");
        Ok(())
    }

    /// Re-key every stage under one new passphrase.
    pub fn change_passphrase(&mut self, passphrase: &SecretString) -> Result<(), CryptstashError> {
        self.change_passphrases(StaticPassphrase::new(passphrase.clone()))
    }

    /// Re-key every stage with passphrases from `provider`, drawing fresh
    /// salts and envelopes. Entries are untouched.
    pub fn change_passphrases(&mut self, mut provider: impl PassphraseProvider) -> Result<(), CryptstashError> {
        let names: Vec<(&str, &str)> = self
            .stages
            .iter()
            .map(|s| (s.cipher().id, s.key_handler().name()))
            .collect();
        let passphrases = collect_passphrases(&mut provider, PassphrasePurpose::Rotate, &names)?;

        for (index, (stage, passphrase)) in self.stages.iter_mut().zip(&passphrases).enumerate() {
            let key_size = stage.cipher().key_size;
            let handler = stage.key_handler_mut();
            let options = handler.rekey_options();
            handler.make_key(key_size, &options, passphrase)?;
            debug!(stage = index, "stage re-keyed");
        }
        self.modified = true;
        info!(stages = self.stages.len(), "vault passphrase changed");
        Ok(())
    }

    /// Whether `passphrase` unlocks the innermost stage.
    pub fn check_passphrase(&self, passphrase: &SecretString) -> Result<bool, CryptstashError> {
        let Some(stage) = self.stages.first() else {
            return Ok(false);
        };
        let descriptor = stage.describe()?;
        let mut handler = self.registry.instantiate(&descriptor.key_handler)?;
        handler.load(stage.cipher().key_size, &descriptor.key_data, passphrase)
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries.get(label).map(String::as_str)
    }

    /// Labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace an entry, returning the previous value.
    pub fn set(&mut self, label: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.modified = true;
        self.entries.insert(label.into(), value.into())
    }

    /// Remove an entry. Removing a missing label does not dirty the vault.
    pub fn remove(&mut self, label: &str) -> Option<String> {
        let removed = self.entries.remove(label);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// True when there are changes not yet written by [`Store::save`].
    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

fn resolve<'r>(registry: &'r KeyHandlerRegistry, spec: &StageSpec) -> Result<ResolvedStage<'r>, CryptstashError> {
    let cipher = lookup_cipher(&spec.cipher)?;
    let handler = registry.lookup(&spec.key_handler)?;
    let options = OptionValues::validate(handler.options, &spec.options)?;
    Ok(ResolvedStage {
        cipher,
        handler,
        options,
    })
}

/// Ask for one passphrase per stage; `None` past stage 0 reuses the previous one.
fn collect_passphrases(
    provider: &mut impl PassphraseProvider,
    purpose: PassphrasePurpose,
    names: &[(&str, &str)],
) -> Result<Vec<SecretString>, CryptstashError> {
    let mut passphrases: Vec<SecretString> = Vec::with_capacity(names.len());
    for (index, (cipher, key_handler)) in names.iter().enumerate() {
        let request = PassphraseRequest {
            purpose,
            stage: index,
            stages: names.len(),
            cipher,
            key_handler,
            attempt: 0,
        };
        let passphrase = match (provider.passphrase(&request)?, passphrases.last()) {
            (Some(passphrase), _) => passphrase,
            (None, Some(previous)) => previous.clone(),
            (None, None) => {
                return Err(CryptstashError::Passphrase("no passphrase supplied".to_string()));
            }
        };
        passphrases.push(passphrase);
    }
    Ok(passphrases)
}

fn same_secret(a: &SecretString, b: &SecretString) -> bool {
    crypto::constant_time_eq(a.expose_secret().as_bytes(), b.expose_secret().as_bytes())
}
