// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for cryptstash.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported instead of silently ignored.

use std::path::PathBuf;

use cryptstash_core::{OptionValues, StageSpec};
use cryptstash_vault::kdf::{pbkdf2, scrypt};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CryptstashConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Vault file and stage chain settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Defaults for pbkdf2-keyed stages.
    #[serde(default)]
    pub pbkdf2: Pbkdf2Config,

    /// Defaults for scrypt-keyed stages.
    #[serde(default)]
    pub scrypt: ScryptConfig,
}

impl CryptstashConfig {
    /// Option defaults the config supplies for a key handler.
    pub fn option_defaults(&self, key_handler: &str) -> OptionValues {
        match key_handler {
            pbkdf2::NAME => OptionValues::new().with("iterations", self.pbkdf2.iterations.to_string()),
            scrypt::NAME => OptionValues::new()
                .with("time", self.scrypt.max_time_secs.to_string())
                .with("max_log_n", self.scrypt.max_log_n.to_string()),
            _ => OptionValues::new(),
        }
    }

    /// `spec` with any option it leaves out filled from the config.
    pub fn with_defaults(&self, spec: &StageSpec) -> StageSpec {
        StageSpec {
            cipher: spec.cipher.clone(),
            key_handler: spec.key_handler.clone(),
            options: spec.options.overlay(&self.option_defaults(&spec.key_handler)),
        }
    }

    /// The configured stage chain with defaults applied.
    pub fn stage_specs(&self) -> Vec<StageSpec> {
        self.vault.stages.iter().map(|spec| self.with_defaults(spec)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Vault file used when a command is given no path.
    #[serde(default = "default_vault_path")]
    pub default_path: PathBuf,

    /// Stage chain for new vaults, innermost first.
    #[serde(default = "cryptstash_vault::default_stage_specs")]
    pub stages: Vec<StageSpec>,

    /// Ask for a separate passphrase per stage on create and rotate.
    #[serde(default)]
    pub per_stage_passphrases: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            default_path: default_vault_path(),
            stages: cryptstash_vault::default_stage_specs(),
            per_stage_passphrases: false,
        }
    }
}

fn default_vault_path() -> PathBuf {
    PathBuf::from("cryptstash.json")
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Pbkdf2Config {
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

impl Default for Pbkdf2Config {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
        }
    }
}

fn default_iterations() -> u32 {
    pbkdf2::DEFAULT_ITERATIONS
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScryptConfig {
    /// CPU seconds spent deriving each scrypt stage key.
    #[serde(default = "default_max_time_secs")]
    pub max_time_secs: f64,

    /// Ceiling for the scrypt cost exponent; memory use is 2^n KiB.
    #[serde(default = "default_max_log_n")]
    pub max_log_n: u8,
}

impl Default for ScryptConfig {
    fn default() -> Self {
        Self {
            max_time_secs: default_max_time_secs(),
            max_log_n: default_max_log_n(),
        }
    }
}

fn default_max_time_secs() -> f64 {
    1.0
}

fn default_max_log_n() -> u8 {
    18
}
