// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered loading with Figment.
//!
//! Later layers win: compiled defaults, `/etc/cryptstash/cryptstash.toml`,
//! `$XDG_CONFIG_HOME/cryptstash/cryptstash.toml`, `./cryptstash.toml`, then
//! `CRYPTSTASH_*` environment variables. An explicit path replaces the three
//! file layers.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use tracing::debug;

use crate::model::CryptstashConfig;

pub const ENV_PREFIX: &str = "CRYPTSTASH_";
pub const SYSTEM_CONFIG: &str = "/etc/cryptstash/cryptstash.toml";
pub const LOCAL_CONFIG: &str = "cryptstash.toml";

/// Config files consulted when no explicit path is given, lowest priority first.
pub fn hierarchy_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("cryptstash").join("cryptstash.toml"));
    }
    paths.push(PathBuf::from(LOCAL_CONFIG));
    paths
}

/// The files that will actually be read for `explicit`.
pub fn source_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => hierarchy_paths(),
    }
}

/// Build the layered Figment before extraction.
pub fn build_figment(explicit: Option<&Path>) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(CryptstashConfig::default()));
    for path in source_paths(explicit) {
        debug!(path = %path.display(), exists = path.exists(), "config layer");
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

pub fn load_config(explicit: Option<&Path>) -> Result<CryptstashConfig, figment::Error> {
    build_figment(explicit).extract()
}

/// Defaults plus one TOML document; no files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<CryptstashConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CryptstashConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Environment overrides with an explicit section map, so that
/// `CRYPTSTASH_VAULT_DEFAULT_PATH` lands on `vault.default_path` rather than
/// `vault.default.path`. `CRYPTSTASH_PASSPHRASE` belongs to the prompt and
/// is never read as configuration.
///
/// Keys reach the map with the case they had in the environment, so they are
/// lowercased before the section prefixes are matched.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).ignore(&["passphrase"]).map(|key| {
        key.as_str()
            .to_ascii_lowercase()
            .replacen("general_", "general.", 1)
            .replacen("vault_", "vault.", 1)
            .replacen("pbkdf2_", "pbkdf2.", 1)
            .replacen("scrypt_", "scrypt.", 1)
            .into()
    })
}
