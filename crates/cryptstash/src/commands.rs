// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot subcommands: each opens the vault, does one thing and exits.

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

use cryptstash_config::CryptstashConfig;
use cryptstash_core::{CryptstashError, StageSpec};
use cryptstash_vault::{Store, TerminalPrompt};
use thiserror::Error;
use tracing::debug;

/// Failures of the front end on top of the vault's own errors.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Vault(#[from] CryptstashError),

    #[error("no entry labelled `{0}`")]
    NoSuchLabel(String),

    #[error("{} already exists; refusing to overwrite it", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to read {what}: {source}")]
    Input {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("line editor: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

fn prompt(config: &CryptstashConfig) -> TerminalPrompt {
    TerminalPrompt::new(config.vault.per_stage_passphrases)
}

fn open(config: &CryptstashConfig, path: &Path) -> Result<Store, CommandError> {
    Ok(Store::load(path, prompt(config))?)
}

/// Stage specs for a new vault: the command line wins over the config, and
/// either way the configured handler defaults fill missing options.
pub fn stage_specs(config: &CryptstashConfig, requested: &[StageSpec]) -> Vec<StageSpec> {
    if requested.is_empty() {
        config.stage_specs()
    } else {
        requested.iter().map(|spec| config.with_defaults(spec)).collect()
    }
}

pub fn init(config: &CryptstashConfig, path: &Path, requested: &[StageSpec]) -> Result<(), CommandError> {
    if path.exists() {
        return Err(CommandError::AlreadyExists(path.to_path_buf()));
    }
    let specs = stage_specs(config, requested);
    let mut store = Store::create(&specs, prompt(config))?;
    store.save(path)?;
    eprintln!("created {} ({} stages)", path.display(), specs.len());
    Ok(())
}

pub fn list(config: &CryptstashConfig, path: &Path) -> Result<(), CommandError> {
    let store = open(config, path)?;
    for label in store.labels() {
        println!("{label}");
    }
    Ok(())
}

pub fn get(config: &CryptstashConfig, path: &Path, label: &str) -> Result<(), CommandError> {
    let store = open(config, path)?;
    let value = store
        .get(label)
        .ok_or_else(|| CommandError::NoSuchLabel(label.to_string()))?;
    println!("{value}");
    Ok(())
}

/// The vault is unlocked before stdin is read, so an interactive passphrase
/// prompt never competes with the value for input.
pub fn set(config: &CryptstashConfig, path: &Path, label: &str) -> Result<(), CommandError> {
    let mut store = open(config, path)?;

    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprintln!("value for `{label}` (end with Ctrl-D):");
    }
    let mut value = String::new();
    stdin
        .lock()
        .read_to_string(&mut value)
        .map_err(|source| CommandError::Input { what: "value", source })?;

    let replaced = store.set(label, value.trim()).is_some();
    debug!(replaced, "entry stored");
    store.save(path)?;
    Ok(())
}

pub fn remove(config: &CryptstashConfig, path: &Path, label: &str) -> Result<(), CommandError> {
    let mut store = open(config, path)?;
    if store.remove(label).is_none() {
        return Err(CommandError::NoSuchLabel(label.to_string()));
    }
    store.save(path)?;
    Ok(())
}

pub fn passwd(config: &CryptstashConfig, path: &Path) -> Result<(), CommandError> {
    let mut store = open(config, path)?;
    store.change_passphrases(prompt(config))?;
    store.save(path)?;
    eprintln!("passphrase changed");
    Ok(())
}

pub fn print_config(config: &CryptstashConfig) -> Result<(), CommandError> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
