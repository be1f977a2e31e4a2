// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for cryptstash.
//!
//! TOML files from the system, user and working directories are layered
//! under `CRYPTSTASH_*` environment overrides, checked for unknown keys and
//! semantic errors, and reported as miette diagnostics.
//!
//! ```no_run
//! let config = cryptstash_config::load_and_validate(None).expect("config errors");
//! println!("default vault: {}", config.vault.default_path.display());
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_str};
pub use model::CryptstashConfig;

/// Load from `explicit` (or the standard hierarchy) and validate.
pub fn load_and_validate(explicit: Option<&Path>) -> Result<CryptstashConfig, Vec<ConfigError>> {
    match loader::load_config(explicit) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &read_sources(explicit))),
    }
}

/// Load a single TOML document over the defaults and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<CryptstashConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = [("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Contents of the config files that exist, keyed by the path string
/// figment reports in error metadata.
fn read_sources(explicit: Option<&Path>) -> Vec<(String, String)> {
    loader::source_paths(explicit)
        .into_iter()
        .filter_map(|path| {
            let absolute = std::path::absolute(&path).unwrap_or(path);
            let content = std::fs::read_to_string(&absolute).ok()?;
            Some((absolute.display().to_string(), content))
        })
        .collect()
}
