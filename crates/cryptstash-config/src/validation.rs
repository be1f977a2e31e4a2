// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization checks that serde cannot express: numeric bounds,
//! known log levels, and a buildable stage chain.

use cryptstash_core::{CryptstashError, OptionValues};
use cryptstash_vault::cipher::{lookup_cipher, CIPHERS};
use cryptstash_vault::kdf::envelope::{MAX_LOG_N, MIN_LOG_N};
use cryptstash_vault::kdf::pbkdf2::{self, Pbkdf2Options};
use cryptstash_vault::kdf::scrypt::{self, ScryptOptions};
use cryptstash_vault::KeyHandlerRegistry;

use crate::diagnostic::ConfigError;
use crate::model::CryptstashConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate everything and report every problem found, not just the first.
pub fn validate_config(config: &CryptstashConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.general.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::Validation {
            key: "general.log_level".to_string(),
            message: format!(
                "`{}` is not one of {}",
                config.general.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.vault.default_path.as_os_str().is_empty() {
        errors.push(ConfigError::Validation {
            key: "vault.default_path".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    if config.pbkdf2.iterations == 0 {
        errors.push(ConfigError::Validation {
            key: "pbkdf2.iterations".to_string(),
            message: "must be at least 1".to_string(),
        });
    }

    let secs = config.scrypt.max_time_secs;
    if !secs.is_finite() || secs < 0.0 {
        errors.push(ConfigError::Validation {
            key: "scrypt.max_time_secs".to_string(),
            message: format!("must be a non-negative number of seconds, got {secs}"),
        });
    }

    if !(MIN_LOG_N..=MAX_LOG_N).contains(&config.scrypt.max_log_n) {
        errors.push(ConfigError::Validation {
            key: "scrypt.max_log_n".to_string(),
            message: format!(
                "must be between {MIN_LOG_N} and {MAX_LOG_N}, got {}",
                config.scrypt.max_log_n
            ),
        });
    }

    if config.vault.stages.is_empty() {
        errors.push(ConfigError::Validation {
            key: "vault.stages".to_string(),
            message: "at least one stage is required".to_string(),
        });
    }

    // Stage options inherit the section defaults checked above; only look
    // at the chain when those are sound so each problem is reported once.
    if errors.is_empty() {
        let registry = KeyHandlerRegistry::builtin();
        for (index, spec) in config.stage_specs().iter().enumerate() {
            if let Err(e) = check_stage(&registry, spec) {
                errors.push(stage_error(&registry, index, &spec.to_string(), &e));
            }
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Check one stage spec the same way vault creation will.
pub fn check_stage(
    registry: &KeyHandlerRegistry,
    spec: &cryptstash_core::StageSpec,
) -> Result<(), CryptstashError> {
    lookup_cipher(&spec.cipher)?;
    let entry = registry.lookup(&spec.key_handler)?;
    let options = OptionValues::validate(entry.options, &spec.options)?;
    match entry.name {
        pbkdf2::NAME => Pbkdf2Options::try_from(&options).map(|_| ()),
        scrypt::NAME => ScryptOptions::try_from(&options).map(|_| ()),
        _ => Ok(()),
    }
}

fn stage_error(registry: &KeyHandlerRegistry, index: usize, spec: &str, e: &CryptstashError) -> ConfigError {
    ConfigError::InvalidStage {
        index,
        spec: spec.to_string(),
        message: e.to_string(),
        ciphers: CIPHERS.iter().map(|c| c.id).collect::<Vec<_>>().join(", "),
        handlers: registry.names().collect::<Vec<_>>().join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptstash_core::StageSpec;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&CryptstashConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = CryptstashConfig::default();
        config.general.log_level = "loud".to_string();
        config.pbkdf2.iterations = 0;
        config.scrypt.max_time_secs = -1.0;
        config.scrypt.max_log_n = 30;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn empty_stage_list_is_rejected() {
        let mut config = CryptstashConfig::default();
        config.vault.stages.clear();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("vault.stages"));
    }

    #[test]
    fn bad_stages_are_reported_by_index() {
        let mut config = CryptstashConfig::default();
        config.vault.stages = vec![
            StageSpec::new("des", "pbkdf2"),
            StageSpec::new("aes", "pbkdf2"),
            StageSpec::new("aes", "argon2"),
            StageSpec::new("aes", "pbkdf2").with_option("iterations", "-5"),
            StageSpec::new("aes", "scrypt").with_option("max_log_n", "99"),
        ];
        let errors = validate_config(&config).unwrap_err();
        let indices: Vec<usize> = errors
            .iter()
            .map(|e| match e {
                ConfigError::InvalidStage { index, .. } => *index,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(indices, vec![0, 2, 3, 4]);
    }
}
