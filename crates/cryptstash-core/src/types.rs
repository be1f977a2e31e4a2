// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Option descriptors, stage specifications and passphrase requests.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::CryptstashError;

/// Declarative description of one key-handler option.
///
/// Front ends use [`OptionSpec::check`] to re-prompt on bad input before a
/// value ever reaches a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    /// Option name as it appears in stage specs and config.
    pub name: &'static str,
    /// One-line help text shown when prompting.
    pub help: &'static str,
    /// Regex the whole value must match, if any.
    pub pattern: Option<&'static str>,
    /// Value used when the option is not supplied.
    pub default: Option<&'static str>,
}

impl OptionSpec {
    /// Check a raw value against this option's pattern.
    pub fn check(&self, value: &str) -> Result<(), CryptstashError> {
        let Some(pattern) = self.pattern else {
            return Ok(());
        };
        let anchored = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            CryptstashError::Internal(format!("invalid pattern for option `{}`: {e}", self.name))
        })?;
        if anchored.is_match(value) {
            Ok(())
        } else {
            Err(CryptstashError::InvalidOption {
                name: self.name.to_string(),
                reason: format!("`{value}` does not match `{pattern}`"),
            })
        }
    }
}

/// Named option values for a key handler, keyed by option name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionValues(BTreeMap<String, String>);

impl OptionValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn raw(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `self` on top of `base`; values in `self` win.
    pub fn overlay(&self, base: &OptionValues) -> OptionValues {
        let mut merged = base.clone();
        for (name, value) in &self.0 {
            merged.0.insert(name.clone(), value.clone());
        }
        merged
    }

    /// Validate raw values against a handler's option table.
    ///
    /// Unknown names and pattern mismatches are rejected. Options that are
    /// absent take their declared default; an absent option without a
    /// default is an error.
    pub fn validate(specs: &[OptionSpec], raw: &OptionValues) -> Result<OptionValues, CryptstashError> {
        for name in raw.0.keys() {
            if !specs.iter().any(|spec| spec.name == name) {
                let known: Vec<&str> = specs.iter().map(|s| s.name).collect();
                return Err(CryptstashError::InvalidOption {
                    name: name.clone(),
                    reason: if known.is_empty() {
                        "this key handler takes no options".to_string()
                    } else {
                        format!("expected one of: {}", known.join(", "))
                    },
                });
            }
        }

        let mut validated = OptionValues::new();
        for spec in specs {
            let value = match (raw.raw(spec.name), spec.default) {
                (Some(value), _) => value,
                (None, Some(default)) => default,
                (None, None) => {
                    return Err(CryptstashError::InvalidOption {
                        name: spec.name.to_string(),
                        reason: "a value is required".to_string(),
                    });
                }
            };
            spec.check(value)?;
            validated.insert(spec.name, value);
        }
        Ok(validated)
    }

    /// Convert a validated value to its typed form.
    pub fn get<T>(&self, name: &str) -> Result<T, CryptstashError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.raw(name).ok_or_else(|| CryptstashError::InvalidOption {
            name: name.to_string(),
            reason: "a value is required".to_string(),
        })?;
        raw.parse::<T>().map_err(|e| CryptstashError::InvalidOption {
            name: name.to_string(),
            reason: format!("`{raw}`: {e}"),
        })
    }
}

/// One requested stage: which cipher, which key handler, which options.
///
/// The compact text form is `cipher:handler[:name=value,...]`, for example
/// `aes:pbkdf2:iterations=50000`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageSpec {
    pub cipher: String,
    pub key_handler: String,
    #[serde(default)]
    pub options: OptionValues,
}

impl StageSpec {
    pub fn new(cipher: impl Into<String>, key_handler: impl Into<String>) -> Self {
        Self {
            cipher: cipher.into(),
            key_handler: key_handler.into(),
            options: OptionValues::new(),
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name, value);
        self
    }
}

impl FromStr for StageSpec {
    type Err = CryptstashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let cipher = parts.next().unwrap_or_default().trim();
        let key_handler = parts.next().unwrap_or_default().trim();
        if cipher.is_empty() || key_handler.is_empty() {
            return Err(CryptstashError::Config(format!(
                "stage `{s}` must look like cipher:key_handler[:name=value,...]"
            )));
        }

        let mut spec = StageSpec::new(cipher, key_handler);
        if let Some(options) = parts.next() {
            for pair in options.split(',').filter(|p| !p.trim().is_empty()) {
                let (name, value) = pair.split_once('=').ok_or_else(|| {
                    CryptstashError::Config(format!("stage option `{pair}` must look like name=value"))
                })?;
                spec.options.insert(name.trim(), value.trim());
            }
        }
        Ok(spec)
    }
}

impl fmt::Display for StageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.cipher, self.key_handler)?;
        let mut first = true;
        for (name, value) in self.options.iter() {
            f.write_str(if first { ":" } else { "," })?;
            write!(f, "{name}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Why a passphrase is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PassphrasePurpose {
    /// A new vault is being created.
    Create,
    /// An existing vault is being opened.
    Unlock,
    /// The passphrase of an open vault is being changed.
    Rotate,
}

/// Context handed to a passphrase provider for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassphraseRequest<'a> {
    pub purpose: PassphrasePurpose,
    /// Zero-based stage index (0 is innermost).
    pub stage: usize,
    /// Total number of stages.
    pub stages: usize,
    pub cipher: &'a str,
    pub key_handler: &'a str,
    /// Failed attempts so far for this stage.
    pub attempt: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[OptionSpec] = &[
        OptionSpec {
            name: "iterations",
            help: "rounds",
            pattern: Some("[1-9][0-9]*"),
            default: Some("20000"),
        },
        OptionSpec {
            name: "label",
            help: "free text",
            pattern: None,
            default: None,
        },
    ];

    #[test]
    fn validate_fills_defaults() {
        let raw = OptionValues::new().with("label", "x");
        let validated = OptionValues::validate(SPECS, &raw).unwrap();
        assert_eq!(validated.raw("iterations"), Some("20000"));
        assert_eq!(validated.raw("label"), Some("x"));
    }

    #[test]
    fn validate_rejects_pattern_mismatch() {
        let raw = OptionValues::new().with("iterations", "0").with("label", "x");
        let err = OptionValues::validate(SPECS, &raw).unwrap_err();
        assert!(matches!(err, CryptstashError::InvalidOption { ref name, .. } if name == "iterations"));
    }

    #[test]
    fn pattern_must_match_whole_value() {
        let spec = SPECS[0];
        assert!(spec.check("123").is_ok());
        assert!(spec.check("123abc").is_err());
        assert!(spec.check("abc123").is_err());
    }

    #[test]
    fn validate_rejects_unknown_option() {
        let raw = OptionValues::new().with("itrations", "5").with("label", "x");
        let err = OptionValues::validate(SPECS, &raw).unwrap_err();
        assert!(err.to_string().contains("itrations"));
    }

    #[test]
    fn validate_requires_options_without_default() {
        let err = OptionValues::validate(SPECS, &OptionValues::new()).unwrap_err();
        assert!(matches!(err, CryptstashError::InvalidOption { ref name, .. } if name == "label"));
    }

    #[test]
    fn get_converts_typed_values() {
        let values = OptionValues::new().with("iterations", "42").with("time", "1.5");
        assert_eq!(values.get::<u32>("iterations").unwrap(), 42);
        assert_eq!(values.get::<f64>("time").unwrap(), 1.5);
        assert!(values.get::<u32>("time").is_err());
        assert!(values.get::<u32>("missing").is_err());
    }

    #[test]
    fn overlay_prefers_own_values() {
        let base = OptionValues::new().with("a", "1").with("b", "2");
        let merged = OptionValues::new().with("b", "3").overlay(&base);
        assert_eq!(merged.raw("a"), Some("1"));
        assert_eq!(merged.raw("b"), Some("3"));
    }

    #[test]
    fn stage_spec_parses_compact_form() {
        let spec: StageSpec = "aes:pbkdf2:iterations=50000".parse().unwrap();
        assert_eq!(spec.cipher, "aes");
        assert_eq!(spec.key_handler, "pbkdf2");
        assert_eq!(spec.options.raw("iterations"), Some("50000"));
        assert_eq!(spec.to_string(), "aes:pbkdf2:iterations=50000");

        let bare: StageSpec = "blowfish:scrypt".parse().unwrap();
        assert!(bare.options.is_empty());
        assert_eq!(bare.to_string(), "blowfish:scrypt");
    }

    #[test]
    fn stage_spec_rejects_incomplete_forms() {
        assert!("aes".parse::<StageSpec>().is_err());
        assert!(":pbkdf2".parse::<StageSpec>().is_err());
        assert!("aes:pbkdf2:iterations".parse::<StageSpec>().is_err());
    }

    #[test]
    fn passphrase_purpose_displays_lowercase() {
        assert_eq!(PassphrasePurpose::Unlock.to_string(), "unlock");
        assert_eq!(PassphrasePurpose::Rotate.to_string(), "rotate");
    }
}
