// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config errors as miette diagnostics.
//!
//! Figment errors are translated into [`ConfigError`]s that point into the
//! offending TOML file and, for misspelled keys, suggest the closest valid
//! key by Jaro-Winkler similarity.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a known key needs before it is offered as a fix.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(cryptstash::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Comma-separated keys accepted in the same table.
        valid_keys: String,
        #[label("not a cryptstash setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(cryptstash::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(cryptstash::config::missing_key),
        help("add `{key} = <value>` to cryptstash.toml")
    )]
    MissingKey { key: String },

    /// A value parsed but is out of range or otherwise unusable.
    #[error("invalid value for `{key}`: {message}")]
    #[diagnostic(code(cryptstash::config::validation))]
    Validation { key: String, message: String },

    /// One entry of `vault.stages` cannot be built.
    #[error("vault.stages[{index}] (`{spec}`): {message}")]
    #[diagnostic(
        code(cryptstash::config::stage),
        help("ciphers: {ciphers}; key handlers: {handlers}")
    )]
    InvalidStage {
        index: usize,
        spec: String,
        message: String,
        ciphers: String,
        handlers: String,
    },

    #[error("configuration error: {0}")]
    #[diagnostic(code(cryptstash::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Translate every error carried by a `figment::Error`.
///
/// `sources` pairs file paths with their contents so unknown keys can be
/// underlined in place.
pub fn figment_to_config_errors(err: figment::Error, sources: &[(String, String)]) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let dotted = || {
                error
                    .path
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(".")
            };
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = locate(&error, field, sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: field.to_string(),
                },
                Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                    key: dotted(),
                    detail: format!("found {actual}"),
                    expected: expected.clone(),
                },
                Kind::InvalidValue(actual, expected) => ConfigError::Validation {
                    key: dotted(),
                    message: format!("found {actual}, expected {expected}"),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn locate(
    error: &figment::Error,
    field: &str,
    sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => Some("<inline>".to_string()),
        });
    let Some((path, content)) = origin.and_then(|origin| sources.iter().find(|(p, _)| *p == origin)) else {
        return (None, None);
    };

    let table = error.path.first().map(String::as_str);
    match find_key_offset(content, table, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` as a key inside `[table]` (or at top level).
pub fn find_key_offset(content: &str, table: Option<&str>, field: &str) -> Option<usize> {
    let start = match table {
        Some(table) => {
            let header = format!("[{table}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') && table.is_some() && offset != start {
            break;
        }
        if let Some(rest) = trimmed.strip_prefix(field)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Closest valid key above the similarity threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print each error with miette's graphical handler on stderr.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_keys() {
        let valid = &["iterations"];
        assert_eq!(suggest_key("iteratons", valid), Some("iterations".to_string()));
        let valid = &["default_path", "stages", "per_stage_passphrases"];
        assert_eq!(suggest_key("default_pth", valid), Some("default_path".to_string()));
    }

    #[test]
    fn no_suggestion_for_unrelated_key() {
        assert_eq!(suggest_key("zzzz", &["log_level"]), None);
    }

    #[test]
    fn finds_key_inside_table() {
        let content = "[general]\nlog_level = \"info\"\n\n[pbkdf2]\niteratons = 5\n";
        let offset = find_key_offset(content, Some("pbkdf2"), "iteratons").unwrap();
        assert_eq!(&content[offset..offset + 9], "iteratons");
    }

    #[test]
    fn does_not_search_past_the_table() {
        let content = "[general]\nlog_level = \"info\"\n[vault]\ncolor = 1\n";
        assert_eq!(find_key_offset(content, Some("general"), "color"), None);
        assert!(find_key_offset(content, Some("vault"), "color").is_some());
    }

    #[test]
    fn stage_error_lists_choices() {
        let err = ConfigError::InvalidStage {
            index: 1,
            spec: "des:pbkdf2".to_string(),
            message: "unknown cipher `des`".to_string(),
            ciphers: "aes, blowfish".to_string(),
            handlers: "pbkdf2, scrypt".to_string(),
        };
        assert_eq!(err.to_string(), "vault.stages[1] (`des:pbkdf2`): unknown cipher `des`");
        let help = err.help().unwrap().to_string();
        assert!(help.contains("aes, blowfish"));
    }
}
