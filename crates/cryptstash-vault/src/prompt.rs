// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase providers: fixed values for programmatic use, and a terminal
//! prompt backed by `rpassword` or the CRYPTSTASH_PASSPHRASE environment variable.

use std::io::IsTerminal;

use cryptstash_core::{CryptstashError, PassphraseProvider, PassphrasePurpose, PassphraseRequest};
use secrecy::{ExposeSecret, SecretString};

/// The environment variable name for providing the vault passphrase.
pub const PASSPHRASE_ENV_VAR: &str = "CRYPTSTASH_PASSPHRASE";

/// Default bound on interactive attempts per stage.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// One passphrase for every stage. Never answers a retry.
#[derive(Debug, Clone)]
pub struct StaticPassphrase(SecretString);

impl StaticPassphrase {
    pub fn new(passphrase: SecretString) -> Self {
        Self(passphrase)
    }
}

impl From<&str> for StaticPassphrase {
    fn from(passphrase: &str) -> Self {
        Self(SecretString::from(passphrase.to_string()))
    }
}

impl PassphraseProvider for StaticPassphrase {
    fn passphrase(
        &mut self,
        request: &PassphraseRequest<'_>,
    ) -> Result<Option<SecretString>, CryptstashError> {
        Ok((request.attempt == 0).then(|| self.0.clone()))
    }
}

/// A distinct passphrase per stage, indexed from the innermost stage.
///
/// Stages past the end of the list get `None`, which reuses the previous
/// stage's passphrase on create and rotate.
#[derive(Debug, Clone)]
pub struct PerStagePassphrases(Vec<SecretString>);

impl PerStagePassphrases {
    pub fn new(passphrases: Vec<SecretString>) -> Self {
        Self(passphrases)
    }
}

impl PassphraseProvider for PerStagePassphrases {
    fn passphrase(
        &mut self,
        request: &PassphraseRequest<'_>,
    ) -> Result<Option<SecretString>, CryptstashError> {
        if request.attempt > 0 {
            return Ok(None);
        }
        Ok(self.0.get(request.stage).cloned())
    }
}

/// Interactive provider for the command-line front end.
///
/// Priority:
/// 1. `CRYPTSTASH_PASSPHRASE` environment variable (headless use)
/// 2. Interactive TTY prompt via `rpassword`, confirmed on create and rotate
#[derive(Debug, Clone)]
pub struct TerminalPrompt {
    per_stage: bool,
    max_attempts: u32,
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new(false)
    }
}

impl TerminalPrompt {
    /// `per_stage` asks for a separate passphrase for every stage on
    /// create and rotate instead of reusing the first.
    pub fn new(per_stage: bool) -> Self {
        Self {
            per_stage,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    fn label(&self, request: &PassphraseRequest<'_>) -> String {
        let noun = match request.purpose {
            PassphrasePurpose::Unlock => "Vault passphrase",
            PassphrasePurpose::Create | PassphrasePurpose::Rotate => "New vault passphrase",
        };
        if request.stages > 1 && (self.per_stage || request.stage > 0) {
            format!(
                "{noun} for stage {} of {} ({}/{})",
                request.stage + 1,
                request.stages,
                request.cipher,
                request.key_handler
            )
        } else {
            noun.to_string()
        }
    }

    fn prompt_tty(&self, request: &PassphraseRequest<'_>) -> Result<Option<SecretString>, CryptstashError> {
        let label = self.label(request);
        let confirm = request.purpose != PassphrasePurpose::Unlock;

        for _ in 0..self.max_attempts {
            eprint!("{label}: ");
            let first = read_password()?;
            if first.expose_secret().is_empty() {
                eprintln!("empty passphrase not allowed");
                continue;
            }
            if confirm {
                eprint!("Confirm {}: ", label.to_lowercase());
                let second = read_password()?;
                if first.expose_secret() != second.expose_secret() {
                    eprintln!("passphrases do not match");
                    continue;
                }
            }
            return Ok(Some(first));
        }
        Err(CryptstashError::Passphrase(format!(
            "no usable passphrase after {} attempts",
            self.max_attempts
        )))
    }
}

impl PassphraseProvider for TerminalPrompt {
    fn passphrase(
        &mut self,
        request: &PassphraseRequest<'_>,
    ) -> Result<Option<SecretString>, CryptstashError> {
        if request.attempt >= self.max_attempts {
            return Ok(None);
        }
        let rekeying = request.purpose != PassphrasePurpose::Unlock;
        if rekeying && request.stage > 0 && !self.per_stage {
            return Ok(None);
        }

        if let Ok(key) = std::env::var(PASSPHRASE_ENV_VAR)
            && !key.is_empty()
        {
            return Ok((request.attempt == 0).then(|| SecretString::from(key)));
        }

        if std::io::stdin().is_terminal() {
            if request.attempt > 0 {
                eprintln!("bad passphrase, try again");
            }
            return self.prompt_tty(request);
        }

        Err(CryptstashError::Passphrase(format!(
            "no passphrase provided; set {PASSPHRASE_ENV_VAR} or run interactively"
        )))
    }
}

fn read_password() -> Result<SecretString, CryptstashError> {
    rpassword::read_password()
        .map(SecretString::from)
        .map_err(|e| CryptstashError::Passphrase(format!("failed to read passphrase: {e}")))
}
