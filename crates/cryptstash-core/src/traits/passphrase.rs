// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase source trait implemented by front ends.

use secrecy::SecretString;

use crate::error::CryptstashError;
use crate::types::PassphraseRequest;

/// Supplies passphrases on demand. The vault core never prompts directly.
///
/// Returning `Ok(None)` means "no (further) passphrase for this stage":
/// on create and rotate the previous stage's passphrase is reused, on
/// unlock the attempt is abandoned.
pub trait PassphraseProvider {
    fn passphrase(
        &mut self,
        request: &PassphraseRequest<'_>,
    ) -> Result<Option<SecretString>, CryptstashError>;
}

impl<P: PassphraseProvider + ?Sized> PassphraseProvider for &mut P {
    fn passphrase(
        &mut self,
        request: &PassphraseRequest<'_>,
    ) -> Result<Option<SecretString>, CryptstashError> {
        (**self).passphrase(request)
    }
}
