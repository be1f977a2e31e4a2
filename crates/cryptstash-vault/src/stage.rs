// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One layer of the onion: a block cipher keyed by a key handler.

use cryptstash_core::{CryptstashError, KeyHandler};

use crate::cipher::CipherDescriptor;
use crate::crypto;
use crate::format::StageDescriptor;

/// Byte used to pad plaintext up to the block size. The integrity frame's
/// explicit length is what strips it again.
pub const PAD_BYTE: u8 = b' ';

#[derive(Debug)]
pub struct Stage {
    cipher: &'static CipherDescriptor,
    key_handler: Box<dyn KeyHandler>,
}

impl Stage {
    pub fn new(cipher: &'static CipherDescriptor, key_handler: Box<dyn KeyHandler>) -> Self {
        Self { cipher, key_handler }
    }

    pub fn cipher(&self) -> &'static CipherDescriptor {
        self.cipher
    }

    pub fn key_handler(&self) -> &dyn KeyHandler {
        self.key_handler.as_ref()
    }

    pub fn key_handler_mut(&mut self) -> &mut dyn KeyHandler {
        self.key_handler.as_mut()
    }

    /// `iv || CBC(pad(plaintext))` under a fresh random IV.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptstashError> {
        let key = self.key()?;
        let block = self.cipher.block_size;

        let mut padded = plaintext.to_vec();
        let remainder = padded.len() % block;
        if remainder != 0 {
            padded.resize(padded.len() + block - remainder, PAD_BYTE);
        }

        let iv = crypto::random_bytes(block)?;
        let body = self.cipher.cbc_encrypt(key, &iv, &padded)?;
        let mut out = iv;
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Inverse of [`Stage::encrypt`]; the result still carries its padding.
    ///
    /// A body that is not a whole number of blocks ends in padding added by
    /// an outer stage with a larger block; that tail is dropped. Any garbage
    /// it leaves behind lies past the integrity frame's explicit length.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptstashError> {
        let block = self.cipher.block_size;
        if ciphertext.len() < block {
            return Err(CryptstashError::MalformedFile(format!(
                "{} ciphertext of {} bytes is shorter than one block",
                self.cipher.id,
                ciphertext.len()
            )));
        }
        let key = self.key()?;
        let (iv, body) = ciphertext.split_at(block);
        let aligned = body.len() - body.len() % block;
        self.cipher.cbc_decrypt(key, iv, &body[..aligned])
    }

    /// Persistable form of this stage.
    pub fn describe(&self) -> Result<StageDescriptor, CryptstashError> {
        Ok(StageDescriptor {
            cipher: self.cipher.id.to_string(),
            key_handler: self.key_handler.name().to_string(),
            key_data: self.key_handler.store()?,
        })
    }

    fn key(&self) -> Result<&[u8], CryptstashError> {
        self.key_handler.key().ok_or_else(|| {
            CryptstashError::Crypto(format!("stage {} has no derived key", self.cipher.id))
        })
    }
}
