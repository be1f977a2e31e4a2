// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Block-cipher table and raw CBC operations.
//!
//! Ciphers are addressed by the stable id persisted in the vault file. CBC
//! runs without library padding: callers hand in whole blocks and own the
//! padding policy.

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cryptstash_core::CryptstashError;

type AesCbcEnc = cbc::Encryptor<aes::Aes256>;
type AesCbcDec = cbc::Decryptor<aes::Aes256>;
type BlowfishCbcEnc = cbc::Encryptor<blowfish::Blowfish>;
type BlowfishCbcDec = cbc::Decryptor<blowfish::Blowfish>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CipherKind {
    Aes,
    Blowfish,
}

/// A keyed, fixed-block-size cipher known to the vault.
#[derive(Debug, PartialEq, Eq)]
pub struct CipherDescriptor {
    /// Stable id written to the vault file.
    pub id: &'static str,
    pub description: &'static str,
    pub block_size: usize,
    /// Key length requested from the stage's key handler.
    pub key_size: usize,
    kind: CipherKind,
}

/// Every cipher a stage may use, in the order offered at creation time.
pub static CIPHERS: &[CipherDescriptor] = &[
    CipherDescriptor {
        id: "aes",
        description: "AES-256 in CBC mode",
        block_size: 16,
        key_size: 32,
        kind: CipherKind::Aes,
    },
    CipherDescriptor {
        id: "blowfish",
        description: "Blowfish with a 448-bit key in CBC mode",
        block_size: 8,
        key_size: 56,
        kind: CipherKind::Blowfish,
    },
];

/// Look up a cipher by its persisted id.
pub fn lookup_cipher(id: &str) -> Result<&'static CipherDescriptor, CryptstashError> {
    CIPHERS
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| CryptstashError::unknown_cipher(id))
}

impl CipherDescriptor {
    /// CBC-encrypt whole blocks.
    pub fn cbc_encrypt(&self, key: &[u8], iv: &[u8], blocks: &[u8]) -> Result<Vec<u8>, CryptstashError> {
        self.check_blocks(blocks)?;
        let out = match self.kind {
            CipherKind::Aes => AesCbcEnc::new_from_slices(key, iv)
                .map_err(|e| self.key_error(e))?
                .encrypt_padded_vec_mut::<NoPadding>(blocks),
            CipherKind::Blowfish => BlowfishCbcEnc::new_from_slices(key, iv)
                .map_err(|e| self.key_error(e))?
                .encrypt_padded_vec_mut::<NoPadding>(blocks),
        };
        Ok(out)
    }

    /// CBC-decrypt whole blocks.
    pub fn cbc_decrypt(&self, key: &[u8], iv: &[u8], blocks: &[u8]) -> Result<Vec<u8>, CryptstashError> {
        self.check_blocks(blocks)?;
        let out = match self.kind {
            CipherKind::Aes => AesCbcDec::new_from_slices(key, iv)
                .map_err(|e| self.key_error(e))?
                .decrypt_padded_vec_mut::<NoPadding>(blocks),
            CipherKind::Blowfish => BlowfishCbcDec::new_from_slices(key, iv)
                .map_err(|e| self.key_error(e))?
                .decrypt_padded_vec_mut::<NoPadding>(blocks),
        };
        out.map_err(|_| {
            CryptstashError::MalformedFile(format!("{} ciphertext is not block aligned", self.id))
        })
    }

    fn check_blocks(&self, blocks: &[u8]) -> Result<(), CryptstashError> {
        if blocks.len() % self.block_size != 0 {
            return Err(CryptstashError::MalformedFile(format!(
                "{} data length {} is not a multiple of the {}-byte block size",
                self.id,
                blocks.len(),
                self.block_size
            )));
        }
        Ok(())
    }

    fn key_error(&self, e: impl std::fmt::Display) -> CryptstashError {
        CryptstashError::Crypto(format!("invalid {} key or IV: {e}", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_both_ciphers() {
        assert_eq!(lookup_cipher("aes").unwrap().block_size, 16);
        assert_eq!(lookup_cipher("aes").unwrap().key_size, 32);
        assert_eq!(lookup_cipher("blowfish").unwrap().block_size, 8);
        assert_eq!(lookup_cipher("blowfish").unwrap().key_size, 56);
    }

    #[test]
    fn lookup_rejects_unknown_cipher() {
        let err = lookup_cipher("des").unwrap_err();
        assert!(matches!(err, CryptstashError::UnknownVariant { kind: "cipher", .. }));
    }

    #[test]
    fn cbc_roundtrip_for_every_cipher() {
        for cipher in CIPHERS {
            let key = vec![7u8; cipher.key_size];
            let iv = vec![9u8; cipher.block_size];
            let plaintext = vec![0x41u8; cipher.block_size * 3];

            let ct = cipher.cbc_encrypt(&key, &iv, &plaintext).unwrap();
            assert_eq!(ct.len(), plaintext.len());
            assert_ne!(ct, plaintext);
            assert_eq!(cipher.cbc_decrypt(&key, &iv, &ct).unwrap(), plaintext);
        }
    }

    #[test]
    fn cbc_chains_identical_blocks() {
        let cipher = lookup_cipher("aes").unwrap();
        let ct = cipher
            .cbc_encrypt(&[1u8; 32], &[0u8; 16], &[0u8; 32])
            .unwrap();
        assert_ne!(ct[..16], ct[16..]);
    }

    #[test]
    fn unaligned_input_is_rejected() {
        let cipher = lookup_cipher("blowfish").unwrap();
        let err = cipher.cbc_decrypt(&[1u8; 56], &[0u8; 8], &[0u8; 12]).unwrap_err();
        assert!(matches!(err, CryptstashError::MalformedFile(_)));
    }

    #[test]
    fn wrong_key_length_is_a_crypto_error() {
        let cipher = lookup_cipher("aes").unwrap();
        let err = cipher.cbc_encrypt(&[1u8; 5], &[0u8; 16], &[0u8; 16]).unwrap_err();
        assert!(matches!(err, CryptstashError::Crypto(_)));
    }
}
