// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk vault document.
//!
//! ```json
//! {
//!     "stages": [
//!         { "cipher": "aes", "key_handler": "pbkdf2", "key_data": { ... } }
//!     ],
//!     "ciphertext": "<base64>"
//! }
//! ```
//!
//! Stage 0 is the innermost layer.

use std::io::Write;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use cryptstash_core::CryptstashError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Persisted description of one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    pub cipher: String,
    pub key_handler: String,
    pub key_data: serde_json::Value,
}

/// The complete persisted vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultFile {
    pub stages: Vec<StageDescriptor>,
    pub ciphertext: String,
}

impl VaultFile {
    pub fn new(stages: Vec<StageDescriptor>, ciphertext: &[u8]) -> Self {
        Self {
            stages,
            ciphertext: STANDARD.encode(ciphertext),
        }
    }

    /// Parse a vault document. Any structural problem is `MalformedFile`.
    pub fn parse(text: &str) -> Result<Self, CryptstashError> {
        let file: VaultFile = serde_json::from_str(text)
            .map_err(|e| CryptstashError::MalformedFile(e.to_string()))?;
        if file.stages.is_empty() {
            return Err(CryptstashError::MalformedFile("vault has no stages".to_string()));
        }
        Ok(file)
    }

    /// Pretty JSON, four-space indent, trailing newline.
    pub fn to_json(&self) -> Result<String, CryptstashError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)
            .map_err(|e| CryptstashError::Internal(format!("failed to encode vault: {e}")))?;
        buf.push(b'\n');
        String::from_utf8(buf).map_err(|e| CryptstashError::Internal(e.to_string()))
    }

    /// Decoded final ciphertext.
    pub fn ciphertext_bytes(&self) -> Result<Vec<u8>, CryptstashError> {
        STANDARD
            .decode(self.ciphertext.trim())
            .map_err(|e| CryptstashError::MalformedFile(format!("ciphertext is not base64: {e}")))
    }

    pub fn read(path: &Path) -> Result<Self, CryptstashError> {
        let text = std::fs::read_to_string(path).map_err(|e| CryptstashError::io(path, e))?;
        Self::parse(&text)
    }

    /// Write atomically: a temporary file in the target directory is
    /// renamed over `path` once fully written.
    pub fn write(&self, path: &Path) -> Result<(), CryptstashError> {
        let json = self.to_json()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| CryptstashError::io(dir, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| CryptstashError::io(tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| CryptstashError::io(path, e.error))?;
        debug!(path = %path.display(), bytes = json.len(), "vault file written");
        Ok(())
    }
}
