//! Sensitive network-context fields stored encrypted at rest.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A field that may be stored encrypted at rest, with an optional plaintext
/// fallback from older captures.
///
/// The encrypted variant is authoritative when present: it either decrypts or
/// the field falls back to the plaintext value. Ciphertext is never exposed as
/// a resolved value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SealedField {
    pub encrypted: Option<String>,
    pub plaintext: Option<String>,
}

impl SealedField {
    pub fn from_plaintext(value: impl Into<String>) -> Self {
        Self {
            encrypted: None,
            plaintext: Some(value.into()),
        }
    }

    pub fn from_ciphertext(value: impl Into<String>) -> Self {
        Self {
            encrypted: Some(value.into()),
            plaintext: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.encrypted.is_none() && self.plaintext.is_none()
    }

    /// Resolve to a transmittable plaintext value, or `None` when the field
    /// is absent or unrecoverable. Decryption failure degrades data quality,
    /// not delivery, so it is logged and swallowed here.
    pub fn resolve(&self, decryptor: &dyn FieldDecryptor) -> Option<String> {
        if let Some(ciphertext) = &self.encrypted {
            match decryptor.decrypt(ciphertext) {
                Ok(plain) => return Some(plain),
                Err(err) => {
                    warn!(error = %err, "sealed field did not decrypt, using plaintext fallback");
                }
            }
        }
        self.plaintext
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Decryption collaborator for at-rest-encrypted fields. Implementations are
/// expected to be local CPU-bound work; the caller never retries.
pub trait FieldDecryptor: Send + Sync {
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// Base64 transport decoding, used by data roots where fields are sealed for
/// transport but not key-encrypted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Decryptor;

impl FieldDecryptor for Base64Decryptor {
    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let bytes = STANDARD
            .decode(ciphertext.trim())
            .context("sealed field is not valid base64")?;
        String::from_utf8(bytes).context("sealed field did not decode to utf-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    /// Decryptor that always fails, for exercising the fallback path.
    struct Phony;

    impl FieldDecryptor for Phony {
        fn decrypt(&self, _ciphertext: &str) -> Result<String> {
            Err(anyhow!("no key material"))
        }
    }

    #[test]
    fn encrypted_takes_precedence() {
        let field = SealedField {
            encrypted: Some(STANDARD.encode("203.0.113.9")),
            plaintext: Some("198.51.100.1".to_string()),
        };
        assert_eq!(
            field.resolve(&Base64Decryptor),
            Some("203.0.113.9".to_string())
        );
    }

    #[test]
    fn decryption_failure_falls_back_to_plaintext() {
        let field = SealedField {
            encrypted: Some("garbage".to_string()),
            plaintext: Some("Mozilla/5.0".to_string()),
        };
        assert_eq!(field.resolve(&Phony), Some("Mozilla/5.0".to_string()));
    }

    #[test]
    fn decryption_failure_without_fallback_is_absent() {
        let field = SealedField::from_ciphertext("garbage");
        assert_eq!(field.resolve(&Phony), None);
    }

    #[test]
    fn empty_plaintext_is_absent() {
        let field = SealedField::from_plaintext("   ");
        assert_eq!(field.resolve(&Base64Decryptor), None);
    }
}
