//! Cipher trait and errors

use thiserror::Error;

/// Marker prefix of encrypted raw values
pub const CIPHER_PREFIX: &str = "{cipher}";

/// Errors that can occur during encryption or decryption
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("No encryption key configured")]
    NoKey,

    #[error("Encryption failed: {0}")]
    Encrypt(String),

    #[error("Decryption failed: {0}")]
    Decrypt(String),

    #[error("Invalid ciphertext encoding: {0}")]
    Encoding(String),
}

pub type CipherResult<T> = Result<T, CipherError>;

/// Reversible transform for `{cipher}`-prefixed values
///
/// `encrypt` returns the tagged form, ready to paste into a property file.
/// `decrypt` accepts either the tagged form or the bare payload, so
/// `decrypt(encrypt(x)) == x` always holds.
pub trait Cipher: Send + Sync {
    /// Human-readable name of this cipher
    fn name(&self) -> &str;

    /// Whether a key is configured
    fn is_available(&self) -> bool {
        true
    }

    /// Encrypt plaintext into a `{cipher}`-tagged string
    fn encrypt(&self, plaintext: &str) -> CipherResult<String>;

    /// Decrypt a tagged string or bare payload
    fn decrypt(&self, ciphertext: &str) -> CipherResult<String>;
}

/// Strip the `{cipher}` tag if present
pub fn strip_tag(value: &str) -> &str {
    value.strip_prefix(CIPHER_PREFIX).unwrap_or(value)
}

/// Check whether a raw value carries the `{cipher}` tag
pub fn is_tagged(value: &str) -> bool {
    value.starts_with(CIPHER_PREFIX)
}

/// Cipher used when no key is configured: every operation fails with `NoKey`
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCipher;

impl Cipher for DisabledCipher {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn encrypt(&self, _plaintext: &str) -> CipherResult<String> {
        Err(CipherError::NoKey)
    }

    fn decrypt(&self, _ciphertext: &str) -> CipherResult<String> {
        Err(CipherError::NoKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tag() {
        assert_eq!(strip_tag("{cipher}abc"), "abc");
        assert_eq!(strip_tag("abc"), "abc");
        assert!(is_tagged("{cipher}abc"));
        assert!(!is_tagged("cipher}abc"));
    }

    #[test]
    fn test_disabled_cipher() {
        let cipher = DisabledCipher;
        assert!(!cipher.is_available());
        assert_eq!(cipher.encrypt("x"), Err(CipherError::NoKey));
        assert_eq!(cipher.decrypt("{cipher}x"), Err(CipherError::NoKey));
    }
}
