//! AES-256-GCM cipher
//!
//! Payload layout: base64(nonce || ciphertext+tag), standard alphabet with
//! padding. The 256-bit key is the SHA-256 digest of the configured
//! passphrase.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::traits::{strip_tag, Cipher, CipherError, CipherResult, CIPHER_PREFIX};

/// Size of the derived key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes
const TAG_SIZE: usize = 16;

/// Symmetric cipher for `{cipher}` values
///
/// # Example
///
/// ```
/// use confseal_core::cipher::{AesGcmCipher, Cipher};
///
/// let cipher = AesGcmCipher::from_passphrase("correct horse battery staple").unwrap();
/// let tagged = cipher.encrypt("secret123").unwrap();
/// assert!(tagged.starts_with("{cipher}"));
/// assert_eq!(cipher.decrypt(&tagged).unwrap(), "secret123");
/// ```
pub struct AesGcmCipher {
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl AesGcmCipher {
    /// Derive the key from a passphrase
    ///
    /// An empty passphrase is treated as no key at all.
    pub fn from_passphrase(passphrase: &str) -> CipherResult<Self> {
        if passphrase.is_empty() {
            return Err(CipherError::NoKey);
        }
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        key.copy_from_slice(&digest);
        Ok(Self { key })
    }

    /// Use a raw 256-bit key
    pub fn from_key(key: [u8; KEY_SIZE]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    fn aead(&self) -> Aes256Gcm {
        let key = Key::<Aes256Gcm>::from_slice(self.key.as_slice());
        Aes256Gcm::new(key)
    }
}

impl Cipher for AesGcmCipher {
    fn name(&self) -> &str {
        "aes-256-gcm"
    }

    fn encrypt(&self, plaintext: &str) -> CipherResult<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .aead()
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CipherError::Encrypt(e.to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);

        Ok(format!("{}{}", CIPHER_PREFIX, STANDARD.encode(payload)))
    }

    fn decrypt(&self, ciphertext: &str) -> CipherResult<String> {
        let payload = STANDARD
            .decode(strip_tag(ciphertext).trim())
            .map_err(|e| CipherError::Encoding(e.to_string()))?;

        if payload.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CipherError::Decrypt("payload too short".to_string()));
        }

        let (nonce_bytes, sealed) = payload.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = Zeroizing::new(
            self.aead()
                .decrypt(nonce, sealed)
                .map_err(|_| CipherError::Decrypt("authentication failed (wrong key or corrupt data)".to_string()))?,
        );

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| CipherError::Decrypt("plaintext is not valid UTF-8".to_string()))
    }
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCipher").field("key", &"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cipher() -> AesGcmCipher {
        AesGcmCipher::from_passphrase("test-passphrase").unwrap()
    }

    #[test]
    fn test_roundtrip_tagged_and_bare() {
        let cipher = cipher();
        let tagged = cipher.encrypt("secret123").unwrap();

        assert!(tagged.starts_with(CIPHER_PREFIX));
        assert_eq!(cipher.decrypt(&tagged).unwrap(), "secret123");
        assert_eq!(cipher.decrypt(strip_tag(&tagged)).unwrap(), "secret123");
    }

    #[test]
    fn test_empty_passphrase_is_no_key() {
        assert!(matches!(AesGcmCipher::from_passphrase(""), Err(CipherError::NoKey)));
    }

    #[test]
    fn test_same_passphrase_same_key() {
        let a = AesGcmCipher::from_passphrase("shared").unwrap();
        let b = AesGcmCipher::from_passphrase("shared").unwrap();

        let tagged = a.encrypt("value").unwrap();
        assert_eq!(b.decrypt(&tagged).unwrap(), "value");
    }

    #[test]
    fn test_wrong_key_fails() {
        let tagged = cipher().encrypt("value").unwrap();
        let other = AesGcmCipher::from_passphrase("other").unwrap();

        assert!(matches!(other.decrypt(&tagged), Err(CipherError::Decrypt(_))));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let cipher = cipher();
        let tagged = cipher.encrypt("value").unwrap();
        let mut payload = STANDARD.decode(strip_tag(&tagged)).unwrap();
        let last = payload.len() - 1;
        payload[last] ^= 0xFF;

        let tampered = STANDARD.encode(payload);
        assert!(matches!(cipher.decrypt(&tampered), Err(CipherError::Decrypt(_))));
    }

    #[test]
    fn test_garbage_payloads() {
        let cipher = cipher();
        assert!(matches!(cipher.decrypt("{cipher}not base64!!"), Err(CipherError::Encoding(_))));
        assert!(matches!(cipher.decrypt("{cipher}AAAA"), Err(CipherError::Decrypt(_))));
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", cipher());
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_from_key() {
        let cipher = AesGcmCipher::from_key([7u8; KEY_SIZE]);
        let tagged = cipher.encrypt("x").unwrap();
        assert_eq!(cipher.decrypt(&tagged).unwrap(), "x");
    }

    proptest! {
        #[test]
        fn prop_roundtrip(plaintext in ".{0,512}") {
            let cipher = cipher();
            let tagged = cipher.encrypt(&plaintext).unwrap();
            prop_assert_eq!(cipher.decrypt(&tagged).unwrap(), plaintext);
        }

        #[test]
        fn prop_ciphertext_never_contains_plaintext(plaintext in "[a-z]{12,64}") {
            let tagged = cipher().encrypt(&plaintext).unwrap();
            prop_assert!(!tagged.contains(&plaintext));
        }
    }
}
