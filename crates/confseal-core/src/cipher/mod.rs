//! Encryption of `{cipher}` property values
//!
//! - `Cipher` trait for pluggable implementations
//! - `AesGcmCipher`: AES-256-GCM with a passphrase-derived key
//! - `DisabledCipher`: stand-in when no key is configured

mod traits;
mod aes;

pub use traits::{Cipher, CipherError, CipherResult, DisabledCipher, CIPHER_PREFIX, strip_tag, is_tagged};
pub use aes::{AesGcmCipher, KEY_SIZE, NONCE_SIZE};
