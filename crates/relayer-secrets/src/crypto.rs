//! Authenticated encryption at rest for stored preimages.
//!
//! No trivial XOR "cipher" with base64 framing here - ciphertexts are
//! AES-256-GCM sealed with a random 96-bit nonce per secret, and plaintext
//! buffers are wiped on drop.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::SecretError;

const NONCE_LEN: usize = 12;

/// A process-lifetime AEAD key, sourced from configuration (hex-encoded
/// 32 bytes). Never logged, never `Debug`-printed.
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    pub fn new(key_bytes: [u8; 32]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Parses a hex-encoded 32-byte key, as configured via
    /// `secret.encryptionKey`.
    pub fn from_hex(s: &str) -> Result<Self, SecretError> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| SecretError::Crypto(format!("invalid hex encryption key: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| SecretError::Crypto(format!("encryption key must be 32 bytes, got {}", v.len())))?;
        Ok(Self::new(bytes))
    }

    /// Encrypts `plaintext`, returning `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SecretError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let mut sealed = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| SecretError::Crypto("AEAD seal failed".into()))?;
        let mut out = nonce_bytes.to_vec();
        out.append(&mut sealed);
        Ok(out)
    }

    /// Decrypts a `nonce || ciphertext` blob produced by [`Self::encrypt`].
    /// The returned buffer zeroizes itself on drop.
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, SecretError> {
        if sealed.len() < NONCE_LEN {
            return Err(SecretError::Crypto("ciphertext shorter than nonce".into()));
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| SecretError::Crypto("AEAD open failed".into()))?;
        Ok(Zeroizing::new(plaintext))
    }
}
