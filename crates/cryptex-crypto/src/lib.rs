//! Envelope encryption for secret values.
//!
//! A single 256-bit key encrypts every secret for the process lifetime.
//! Each seal draws a fresh random nonce and the stored blob is
//! `base64(nonce || ciphertext)`, so decryption needs only the key.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{aead::Aead, KeyInit, XChaCha20Poly1305, XNonce};
use rand_core::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

/// XChaCha20-Poly1305 nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// 256-bit symmetric key length in bytes.
pub const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("encryption key must be {KEY_LEN} bytes, got {got}")]
    InvalidLength { got: usize },
}

/// The process-wide encryption key.
///
/// Constructed once at startup from configuration; the raw bytes are
/// zeroized on drop.
#[derive(zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct EncryptionKey(Zeroizing<[u8; KEY_LEN]>);

impl EncryptionKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength { got: bytes.len() });
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(bytes);
        Ok(EncryptionKey(key))
    }

    /// Parse a key from configuration: standard base64 first, falling back
    /// to treating the input as raw bytes.
    pub fn from_encoded(encoded: &str) -> Result<Self, KeyError> {
        match BASE64.decode(encoded) {
            Ok(decoded) => Self::from_bytes(&decoded),
            Err(_) => Self::from_bytes(encoded.as_bytes()),
        }
    }

    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum EncryptError {
    #[error("AEAD encryption failed")]
    AeadFailed(chacha20poly1305::aead::Error),
}

#[derive(Debug, Error)]
pub enum DecryptError {
    /// Blob is not valid base64 or is shorter than the nonce.
    #[error("malformed ciphertext blob")]
    MalformedCiphertext,
    /// Authentication tag did not verify: the blob was altered or sealed
    /// under a different key.
    #[error("decryption failed: ciphertext tampered or wrong key")]
    TamperedOrWrongKey,
}

/// Seals and opens secret value blobs under one symmetric key.
pub struct EnvelopeCipher {
    cipher: XChaCha20Poly1305,
}

impl EnvelopeCipher {
    pub fn new(key: &EncryptionKey) -> Self {
        let key = chacha20poly1305::Key::from(*key.as_bytes());
        Self {
            cipher: XChaCha20Poly1305::new(&key),
        }
    }

    /// Encrypt a plaintext value into an opaque text blob.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, EncryptError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand_core::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from(nonce_bytes);

        let ct = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(EncryptError::AeadFailed)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ct.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ct);
        Ok(BASE64.encode(blob))
    }

    /// Decrypt a blob produced by [`seal`](Self::seal).
    ///
    /// The two failure modes are distinguishable so they can be told apart
    /// in logs, but neither ever yields partial plaintext.
    pub fn open(&self, blob: &str) -> Result<Zeroizing<Vec<u8>>, DecryptError> {
        let raw = BASE64
            .decode(blob)
            .map_err(|_| DecryptError::MalformedCiphertext)?;
        if raw.len() < NONCE_LEN {
            return Err(DecryptError::MalformedCiphertext);
        }

        let (nonce_bytes, ct) = raw.split_at(NONCE_LEN);
        let nonce = XNonce::from_slice(nonce_bytes);

        let pt = self
            .cipher
            .decrypt(nonce, ct)
            .map_err(|_| DecryptError::TamperedOrWrongKey)?;

        Ok(Zeroizing::new(pt))
    }
}
