use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use rand::RngCore;

use crate::error::MonitorError;

const NONCE_LEN: usize = 12;

/// AES-256-GCM cipher for OAuth credentials stored at rest.
///
/// The registration service writes `access_token`, `refresh_token` and
/// `client_secret` as base64(nonce || ciphertext); the store decrypts them
/// on read. A fresh 96-bit nonce is drawn for every encryption.
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// Build a cipher from the base64-encoded 32-byte `MASTER_KEY`.
    pub fn new(master_key_b64: &str) -> Result<Self, MonitorError> {
        let decoded = B64
            .decode(master_key_b64)
            .map_err(|e| MonitorError::Crypto(format!("MASTER_KEY is not valid base64: {e}")))?;

        let key: [u8; 32] = decoded.try_into().map_err(|bad: Vec<u8>| {
            MonitorError::Crypto(format!(
                "MASTER_KEY must decode to 32 bytes, got {}",
                bad.len()
            ))
        })?;

        Ok(Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        })
    }

    /// Encrypt one credential for storage.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, MonitorError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| MonitorError::Crypto(format!("Credential encryption failed: {e}")))?;

        let mut wire = Vec::with_capacity(NONCE_LEN + sealed.len());
        wire.extend_from_slice(&nonce);
        wire.extend_from_slice(&sealed);

        Ok(B64.encode(wire))
    }

    /// Decrypt one stored credential.
    pub fn decrypt(&self, stored: &str) -> Result<String, MonitorError> {
        let wire = B64.decode(stored).map_err(|e| {
            MonitorError::Crypto(format!("Stored credential is not valid base64: {e}"))
        })?;

        if wire.len() <= NONCE_LEN {
            return Err(MonitorError::Crypto(
                "Stored credential is too short to carry a nonce".into(),
            ));
        }

        let (nonce, sealed) = wire.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|e| MonitorError::Crypto(format!("Credential decryption failed: {e}")))?;

        String::from_utf8(plain)
            .map_err(|e| MonitorError::Crypto(format!("Decrypted credential is not UTF-8: {e}")))
    }
}
