use crate::constants::buffers::{CRYPTO_IV_SIZE, CRYPTO_KEY_SIZE, CRYPTO_TAG_SIZE};
use crate::errors::BridgeError;
use crate::services::secret::{Unprotect, UnprotectError};
use crate::utils::paths::resolve_key_path;
use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::Aes256Gcm;
use base64::Engine;
use rand::RngCore;
use std::fs;
use std::path::Path;

fn decode_key(raw: &str) -> Option<Vec<u8>> {
    let trimmed = raw.trim();
    if trimmed.len() == CRYPTO_KEY_SIZE * 2 {
        return hex::decode(trimmed).ok();
    }
    if trimmed.len() == CRYPTO_KEY_SIZE {
        return Some(trimmed.as_bytes().to_vec());
    }
    if trimmed.len() > CRYPTO_KEY_SIZE * 2 {
        let engine = base64::engine::general_purpose::STANDARD;
        return engine
            .decode(trimmed.as_bytes())
            .ok()
            .filter(|key| key.len() == CRYPTO_KEY_SIZE);
    }
    None
}

/// AES-256-GCM secret protection. Blobs are `iv || ciphertext || tag`; the
/// caller's salt is bound as associated data, so a blob only opens with the
/// salt it was sealed under.
#[derive(Clone)]
pub struct Security {
    cipher: Aes256Gcm,
}

impl Security {
    pub fn from_key_material(raw: &str) -> Result<Self, BridgeError> {
        let key = decode_key(raw).ok_or_else(|| {
            BridgeError::configuration("Invalid encryption key").with_hint(
                "Expected 64 hex chars, 32 raw chars, or base64 of 32 bytes.".to_string(),
            )
        })?;
        let key = aes_gcm::Key::<Aes256Gcm>::from_slice(&key);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Key from `SE_BRIDGE_ENCRYPTION_KEY`, else from the key file.
    pub fn from_env() -> Result<Self, BridgeError> {
        if let Ok(raw) = std::env::var("SE_BRIDGE_ENCRYPTION_KEY") {
            if !raw.trim().is_empty() {
                return Self::from_key_material(&raw);
            }
        }
        Self::from_key_file(&resolve_key_path())
    }

    pub fn from_key_file(path: &Path) -> Result<Self, BridgeError> {
        let stored = fs::read_to_string(path).map_err(|err| {
            BridgeError::configuration(format!("Failed to read encryption key file: {}", err))
                .with_hint(
                    "Set SE_BRIDGE_ENCRYPTION_KEY, or point SE_BRIDGE_KEY_PATH at a key file."
                        .to_string(),
                )
                .with_details(serde_json::json!({"path": path.display().to_string()}))
        })?;
        Self::from_key_material(&stored)
    }

    /// Seals `plaintext` under `salt` and returns the base64 blob the vault
    /// reads back.
    pub fn protect(&self, plaintext: &str, salt: &[u8]) -> Result<String, BridgeError> {
        let mut iv = [0u8; CRYPTO_IV_SIZE];
        OsRng.fill_bytes(&mut iv);
        let nonce = aes_gcm::Nonce::from_slice(&iv);
        let sealed = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: salt,
                },
            )
            .map_err(|_| BridgeError::internal("Failed to encrypt secret payload"))?;
        let mut blob = Vec::with_capacity(iv.len() + sealed.len());
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(&sealed);
        Ok(base64::engine::general_purpose::STANDARD.encode(blob))
    }
}

impl Unprotect for Security {
    fn unprotect(&self, blob: &[u8], salt: &[u8]) -> Result<Vec<u8>, UnprotectError> {
        if blob.len() < CRYPTO_IV_SIZE + CRYPTO_TAG_SIZE {
            return Err(UnprotectError::Malformed(format!(
                "expected at least {} bytes, got {}",
                CRYPTO_IV_SIZE + CRYPTO_TAG_SIZE,
                blob.len()
            )));
        }
        let (iv, sealed) = blob.split_at(CRYPTO_IV_SIZE);
        let nonce = aes_gcm::Nonce::from_slice(iv);
        self.cipher
            .decrypt(
                nonce,
                Payload {
                    msg: sealed,
                    aad: salt,
                },
            )
            .map_err(|_| UnprotectError::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::Security;
    use crate::services::secret::{Unprotect, UnprotectError};
    use base64::Engine;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn decode(blob: &str) -> Vec<u8> {
        base64::engine::general_purpose::STANDARD
            .decode(blob)
            .expect("base64 blob")
    }

    #[test]
    fn protect_then_unprotect_with_same_salt() {
        let security = Security::from_key_material(KEY).expect("key");
        let blob = security.protect("jwt", b"salt").expect("protect");
        let plain = security.unprotect(&decode(&blob), b"salt").expect("unprotect");
        assert_eq!(plain, b"jwt");
    }

    #[test]
    fn wrong_salt_fails_to_open() {
        let security = Security::from_key_material(KEY).expect("key");
        let blob = security.protect("jwt", b"salt").expect("protect");
        let err = security
            .unprotect(&decode(&blob), b"other")
            .expect_err("salt mismatch");
        assert!(matches!(err, UnprotectError::Decrypt));
    }

    #[test]
    fn short_blob_is_malformed() {
        let security = Security::from_key_material(KEY).expect("key");
        let err = security.unprotect(&[0u8; 4], b"").expect_err("short blob");
        assert!(matches!(err, UnprotectError::Malformed(_)));
    }

    #[test]
    fn rejects_bad_key_material() {
        assert!(Security::from_key_material("short").is_err());
    }
}
