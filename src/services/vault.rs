use crate::errors::BridgeError;
use crate::services::logger::Logger;
use crate::services::secret::{Secret, Unprotect};
use base64::Engine;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};

struct Unlocked {
    fingerprint: [u8; 32],
    secret: Arc<Secret>,
}

/// Holds the decrypted bearer credential for the lifetime of the process.
///
/// Only a SHA-256 fingerprint of the last ciphertext is retained; the
/// protection primitive runs again only when a different ciphertext shows up.
pub struct CredentialVault {
    logger: Logger,
    unprotect: Arc<dyn Unprotect>,
    state: Mutex<Option<Unlocked>>,
}

impl CredentialVault {
    pub fn new(logger: Logger, unprotect: Arc<dyn Unprotect>) -> Self {
        Self {
            logger: logger.child("vault"),
            unprotect,
            state: Mutex::new(None),
        }
    }

    pub fn unlock(&self, ciphertext: Option<&str>, salt: &[u8]) -> Result<Arc<Secret>, BridgeError> {
        let ciphertext = ciphertext.map(str::trim).unwrap_or("");
        if ciphertext.is_empty() {
            return Err(
                BridgeError::configuration("Encrypted bearer token was null or empty")
                    .with_hint("Store the protected token in the host's global variables."),
            );
        }
        let fingerprint: [u8; 32] = Sha256::digest(ciphertext.as_bytes()).into();

        let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        if let Some(current) = state.as_ref() {
            if current.fingerprint == fingerprint {
                self.logger.debug("Encrypted token unchanged; reusing unlocked value", None);
                return Ok(current.secret.clone());
            }
        }

        self.logger
            .info("Encrypted token changed; unlocking new value", None);
        let blob = base64::engine::general_purpose::STANDARD
            .decode(ciphertext.as_bytes())
            .map_err(|_| BridgeError::configuration("Encrypted bearer token is not valid base64"))?;
        let plaintext = self.unprotect.unprotect(&blob, salt).map_err(|err| {
            BridgeError::configuration(format!("Failed to unlock bearer token: {}", err))
                .with_hint("Re-protect the token with the current key and entropy.")
        })?;
        let secret = Arc::new(Secret::from_utf8(plaintext).map_err(|err| {
            BridgeError::configuration(format!("Failed to unlock bearer token: {}", err))
        })?);
        if secret.is_empty() {
            return Err(BridgeError::configuration(
                "Unlocked bearer token is empty",
            ));
        }

        *state = Some(Unlocked {
            fingerprint,
            secret: secret.clone(),
        });
        Ok(secret)
    }

    pub fn is_unlocked(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::CredentialVault;
    use crate::errors::BridgeErrorKind;
    use crate::services::logger::Logger;
    use crate::services::secret::{Unprotect, UnprotectError};
    use base64::Engine;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Reverses the blob bytes and counts invocations.
    #[derive(Default)]
    struct CountingUnprotect {
        calls: AtomicUsize,
    }

    impl Unprotect for CountingUnprotect {
        fn unprotect(&self, blob: &[u8], _salt: &[u8]) -> Result<Vec<u8>, UnprotectError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(blob.iter().rev().copied().collect())
        }
    }

    fn protect(plain: &str) -> String {
        let reversed: Vec<u8> = plain.bytes().rev().collect();
        base64::engine::general_purpose::STANDARD.encode(reversed)
    }

    fn vault() -> (CredentialVault, Arc<CountingUnprotect>) {
        let primitive = Arc::new(CountingUnprotect::default());
        (
            CredentialVault::new(Logger::new("test"), primitive.clone()),
            primitive,
        )
    }

    #[test]
    fn same_ciphertext_is_decrypted_once() {
        let (vault, primitive) = vault();
        let blob = protect("token-a");
        let first = vault.unlock(Some(&blob), b"salt").expect("unlock");
        let second = vault.unlock(Some(&blob), b"salt").expect("unlock");
        assert_eq!(primitive.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.with_exposed(|t| t.to_string()), "token-a");
    }

    #[test]
    fn changed_ciphertext_replaces_secret() {
        let (vault, primitive) = vault();
        vault.unlock(Some(&protect("token-a")), b"").expect("unlock a");
        let secret = vault.unlock(Some(&protect("token-b")), b"").expect("unlock b");
        assert_eq!(primitive.calls.load(Ordering::SeqCst), 2);
        assert_eq!(secret.with_exposed(|t| t.to_string()), "token-b");
    }

    #[test]
    fn missing_or_empty_ciphertext_is_configuration_error() {
        let (vault, primitive) = vault();
        for input in [None, Some(""), Some("   ")] {
            let err = vault.unlock(input, b"").expect_err("must fail");
            assert_eq!(err.kind, BridgeErrorKind::Configuration);
        }
        assert_eq!(primitive.calls.load(Ordering::SeqCst), 0);
        assert!(!vault.is_unlocked());
    }

    #[test]
    fn invalid_base64_is_rejected_before_decryption() {
        let (vault, primitive) = vault();
        let err = vault.unlock(Some("%%%not-base64"), b"").expect_err("must fail");
        assert_eq!(err.kind, BridgeErrorKind::Configuration);
        assert_eq!(primitive.calls.load(Ordering::SeqCst), 0);
    }
}
