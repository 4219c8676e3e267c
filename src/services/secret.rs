use std::fmt;
use thiserror::Error;
use zeroize::Zeroize;

/// Decrypted credential material. The plaintext is wiped when the value drops
/// and is only reachable through [`Secret::with_exposed`].
pub struct Secret {
    plaintext: String,
}

impl Secret {
    pub fn new(plaintext: String) -> Self {
        Self { plaintext }
    }

    /// Takes ownership of decrypted bytes; invalid UTF-8 is wiped and rejected.
    pub fn from_utf8(bytes: Vec<u8>) -> Result<Self, UnprotectError> {
        match String::from_utf8(bytes) {
            Ok(plaintext) => Ok(Self { plaintext }),
            Err(err) => {
                let mut bytes = err.into_bytes();
                bytes.zeroize();
                Err(UnprotectError::Malformed(
                    "decrypted secret is not valid UTF-8".to_string(),
                ))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.plaintext.is_empty()
    }

    /// Lends the plaintext to `f` for the duration of the call.
    pub fn with_exposed<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.plaintext)
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.plaintext.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

#[derive(Debug, Error)]
pub enum UnprotectError {
    #[error("protected blob is malformed: {0}")]
    Malformed(String),
    #[error("protected blob could not be decrypted with the current key and salt")]
    Decrypt,
    #[error("protection key unavailable: {0}")]
    Key(String),
}

/// Platform secret-protection primitive: turns a protected blob plus its
/// salt back into plaintext.
pub trait Unprotect: Send + Sync {
    fn unprotect(&self, blob: &[u8], salt: &[u8]) -> Result<Vec<u8>, UnprotectError>;
}

#[cfg(test)]
mod tests {
    use super::Secret;

    #[test]
    fn debug_never_prints_plaintext() {
        let secret = Secret::new("jwt-token".to_string());
        assert_eq!(format!("{:?}", secret), "Secret([REDACTED])");
    }

    #[test]
    fn exposes_plaintext_only_inside_closure() {
        let secret = Secret::from_utf8(b"jwt-token".to_vec()).expect("utf8 secret");
        let header = secret.with_exposed(|token| format!("Bearer {}", token));
        assert_eq!(header, "Bearer jwt-token");
        assert!(!secret.is_empty());
    }

    #[test]
    fn rejects_non_utf8_plaintext() {
        assert!(Secret::from_utf8(vec![0xff, 0xfe]).is_err());
    }
}
