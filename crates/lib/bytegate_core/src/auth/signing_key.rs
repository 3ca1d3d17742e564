//! Shared HMAC signing key.
//!
//! Loaded once at startup and handed to the issuer and every verifier; there
//! is no process-global accessor.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

/// Minimum key length in bytes (256 bits).
pub const MIN_KEY_LEN: usize = 32;

/// Shannon entropy (bits/byte) below which a key of valid length is flagged.
const LOW_ENTROPY_BITS: f64 = 3.5;

/// Errors loading the signing key. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("signing key must be at least {min} bytes, got {len}")]
    TooShort { len: usize, min: usize },

    #[error("no signing key configured: set JWT_SECRET or JWT_SECRET_FILE")]
    Missing,

    #[error("failed to read signing key file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Symmetric signing secret. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Wrap raw key bytes, rejecting anything shorter than [`MIN_KEY_LEN`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, KeyError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_KEY_LEN {
            return Err(KeyError::TooShort {
                len: bytes.len(),
                min: MIN_KEY_LEN,
            });
        }
        let entropy = shannon_entropy(&bytes);
        if entropy < LOW_ENTROPY_BITS {
            warn!(entropy, "signing key has low entropy");
        }
        Ok(Self(bytes))
    }

    /// Read the key from a file; surrounding whitespace is ignored.
    pub fn from_file(path: &Path) -> Result<Self, KeyError> {
        let raw = std::fs::read_to_string(path).map_err(|source| KeyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let key = Self::new(raw.trim().as_bytes())?;
        info!(path = %path.display(), "loaded signing key from file");
        Ok(key)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey(<{} bytes>)", self.0.len())
    }
}

/// Resolve the signing key: env var `JWT_SECRET` → file named by `JWT_SECRET_FILE`.
pub fn resolve_signing_key() -> Result<SigningKey, KeyError> {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return SigningKey::new(secret.into_bytes());
    }
    if let Ok(path) = std::env::var("JWT_SECRET_FILE")
        && !path.is_empty()
    {
        return SigningKey::from_file(Path::new(&path));
    }
    Err(KeyError::Missing)
}

/// Bits per byte, 0..=8.
fn shannon_entropy(data: &[u8]) -> f64 {
    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }
    let len = data.len() as f64;
    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = f64::from(count) / len;
            -p * p.log2()
        })
        .sum()
}
