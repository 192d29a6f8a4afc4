//! Error types shared by the hashing, cipher and record layers.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected by a cryptographic primitive before any work was done.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A hash strategy could not produce a digest.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// Record-level input rejected before any cryptographic work was done.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Stored ciphertext could not be turned back into plaintext.
    #[error("failed to decrypt the provided cipher text")]
    Decryption(#[source] DecryptFailure),

    /// The persistence store reported a failure.
    #[error("an error occurred while {operation}")]
    Store {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid cipher configuration: {0}")]
    Config(String),
}

/// Underlying reason a ciphertext was rejected.
#[derive(Debug, Error)]
pub enum DecryptFailure {
    #[error("cipher text is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("cipher text length {0} is not a positive multiple of the block size")]
    BlockLength(usize),
    #[error("padding is invalid")]
    Padding,
    #[error("decrypted bytes are not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl Error {
    pub(crate) fn store(operation: &'static str, source: anyhow::Error) -> Self {
        Error::Store {
            operation,
            source: source.into(),
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}

impl From<DecryptFailure> for Error {
    fn from(failure: DecryptFailure) -> Self {
        Error::Decryption(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn store_error_keeps_cause() {
        let err = Error::store("registering the user", anyhow::anyhow!("disk full"));
        assert_eq!(
            err.to_string(),
            "an error occurred while registering the user"
        );
        assert_eq!(err.source().unwrap().to_string(), "disk full");
    }

    #[test]
    fn decryption_error_exposes_failure() {
        let err = Error::from(DecryptFailure::Padding);
        assert!(matches!(err, Error::Decryption(DecryptFailure::Padding)));
        assert_eq!(err.source().unwrap().to_string(), "padding is invalid");
    }
}
