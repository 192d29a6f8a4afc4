//! One-way password hashing.
//!
//! [`CredentialHasher`] validates input and delegates the digest to a
//! [`PasswordHashStrategy`]. The default [`Sha256Base64`] strategy is an
//! unsalted SHA-256 digest, so equal passwords share a stored hash and the
//! hashes are open to precomputed dictionary attacks. [`Argon2idPhc`] can be
//! plugged in instead without changing any caller.

use std::fmt;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Length of a [`Sha256Base64`] hash: 32 digest bytes as padded base64.
pub const SHA256_BASE64_LEN: usize = 44;

const ARGON2ID_PREFIX: &str = "$argon2id$";

pub trait PasswordHashStrategy: Send + Sync {
    /// Short identifier used in logs and on the command line.
    fn name(&self) -> &'static str;

    /// Produces the value to store for `password`. Input is already
    /// validated as non-blank.
    fn hash(&self, password: &str) -> Result<String>;

    /// Checks `password` against a value produced by [`hash`](Self::hash).
    fn verify(&self, password: &str, stored_hash: &str) -> bool;
}

/// Base64 of the SHA-256 digest of the UTF-8 password bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Base64;

impl PasswordHashStrategy for Sha256Base64 {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn hash(&self, password: &str) -> Result<String> {
        let digest = Sha256::digest(password.as_bytes());
        Ok(STANDARD.encode(digest))
    }

    fn verify(&self, password: &str, stored_hash: &str) -> bool {
        // Plain string equality; not constant time.
        match self.hash(password) {
            Ok(computed) => computed == stored_hash,
            Err(_) => false,
        }
    }
}

/// Argon2id with a random per-hash salt, stored as a PHC string.
#[derive(Debug, Clone)]
pub struct Argon2idPhc {
    params: Params,
}

impl Default for Argon2idPhc {
    fn default() -> Self {
        Self {
            params: Params::new(19 * 1024, 2, 1, None).unwrap_or_default(),
        }
    }
}

impl Argon2idPhc {
    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(mem_cost_kib, time_cost, parallelism, None)
            .map_err(|e| Error::Hashing(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordHashStrategy for Argon2idPhc {
    fn name(&self) -> &'static str {
        "argon2id"
    }

    fn hash(&self, password: &str) -> Result<String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::fill(&mut salt_bytes)
            .map_err(|_| Error::Hashing("OS random generator unavailable".into()))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::Hashing(format!("{e}")))?;

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Hashing(format!("{e}")))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Hashes and verifies passwords through the configured strategy.
pub struct CredentialHasher {
    strategy: Box<dyn PasswordHashStrategy>,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::with_strategy(Sha256Base64)
    }
}

impl fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

impl CredentialHasher {
    pub fn with_strategy(strategy: impl PasswordHashStrategy + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Hashes a password for storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the password is empty or only
    /// whitespace.
    pub fn hash(&self, password: &str) -> Result<String> {
        if password.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "password must not be empty or whitespace",
            ));
        }
        self.strategy.hash(password)
    }

    /// Returns `true` when `password` matches `stored_hash`. An empty stored
    /// hash or a blank password never matches.
    ///
    /// A hash written by the other built-in strategy is recognised by its
    /// shape and checked with that strategy instead.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        if stored_hash.is_empty() || password.trim().is_empty() {
            return false;
        }
        if self.strategy.verify(password, stored_hash) {
            return true;
        }

        match StoredFormat::detect(stored_hash) {
            Some(format) if format.name() != self.strategy.name() => {
                format.verify(password, stored_hash)
            }
            _ => false,
        }
    }
}

/// Built-in hash formats that can be told apart from the stored value alone.
enum StoredFormat {
    Sha256,
    Argon2id,
}

impl StoredFormat {
    fn detect(stored_hash: &str) -> Option<Self> {
        if stored_hash.starts_with(ARGON2ID_PREFIX) {
            Some(Self::Argon2id)
        } else if stored_hash.len() == SHA256_BASE64_LEN
            && STANDARD.decode(stored_hash).is_ok_and(|d| d.len() == 32)
        {
            Some(Self::Sha256)
        } else {
            None
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => Sha256Base64.name(),
            Self::Argon2id => "argon2id",
        }
    }

    fn verify(&self, password: &str, stored_hash: &str) -> bool {
        match self {
            Self::Sha256 => Sha256Base64.verify(password, stored_hash),
            // Cost parameters are read back from the PHC string.
            Self::Argon2id => Argon2idPhc::default().verify(password, stored_hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_known_vector() {
        let hasher = CredentialHasher::default();
        let hash = hasher.hash("Secr3t!").unwrap();
        assert_eq!(hash, "B5maz6QSZlXQVJ2YBUelIGDk08xK3aDejEhlEBLshKo=");
        assert_eq!(hash.len(), SHA256_BASE64_LEN);
    }

    #[test]
    fn hashes_and_verifies_passwords() {
        let hasher = CredentialHasher::default();
        for password in ["Secr3t!", "correct horse battery staple", " padded ", "mật khẩu"] {
            let hash = hasher.hash(password).unwrap();
            assert!(hasher.verify(password, &hash));
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let hasher = CredentialHasher::default();
        assert_eq!(hasher.hash("password").unwrap(), hasher.hash("password").unwrap());
        assert_eq!(
            hasher.hash("password").unwrap(),
            "XohImNooBHFR0OVvjcYpJ3NgPQ1qq73WKhHvch0VQtg="
        );
    }

    #[test]
    fn distinct_passwords_hash_differently() {
        let hasher = CredentialHasher::default();
        assert_ne!(hasher.hash("Secr3t!").unwrap(), hasher.hash("secr3t!").unwrap());
        assert_ne!(hasher.hash("a").unwrap(), hasher.hash("a ").unwrap());
    }

    #[test]
    fn blank_password_is_rejected() {
        let hasher = CredentialHasher::default();
        for password in ["", "   ", "\t\n"] {
            assert!(matches!(hasher.hash(password), Err(Error::InvalidArgument(_))));
        }
    }

    #[test]
    fn verify_rejects_wrong_or_missing_hash() {
        let hasher = CredentialHasher::default();
        let hash = hasher.hash("Secr3t!").unwrap();
        assert!(!hasher.verify("wrong", &hash));
        assert!(!hasher.verify("Secr3t!", ""));
        assert!(!hasher.verify("", &hash));
        // Truncated hashes must not match a prefix.
        assert!(!hasher.verify("Secr3t!", &hash[..43]));
    }

    #[test]
    fn verify_uses_plain_equality() {
        // Hardening opportunity: a constant-time comparison would remove the
        // timing side channel. Only correctness is asserted here.
        let hasher = CredentialHasher::default();
        let hash = hasher.hash("Secr3t!").unwrap();
        let mut altered = hash.clone();
        altered.replace_range(0..1, "C");
        assert!(!hasher.verify("Secr3t!", &altered));
    }

    #[test]
    fn argon2_strategy_is_salted_and_verifies() {
        let hasher = CredentialHasher::with_strategy(Argon2idPhc::new(8 * 1024, 1, 1).unwrap());
        let first = hasher.hash("Secr3t!").unwrap();
        let second = hasher.hash("Secr3t!").unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(hasher.verify("Secr3t!", &first));
        assert!(hasher.verify("Secr3t!", &second));
        assert!(!hasher.verify("wrong", &first));
    }

    #[test]
    fn argon2_hasher_still_verifies_sha256_hashes() {
        let hasher = CredentialHasher::with_strategy(Argon2idPhc::default());
        let sha = CredentialHasher::default().hash("Secr3t!").unwrap();
        assert!(hasher.verify("Secr3t!", &sha));
        assert!(!hasher.verify("wrong", &sha));
    }

    #[test]
    fn sha256_hasher_still_verifies_argon2_hashes() {
        let argon = CredentialHasher::with_strategy(Argon2idPhc::new(8 * 1024, 1, 1).unwrap());
        let phc = argon.hash("Secr3t!").unwrap();

        let hasher = CredentialHasher::default();
        assert!(hasher.verify("Secr3t!", &phc));
        assert!(!hasher.verify("wrong", &phc));
    }

    #[test]
    fn unrecognised_hash_never_matches() {
        let hasher = CredentialHasher::with_strategy(Argon2idPhc::default());
        assert!(!hasher.verify("Secr3t!", "not-a-hash"));
        assert!(!hasher.verify("Secr3t!", "$argon2id$garbage"));
    }

    #[test]
    fn hasher_and_cipher_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CredentialHasher>();
        assert_send_sync::<crate::crypto::FieldCipher>();
    }

    #[test]
    fn strategy_name_is_reported() {
        assert_eq!(CredentialHasher::default().strategy_name(), "sha256");
        assert_eq!(
            format!("{:?}", CredentialHasher::with_strategy(Argon2idPhc::default())),
            "CredentialHasher { strategy: \"argon2id\" }"
        );
    }
}
