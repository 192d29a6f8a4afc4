//! Key material configuration for [`FieldCipher`](crate::FieldCipher).
//!
//! The passphrase and salt default to fixed values so existing ciphertexts
//! stay readable. A deployment can override them through the environment or
//! by constructing a [`CipherConfig`] directly.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use zeroize::Zeroizing;

use crate::crypto::{DEFAULT_PBKDF2_ITERATIONS, SALT_LEN};
use crate::error::{Error, Result};

/// Passphrase used when no override is configured.
pub const DEFAULT_PASSPHRASE: &str = "SecureInfoSystemDemo-Key";

/// Salt used when no override is configured.
pub const DEFAULT_SALT: [u8; SALT_LEN] = [
    0x10, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88,
];

/// Environment variable holding the cipher passphrase.
pub const PASSPHRASE_VAR: &str = "SECUREINFO_PASSPHRASE";
/// Environment variable holding the base64-encoded 16 byte salt.
pub const SALT_VAR: &str = "SECUREINFO_SALT";
/// Environment variable holding the PBKDF2 iteration count.
pub const ITERATIONS_VAR: &str = "SECUREINFO_KDF_ITERATIONS";

#[derive(Clone)]
pub struct CipherConfig {
    passphrase: Zeroizing<String>,
    salt: [u8; SALT_LEN],
    iterations: u32,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            passphrase: Zeroizing::new(DEFAULT_PASSPHRASE.to_string()),
            salt: DEFAULT_SALT,
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl fmt::Debug for CipherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherConfig")
            .field("passphrase", &"<redacted>")
            .field("salt", &STANDARD.encode(self.salt))
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl CipherConfig {
    pub fn new(passphrase: impl Into<String>, salt: [u8; SALT_LEN], iterations: u32) -> Result<Self> {
        let config = Self {
            passphrase: Zeroizing::new(passphrase.into()),
            salt,
            iterations,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from a variable lookup, keeping the default for
    /// every variable that is unset or empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let passphrase = match value(PASSPHRASE_VAR) {
            Some(p) => p,
            None => defaults.passphrase.to_string(),
        };

        let salt = match value(SALT_VAR) {
            Some(encoded) => parse_salt(&encoded)?,
            None => defaults.salt,
        };

        let iterations = match value(ITERATIONS_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|e| Error::Config(format!("{ITERATIONS_VAR} is not a number: {e}")))?,
            None => defaults.iterations,
        };

        Self::new(passphrase, salt, iterations)
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn validate(&self) -> Result<()> {
        if self.passphrase.is_empty() {
            return Err(Error::Config("passphrase must not be empty".into()));
        }
        if self.iterations < 1 {
            return Err(Error::Config("PBKDF2 iterations must be >= 1".into()));
        }
        Ok(())
    }
}

/// Decodes a base64 salt and checks that it is exactly 16 bytes.
pub fn parse_salt(encoded: &str) -> Result<[u8; SALT_LEN]> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::Config(format!("salt is not valid base64: {e}")))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::Config(format!("salt must be {SALT_LEN} bytes, got {}", bytes.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_constants() {
        let config = CipherConfig::default();
        assert_eq!(config.passphrase(), DEFAULT_PASSPHRASE);
        assert_eq!(config.salt(), &DEFAULT_SALT);
        assert_eq!(config.iterations(), 10_000);
    }

    #[test]
    fn empty_lookup_yields_defaults() {
        let config = CipherConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.passphrase(), DEFAULT_PASSPHRASE);
        assert_eq!(config.salt(), &DEFAULT_SALT);
    }

    #[test]
    fn lookup_overrides_every_field() {
        let config = CipherConfig::from_lookup(lookup(&[
            (PASSPHRASE_VAR, "deployment-key"),
            (SALT_VAR, "AAECAwQFBgcICQoLDA0ODw=="),
            (ITERATIONS_VAR, "20000"),
        ]))
        .unwrap();

        assert_eq!(config.passphrase(), "deployment-key");
        assert_eq!(config.salt(), &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]);
        assert_eq!(config.iterations(), 20_000);
    }

    #[test]
    fn short_salt_is_rejected() {
        let err = CipherConfig::from_lookup(lookup(&[(SALT_VAR, "AAEC")])).unwrap_err();
        assert!(err.to_string().contains("salt must be 16 bytes"));
    }

    #[test]
    fn zero_iterations_are_rejected() {
        assert!(CipherConfig::new("pw", DEFAULT_SALT, 0).is_err());
        assert!(CipherConfig::from_lookup(lookup(&[(ITERATIONS_VAR, "ten")])).is_err());
    }

    #[test]
    fn debug_output_hides_passphrase() {
        let rendered = format!("{:?}", CipherConfig::default());
        assert!(!rendered.contains(DEFAULT_PASSPHRASE));
        assert!(rendered.contains("<redacted>"));
    }
}
