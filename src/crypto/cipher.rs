//! Reversible encryption of individual text fields.
//!
//! Fields are encrypted with AES-256-CBC and PKCS#7 padding under key
//! material derived by [`derive_key_material`](super::kdf::derive_key_material),
//! then stored as base64 text.
//!
//! The IV comes from the same fixed derivation as the key, so a given
//! plaintext always encrypts to the same ciphertext. Stored values therefore
//! reveal which records share a phone number or address.

use std::fmt;

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes256, Block as AesBlock};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::BLOCK_LEN;
use super::kdf::derive_key_material;
use crate::config::CipherConfig;
use crate::error::{DecryptFailure, Result};

/// A field value in its persisted, encrypted form (base64 text).
///
/// Plaintext and ciphertext are separate types so a record cannot be written
/// with a field that skipped encryption.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ciphertext(String);

impl Ciphertext {
    /// Wraps a value read back from persistence.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ciphertext").field(&self.0).finish()
    }
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encrypts and decrypts PII fields with the configured key material.
///
/// Holds only read-only configuration; key material is derived per call, so
/// one instance can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct FieldCipher {
    config: CipherConfig,
}

impl FieldCipher {
    pub fn new(config: CipherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CipherConfig {
        &self.config
    }

    /// Encrypts an optional field. `None` stays `None` and an empty string
    /// stays empty without touching the cipher.
    pub fn encrypt(&self, plaintext: Option<&str>) -> Option<Ciphertext> {
        plaintext.map(|text| self.encrypt_str(text))
    }

    pub fn encrypt_str(&self, plaintext: &str) -> Ciphertext {
        if plaintext.is_empty() {
            return Ciphertext(String::new());
        }

        let material = derive_key_material(&self.config);
        let cipher = Aes256::new(material.key().into());
        let bytes = cbc_encrypt(&cipher, material.iv(), plaintext.as_bytes());

        debug!(ciphertext_len = bytes.len(), "field encrypted");
        Ciphertext(STANDARD.encode(bytes))
    }

    /// Decrypts an optional field with the same short-circuits as
    /// [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, ciphertext: Option<&Ciphertext>) -> Result<Option<String>> {
        ciphertext.map(|c| self.decrypt_str(c)).transpose()
    }

    /// Decrypts a stored field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decryption`](crate::Error::Decryption) when the value
    /// is not base64, is not a whole number of blocks, fails the padding check
    /// or does not decode to UTF-8.
    pub fn decrypt_str(&self, ciphertext: &Ciphertext) -> Result<String> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }

        self.try_decrypt(ciphertext.as_str()).map_err(|failure| {
            warn!(reason = %failure, "field decryption failed");
            failure.into()
        })
    }

    fn try_decrypt(&self, encoded: &str) -> Result<String, DecryptFailure> {
        let bytes = STANDARD.decode(encoded)?;
        if bytes.is_empty() || bytes.len() % BLOCK_LEN != 0 {
            return Err(DecryptFailure::BlockLength(bytes.len()));
        }

        let material = derive_key_material(&self.config);
        let cipher = Aes256::new(material.key().into());
        let plaintext = cbc_decrypt(&cipher, material.iv(), &bytes)?;

        Ok(std::str::from_utf8(&plaintext)?.to_owned())
    }
}

fn cbc_encrypt(cipher: &Aes256, iv: &[u8; BLOCK_LEN], plaintext: &[u8]) -> Vec<u8> {
    let mut buf = Zeroizing::new(plaintext.to_vec());
    let pad = BLOCK_LEN - plaintext.len() % BLOCK_LEN;
    buf.resize(plaintext.len() + pad, pad as u8);

    let mut out = Vec::with_capacity(buf.len());
    let mut previous = *iv;
    for chunk in buf.chunks_exact(BLOCK_LEN) {
        let mut block = AesBlock::default();
        for (dst, (p, c)) in block.iter_mut().zip(chunk.iter().zip(previous.iter())) {
            *dst = p ^ c;
        }
        cipher.encrypt_block(&mut block);
        previous.copy_from_slice(&block);
        out.extend_from_slice(&block);
    }
    out
}

fn cbc_decrypt(
    cipher: &Aes256,
    iv: &[u8; BLOCK_LEN],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, DecryptFailure> {
    let mut out = Zeroizing::new(Vec::with_capacity(ciphertext.len()));
    let mut previous: &[u8] = iv;
    for chunk in ciphertext.chunks_exact(BLOCK_LEN) {
        let mut block = AesBlock::clone_from_slice(chunk);
        cipher.decrypt_block(&mut block);
        out.extend(block.iter().zip(previous.iter()).map(|(b, p)| b ^ p));
        previous = chunk;
    }

    let padding = *out.last().ok_or(DecryptFailure::Padding)?;
    let pad = usize::from(padding);
    if pad == 0 || pad > BLOCK_LEN || pad > out.len() {
        return Err(DecryptFailure::Padding);
    }

    // Compare the whole tail so timing does not reveal the first bad byte.
    let expected = [padding; BLOCK_LEN];
    let tail = &out[out.len() - pad..];
    if !bool::from(tail.ct_eq(&expected[..pad])) {
        return Err(DecryptFailure::Padding);
    }
    let len = out.len() - pad;
    out.truncate(len);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SALT;
    use crate::error::Error;

    fn cipher() -> FieldCipher {
        FieldCipher::default()
    }

    fn stored(value: &str) -> Ciphertext {
        Ciphertext::from_stored(value)
    }

    #[test]
    fn encrypts_known_vectors() {
        let c = cipher();
        assert_eq!(c.encrypt_str("555-0100").as_str(), "DdmkR+4PurdjglQG1qbUug==");
        assert_eq!(c.encrypt_str("A").as_str(), "vsQw6DnPrtNLsZnAvK8R+A==");
        assert_eq!(
            c.encrypt_str("12 Main St, Springfield").as_str(),
            "/gs3HhfdsOdtBSTiabEYBAzPm1WRAQG5xo0kPhENUjE="
        );
    }

    #[test]
    fn full_block_plaintext_gets_extra_padding_block() {
        let c = cipher();
        let encrypted = c.encrypt_str("exactly16bytes!!");
        assert_eq!(encrypted.as_str(), "fIjiKvFiSFRvj3tdJuXi7RXc4b2dJqxBmKk64SXU8Hw=");
        assert_eq!(c.decrypt_str(&encrypted).unwrap(), "exactly16bytes!!");
    }

    #[test]
    fn decrypts_round_trip() {
        let c = cipher();
        for text in ["555-0100", "Hà Nội, Việt Nam", "a much longer address line that spans blocks"] {
            let encrypted = c.encrypt_str(text);
            assert_ne!(encrypted.as_str(), text);
            assert_eq!(c.decrypt_str(&encrypted).unwrap(), text);
        }
    }

    #[test]
    fn none_and_empty_short_circuit() {
        let c = cipher();
        assert_eq!(c.encrypt(None), None);
        assert_eq!(c.encrypt(Some("")), Some(stored("")));
        assert_eq!(c.decrypt(None).unwrap(), None);
        assert_eq!(c.decrypt(Some(&stored(""))).unwrap(), Some(String::new()));
    }

    #[test]
    fn encryption_is_deterministic() {
        let c = cipher();
        assert_eq!(c.encrypt_str("555-0100"), c.encrypt_str("555-0100"));
        assert_ne!(c.encrypt_str("A"), c.encrypt_str("B"));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let err = cipher().decrypt_str(&stored("8tmkR+4PurdjglQG1qbUug==")).unwrap_err();
        assert!(matches!(err, Error::Decryption(DecryptFailure::Padding)));
    }

    #[test]
    fn wrong_block_length_fails() {
        let err = cipher().decrypt_str(&stored("QUJD")).unwrap_err();
        assert!(matches!(err, Error::Decryption(DecryptFailure::BlockLength(3))));
    }

    #[test]
    fn invalid_base64_fails() {
        let err = cipher().decrypt_str(&stored("not base64!")).unwrap_err();
        assert!(matches!(err, Error::Decryption(DecryptFailure::Base64(_))));
    }

    #[test]
    fn non_utf8_plaintext_fails() {
        let material = derive_key_material(&CipherConfig::default());
        let aes = Aes256::new(material.key().into());
        let bytes = cbc_encrypt(&aes, material.iv(), &[0xff, 0xfe, 0x00]);

        let err = cipher().decrypt_str(&stored(&STANDARD.encode(bytes))).unwrap_err();
        assert!(matches!(err, Error::Decryption(DecryptFailure::Utf8(_))));
        // The recovered bytes must not surface through the error.
        assert!(!format!("{err:?}").contains("255"));
    }

    #[test]
    fn padding_with_wrong_tail_byte_fails() {
        let material = derive_key_material(&CipherConfig::default());
        let aes = Aes256::new(material.key().into());
        let iv = material.iv();

        // A single block ending in 0x03 0x03 but with 0x02 before them.
        let mut block = AesBlock::clone_from_slice(&[
            b'a', b'b', b'c', b'd', b'e', b'f', b'g', b'h', b'i', b'j', b'k', b'l', b'm', 0x02,
            0x03, 0x03,
        ]);
        for (b, v) in block.iter_mut().zip(iv.iter()) {
            *b ^= v;
        }
        aes.encrypt_block(&mut block);

        let err = cbc_decrypt(&aes, iv, &block).unwrap_err();
        assert!(matches!(err, DecryptFailure::Padding));
    }

    #[test]
    fn foreign_key_fails() {
        let other = FieldCipher::new(
            CipherConfig::new("another-passphrase", DEFAULT_SALT, 10_000).unwrap(),
        );
        let err = other.decrypt_str(&stored("DdmkR+4PurdjglQG1qbUug==")).unwrap_err();
        assert!(matches!(err, Error::Decryption(_)));
    }

    #[test]
    fn salt_override_changes_ciphertext() {
        let salted = FieldCipher::new(
            CipherConfig::new(crate::config::DEFAULT_PASSPHRASE, std::array::from_fn(|i| i as u8), 10_000)
                .unwrap(),
        );
        assert_eq!(salted.encrypt_str("555-0100").as_str(), "R8WqOoCovgaBkdAQuiP7UA==");
    }
}
