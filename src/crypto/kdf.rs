use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{IV_LEN, KEY_LEN};
use crate::config::CipherConfig;

/// AES key and IV drawn from a single PBKDF2-HMAC-SHA256 output stream.
///
/// The key occupies the first 32 bytes and the IV the following 16, so the
/// pair matches a derivation that reads the key and then the IV from the same
/// generator. Both are wiped when the value is dropped.
pub struct KeyMaterial {
    key: Zeroizing<[u8; KEY_LEN]>,
    iv: Zeroizing<[u8; IV_LEN]>,
}

impl KeyMaterial {
    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }
}

/// Derives the cipher key and IV from the configured passphrase and salt.
///
/// With a fixed passphrase and salt the output never changes, which is what
/// makes field ciphertexts deterministic.
pub fn derive_key_material(config: &CipherConfig) -> KeyMaterial {
    let mut okm = Zeroizing::new([0u8; KEY_LEN + IV_LEN]);
    pbkdf2_hmac::<Sha256>(
        config.passphrase().as_bytes(),
        config.salt(),
        config.iterations(),
        &mut okm[..],
    );

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&okm[..KEY_LEN]);
    let mut iv = Zeroizing::new([0u8; IV_LEN]);
    iv.copy_from_slice(&okm[KEY_LEN..]);

    KeyMaterial { key, iv }
}
