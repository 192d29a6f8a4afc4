//! Cryptographic primitives for user records.
//!
//! Provides password hashing, key derivation and the field cipher.

pub mod cipher;
pub mod hasher;
pub mod kdf;

pub use cipher::{Ciphertext, FieldCipher};
pub use hasher::{Argon2idPhc, CredentialHasher, PasswordHashStrategy, Sha256Base64};
pub use kdf::{KeyMaterial, derive_key_material};

/// Length of the key derivation salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the AES-256 key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the CBC initialization vector (one AES block).
pub const IV_LEN: usize = 16;
/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;
/// PBKDF2 iteration count applied unless configured otherwise.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 10_000;
