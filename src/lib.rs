//! Password hashing and field-level encryption for user records at rest.
//!
//! Three pieces compose top-down:
//!
//! - [`CredentialHasher`] hashes and verifies passwords.
//! - [`FieldCipher`] encrypts and decrypts PII fields such as phone and
//!   address.
//! - [`RecordCryptoOrchestrator`] applies both around a [`UserStore`], so
//!   plaintext PII is never written and stored ciphertext is decrypted before
//!   it reaches a caller.
//!
//! ```no_run
//! use secureinfo::{CredentialHasher, FieldCipher, MemoryStore, NewUser, RecordCryptoOrchestrator};
//!
//! let hasher = CredentialHasher::default();
//! let cipher = FieldCipher::default();
//! let mut records = RecordCryptoOrchestrator::new(&hasher, &cipher, MemoryStore::new());
//!
//! records.register(NewUser::new("alice", "Secr3t!").with_phone("555-0100"))?;
//! let user = records.authenticate_and_fetch("alice", "Secr3t!")?.expect("valid login");
//! let profile = records.fetch_decrypted(user.id)?.expect("user exists");
//! assert_eq!(profile.phone.as_deref(), Some("555-0100"));
//! # Ok::<(), secureinfo::Error>(())
//! ```

pub mod config;
pub mod crypto;
mod error;
pub mod model;
mod records;
mod storage;
mod store;

pub use crate::config::CipherConfig;
pub use crate::crypto::{
    Argon2idPhc, Ciphertext, CredentialHasher, FieldCipher, PasswordHashStrategy, Sha256Base64,
};
pub use crate::error::{DecryptFailure, Error, Result};
pub use crate::model::{NewUser, ProfileUpdate, StoredUser, UserId, UserRecord};
pub use crate::records::RecordCryptoOrchestrator;
pub use crate::storage::FileStore;
pub use crate::store::{MemoryStore, UserStore};

use anyhow::Context;
use directories::ProjectDirs;
use std::path::PathBuf;

/// Location of the user store when none is given explicitly.
pub fn default_store_path() -> anyhow::Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "secureinfo")
        .context("could not determine platform directories")?;

    Ok(project_dirs.data_dir().join("users.json"))
}
