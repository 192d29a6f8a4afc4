//! Encrypt-before-write and decrypt-after-read for user records.
//!
//! [`RecordCryptoOrchestrator`] is the only place that decides which fields
//! are hashed or encrypted. Every path into the store goes through
//! [`FieldCipher::encrypt`] and every path out to a caller expecting
//! plaintext goes through [`FieldCipher::decrypt`].

use tracing::{debug, info, warn};

use crate::crypto::{CredentialHasher, FieldCipher};
use crate::error::{Error, Result};
use crate::model::{
    NewStoredUser, NewUser, ProfileUpdate, StoredProfile, StoredUser, UserId, UserRecord,
};
use crate::store::UserStore;

pub struct RecordCryptoOrchestrator<'a, S> {
    hasher: &'a CredentialHasher,
    cipher: &'a FieldCipher,
    store: S,
}

impl<'a, S: UserStore> RecordCryptoOrchestrator<'a, S> {
    pub fn new(hasher: &'a CredentialHasher, cipher: &'a FieldCipher, store: S) -> Self {
        Self {
            hasher,
            cipher,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Hashes the password, encrypts phone and address and inserts the user.
    ///
    /// Returns the store's success flag; `false` means nothing was inserted
    /// (for example a duplicate username).
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if username or password is blank, checked before
    /// any hashing or key derivation.
    pub fn register(&mut self, user: NewUser) -> Result<bool> {
        if user.username.trim().is_empty() {
            return Err(Error::validation("username is required"));
        }
        if user.password.trim().is_empty() {
            return Err(Error::validation("password is required"));
        }

        let password_hash = self.hasher.hash(&user.password)?;
        let record = NewStoredUser {
            phone: self.cipher.encrypt(user.phone.as_deref()),
            address: self.cipher.encrypt(user.address.as_deref()),
            username: user.username,
            password_hash,
            full_name: user.full_name,
            email: user.email,
        };

        let username = record.username.clone();
        let inserted = self
            .store
            .insert(record)
            .map_err(|e| Error::store("registering the user", e))?;

        if inserted {
            info!(%username, "user registered");
        } else {
            warn!(%username, "user was not registered");
        }
        Ok(inserted)
    }

    /// Returns the stored record when `password` matches.
    ///
    /// An unknown username and a wrong password both yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for a blank username or password and
    /// [`Error::Store`] if the lookup fails.
    pub fn authenticate_and_fetch(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<StoredUser>> {
        if username.trim().is_empty() {
            return Err(Error::validation("username is required"));
        }
        if password.trim().is_empty() {
            return Err(Error::validation("password is required"));
        }

        let stored = self
            .store
            .find_by_username(username)
            .map_err(|e| Error::store("verifying login credentials", e))?;

        match stored {
            Some(user) if self.hasher.verify(password, &user.password_hash) => {
                debug!(user_id = user.id, "authentication succeeded");
                Ok(Some(user))
            }
            _ => {
                warn!(%username, "authentication failed");
                Ok(None)
            }
        }
    }

    /// Boolean form of [`authenticate_and_fetch`](Self::authenticate_and_fetch).
    pub fn login(&self, username: &str, password: &str) -> Result<bool> {
        Ok(self.authenticate_and_fetch(username, password)?.is_some())
    }

    /// Raw lookup by username; phone and address stay encrypted.
    pub fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>> {
        if username.trim().is_empty() {
            return Err(Error::validation("username is required"));
        }
        self.store
            .find_by_username(username)
            .map_err(|e| Error::store("retrieving the user by username", e))
    }

    /// Raw lookup by id; phone and address stay encrypted.
    pub fn find_by_id(&self, id: UserId) -> Result<Option<StoredUser>> {
        ensure_valid_id(id)?;
        self.store
            .find_by_id(id)
            .map_err(|e| Error::store("retrieving the user by identifier", e))
    }

    /// Loads a user and decrypts phone and address.
    ///
    /// Empty or missing fields are passed through without touching the
    /// cipher.
    ///
    /// # Errors
    ///
    /// [`Error::Decryption`] if a stored field cannot be decrypted. A corrupt
    /// record is reported, never treated as missing.
    pub fn fetch_decrypted(&self, id: UserId) -> Result<Option<UserRecord>> {
        let Some(user) = self.find_by_id(id)? else {
            debug!(user_id = id, "user not found");
            return Ok(None);
        };

        let phone = self.cipher.decrypt(user.phone.as_ref())?;
        let address = self.cipher.decrypt(user.address.as_ref())?;

        Ok(Some(UserRecord {
            id: user.id,
            username: user.username,
            password_hash: user.password_hash,
            full_name: user.full_name,
            email: user.email,
            phone,
            address,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }))
    }

    /// Re-encrypts phone and address and writes the profile. The password
    /// hash is never touched.
    ///
    /// Returns `true` if a record was updated.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if the id is not positive.
    pub fn update_profile(&mut self, update: ProfileUpdate) -> Result<bool> {
        ensure_valid_id(update.id)?;

        let profile = StoredProfile {
            id: update.id,
            full_name: update.full_name,
            email: update.email,
            phone: self.cipher.encrypt(update.phone.as_deref()),
            address: self.cipher.encrypt(update.address.as_deref()),
        };

        let affected = self
            .store
            .update(profile)
            .map_err(|e| Error::store("updating the user information", e))?;

        if affected > 0 {
            info!(user_id = update.id, "profile updated");
        } else {
            debug!(user_id = update.id, "profile update affected no rows");
        }
        Ok(affected > 0)
    }
}

fn ensure_valid_id(id: UserId) -> Result<()> {
    if id <= 0 {
        return Err(Error::validation("user id must be greater than zero"));
    }
    Ok(())
}
