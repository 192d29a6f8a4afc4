//! User record shapes on both sides of the persistence boundary.
//!
//! `Stored*` types are what the store sees: a password hash and
//! [`Ciphertext`] fields. [`NewUser`], [`ProfileUpdate`] and [`UserRecord`]
//! carry plaintext and never reach the store directly.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::Ciphertext;

/// Identity assigned by the store. Valid ids are positive.
pub type UserId = i64;

/// A user row as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Ciphertext>,
    pub address: Option<Ciphertext>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStoredUser {
    pub username: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Ciphertext>,
    pub address: Option<Ciphertext>,
}

/// Update payload; the store sets `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProfile {
    pub id: UserId,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Ciphertext>,
    pub address: Option<Ciphertext>,
}

/// Registration input with a plaintext password and plaintext PII.
#[derive(Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub password: Zeroizing<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl NewUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
            ..Self::default()
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("phone", &self.phone.as_ref().map(|_| "<redacted>"))
            .field("address", &self.address.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Profile edit with plaintext PII. Replaces all four fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub id: UserId,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A user with phone and address decrypted for display.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("phone", &self.phone.as_ref().map(|_| "<redacted>"))
            .field("address", &self.address.as_ref().map(|_| "<redacted>"))
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl From<UserRecord> for ProfileUpdate {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            full_name: record.full_name,
            email: record.email,
            phone: record.phone,
            address: record.address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_debug_hides_secrets() {
        let user = NewUser::new("alice", "Secr3t!")
            .with_phone("555-0100")
            .with_address("12 Main St");
        let rendered = format!("{user:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("Secr3t!"));
        assert!(!rendered.contains("555-0100"));
        assert!(!rendered.contains("12 Main St"));
    }

    #[test]
    fn user_record_debug_hides_decrypted_fields() {
        let record = UserRecord {
            id: 3,
            username: "alice".into(),
            password_hash: "B5maz6QSZlXQVJ2YBUelIGDk08xK3aDejEhlEBLshKo=".into(),
            full_name: Some("Alice".into()),
            email: None,
            phone: Some("555-0100".into()),
            address: Some("12 Main St".into()),
            created_at: Utc::now(),
            updated_at: None,
        };
        let rendered = format!("{record:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("555-0100"));
        assert!(!rendered.contains("12 Main St"));
        assert!(!rendered.contains("B5maz6"));
    }

    #[test]
    fn profile_update_from_record_keeps_fields() {
        let record = UserRecord {
            id: 7,
            username: "alice".into(),
            password_hash: "hash".into(),
            full_name: Some("Alice".into()),
            email: None,
            phone: Some("555-0100".into()),
            address: Some("A".into()),
            created_at: Utc::now(),
            updated_at: None,
        };
        let update = ProfileUpdate::from(record);
        assert_eq!(update.id, 7);
        assert_eq!(update.full_name.as_deref(), Some("Alice"));
        assert_eq!(update.phone.as_deref(), Some("555-0100"));
        assert_eq!(update.address.as_deref(), Some("A"));
    }
}
