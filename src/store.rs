//! The persistence contract and an in-memory user table.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{NewStoredUser, StoredProfile, StoredUser, UserId};

/// Persistence collaborator for user records.
///
/// Implementations only ever see hashed passwords and encrypted PII. They own
/// id assignment and timestamps. Calls are synchronous and may block.
pub trait UserStore {
    /// Inserts a user, assigning its id and creation time. Returns `false`
    /// when nothing was inserted, e.g. because the username is taken.
    fn insert(&mut self, user: NewStoredUser) -> Result<bool>;

    fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>>;

    fn find_by_id(&self, id: UserId) -> Result<Option<StoredUser>>;

    /// Replaces full name, email, phone and address and stamps the update
    /// time. Returns the number of affected rows.
    fn update(&mut self, profile: StoredProfile) -> Result<u64>;
}

impl<S: UserStore + ?Sized> UserStore for &mut S {
    fn insert(&mut self, user: NewStoredUser) -> Result<bool> {
        (**self).insert(user)
    }

    fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>> {
        (**self).find_by_username(username)
    }

    fn find_by_id(&self, id: UserId) -> Result<Option<StoredUser>> {
        (**self).find_by_id(id)
    }

    fn update(&mut self, profile: StoredProfile) -> Result<u64> {
        (**self).update(profile)
    }
}

/// User table kept in memory. Ids are sequential from 1 and usernames are
/// unique (case-sensitive).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MemoryStore {
    users: BTreeMap<UserId, StoredUser>,
    last_id: UserId,
    creation_date: DateTime<Utc>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            users: BTreeMap::new(),
            last_id: 0,
            creation_date: Utc::now(),
        }
    }

    pub fn users(&self) -> impl Iterator<Item = &StoredUser> {
        self.users.values()
    }

    pub fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserStore for MemoryStore {
    fn insert(&mut self, user: NewStoredUser) -> Result<bool> {
        if self.users.values().any(|u| u.username == user.username) {
            return Ok(false);
        }

        self.last_id += 1;
        let id = self.last_id;
        self.users.insert(
            id,
            StoredUser {
                id,
                username: user.username,
                password_hash: user.password_hash,
                full_name: user.full_name,
                email: user.email,
                phone: user.phone,
                address: user.address,
                created_at: Utc::now(),
                updated_at: None,
            },
        );
        Ok(true)
    }

    fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>> {
        Ok(self
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn find_by_id(&self, id: UserId) -> Result<Option<StoredUser>> {
        Ok(self.users.get(&id).cloned())
    }

    fn update(&mut self, profile: StoredProfile) -> Result<u64> {
        match self.users.get_mut(&profile.id) {
            Some(user) => {
                user.full_name = profile.full_name;
                user.email = profile.email;
                user.phone = profile.phone;
                user.address = profile.address;
                user.updated_at = Some(Utc::now());
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
