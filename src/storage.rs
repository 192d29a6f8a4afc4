//! File-backed user store.

use anyhow::{Context, Result};
use getrandom::fill;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::model::{NewStoredUser, StoredProfile, StoredUser, UserId};
use crate::store::{MemoryStore, UserStore};

/// A [`UserStore`] that keeps its table in a JSON file.
///
/// The whole table is loaded on open and rewritten after every successful
/// insert or update. The in-memory table only changes once the write has
/// reached disk.
pub struct FileStore {
    path: PathBuf,
    table: MemoryStore,
}

impl FileStore {
    /// Opens the store at `path`, starting with an empty table if the file
    /// does not exist yet. The file is created on the first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = if path.exists() {
            let data = fs::read(&path)
                .with_context(|| format!("failed to read user store {}", path.display()))?;
            serde_json::from_slice(&data).context("user store file is corrupted")?
        } else {
            MemoryStore::new()
        };

        debug!(path = %path.display(), users = table.len(), "user store opened");
        Ok(Self { path, table })
    }

    /// Returns `true` if the store file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &MemoryStore {
        &self.table
    }

    /// Applies `change` to a copy of the table and persists it when the
    /// change reports that something was modified.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut MemoryStore) -> Result<T>,
        modified: impl Fn(&T) -> bool,
    ) -> Result<T> {
        let mut next = self.table.clone();
        let outcome = change(&mut next)?;
        if modified(&outcome) {
            self.save(&next)?;
            self.table = next;
        }
        Ok(outcome)
    }

    /// Writes the table using an atomic replace.
    ///
    /// The data goes to a uniquely named temporary file in the same
    /// directory, is synced, then renamed over the target and the directory
    /// is synced, so a crash leaves either the old or the new file.
    fn save(&self, table: &MemoryStore) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(table)?;
        let tmp_path = self.random_tmp_path()?;

        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .context("failed to create temporary file")?;
        tmp_file.write_all(&data)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e).context("failed to replace user store");
        }

        #[cfg(unix)]
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            File::open(parent)?.sync_all()?;
        }

        Ok(())
    }

    /// Generates `<file>.tmp.<randomhex>` next to the store file.
    fn random_tmp_path(&self) -> Result<PathBuf> {
        let mut buf = [0u8; 8];
        fill(&mut buf).map_err(|e| anyhow::anyhow!("OS random generator unavailable: {e}"))?;
        let suffix: String = buf.iter().map(|b| format!("{b:02x}")).collect();

        let file_name = self
            .path
            .file_name()
            .context("user store path has no file name")?
            .to_string_lossy();

        Ok(self.path.with_file_name(format!("{file_name}.tmp.{suffix}")))
    }
}

impl UserStore for FileStore {
    fn insert(&mut self, user: NewStoredUser) -> Result<bool> {
        self.commit(|table| table.insert(user), |inserted| *inserted)
    }

    fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>> {
        self.table.find_by_username(username)
    }

    fn find_by_id(&self, id: UserId) -> Result<Option<StoredUser>> {
        self.table.find_by_id(id)
    }

    fn update(&mut self, profile: StoredProfile) -> Result<u64> {
        self.commit(|table| table.update(profile), |affected| *affected > 0)
    }
}
