//! Lock-guarded record of which pool resource is checked out to whom.
//!
//! The journal is a single JSON file holding an array of entries:
//!
//! ```json
//! [
//!   { "inUse": true,  "username": "ci@BUILD-01", "tokenFileName": "uploader1.vdf" },
//!   { "inUse": false, "username": null,          "tokenFileName": "uploader2.vdf" }
//! ]
//! ```
//!
//! It is guarded by its own [`ResourceLock`] (marker `journal.json.lock`).
//! Every mutation must follow
//! `guard.safe_lock() → Journal::load(guard) → mutate → save() → unlock`.
//! Skipping the guard is not detected beyond the check in [`Journal::save`].

#[cfg(test)]
mod tests;

use crate::error::{Result, TokenError};
use crate::locks::ResourceLock;
use crate::pool::{CheckoutCriteria, list_candidates};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default journal file name inside the token folder.
pub const JOURNAL_FILE_NAME: &str = "journal.json";

/// Folder next to the journal that holds the token files it tracks.
pub const TOKENS_DIR_NAME: &str = "Tokens";

/// One tracked resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    #[serde(default)]
    pub in_use: bool,

    /// Who has the resource checked out (`user@HOST`).
    #[serde(rename = "username", default)]
    pub owner: Option<String>,

    #[serde(rename = "tokenFileName", default)]
    pub file_name: Option<String>,
}

impl ResourceEntry {
    /// A free entry for `file_name`.
    pub fn available(file_name: impl Into<String>) -> Self {
        Self {
            in_use: false,
            owner: None,
            file_name: Some(file_name.into()),
        }
    }

    fn is_named(&self, name: &str) -> bool {
        self.file_name.as_deref() == Some(name)
    }
}

/// In-memory copy of the journal, tied to the guard lock it was loaded under.
#[derive(Debug)]
pub struct Journal {
    entries: Vec<ResourceEntry>,
    guard: ResourceLock,
}

impl Journal {
    /// Read the journal guarded by `guard`, which must already be held.
    ///
    /// Returns `Ok(None)` if the file is not valid journal JSON; the guard is
    /// dropped in that case. Returns [`TokenError::GuardNotHeld`] if the guard
    /// is not held.
    pub fn load(guard: ResourceLock) -> Result<Option<Journal>> {
        let Some(content) = guard.read_protected()? else {
            return Err(TokenError::GuardNotHeld(guard.resource_path().to_path_buf()));
        };

        let Ok(entries) = serde_json::from_str::<Vec<ResourceEntry>>(&content) else {
            return Ok(None);
        };

        Ok(Some(Journal { entries, guard }))
    }

    /// Start a journal in memory with the given entries. Nothing is written
    /// until [`Journal::save`].
    pub fn create(guard: ResourceLock, entries: Vec<ResourceEntry>) -> Result<Journal> {
        if !guard.has_lock(guard.mask())? {
            return Err(TokenError::GuardNotHeld(guard.resource_path().to_path_buf()));
        }
        Ok(Journal { entries, guard })
    }

    /// One free entry per resource file in `dir` with the given extension.
    pub fn seed_from_dir(dir: &Path, extension: &str) -> Result<Vec<ResourceEntry>> {
        Ok(list_candidates(dir, extension)?
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| ResourceEntry::available(name.to_string_lossy()))
            .collect())
    }

    /// Write the journal back. Returns `false`, leaving the file untouched,
    /// if the guard lock is no longer held.
    pub fn save(&self) -> Result<bool> {
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| {
            TokenError::UserError(format!("failed to serialize journal: {}", e))
        })?;
        self.guard.write_protected(&json)
    }

    /// Claim the first free entry matching `criteria` for `owner`.
    ///
    /// With `criteria.specific`, only that entry is considered, and `force`
    /// takes it even if it is in use. Without it, the first free entry in
    /// journal order wins and `force` is ignored. Only mutates memory; call
    /// [`Journal::save`] to persist.
    pub fn try_acquire_entry(
        &mut self,
        criteria: &CheckoutCriteria,
        owner: &str,
    ) -> Option<(String, usize)> {
        let index = match criteria.specific.as_deref() {
            Some(name) => self
                .entries
                .iter()
                .position(|e| e.is_named(name) && (!e.in_use || criteria.force))?,
            None => self
                .entries
                .iter()
                .position(|e| !e.in_use && e.file_name.is_some())?,
        };

        let entry = &mut self.entries[index];
        entry.in_use = true;
        entry.owner = Some(owner.to_string());
        entry.file_name.clone().map(|name| (name, index))
    }

    /// Mark `file_name` free again. With `owner`, only a claim held by that
    /// owner is cleared. Returns whether an entry changed.
    pub fn release_entry(&mut self, file_name: &str, owner: Option<&str>) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.is_named(file_name)) else {
            return false;
        };
        if !entry.in_use {
            return false;
        }
        if let Some(owner) = owner
            && entry.owner.as_deref() != Some(owner)
        {
            return false;
        }

        entry.in_use = false;
        entry.owner = None;
        true
    }

    pub fn entry_owned_by(&self, file_name: &str, owner: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.is_named(file_name) && e.in_use && e.owner.as_deref() == Some(owner))
    }

    /// Add entries for files not yet tracked. Returns how many were added.
    pub fn merge_entries(&mut self, entries: Vec<ResourceEntry>) -> usize {
        let mut added = 0;
        for entry in entries {
            let known = entry
                .file_name
                .as_deref()
                .is_some_and(|name| self.entries.iter().any(|e| e.is_named(name)));
            if !known {
                self.entries.push(entry);
                added += 1;
            }
        }
        added
    }

    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    /// Give the guard back, e.g. to unlock it after saving.
    pub fn into_guard(self) -> ResourceLock {
        self.guard
    }
}
