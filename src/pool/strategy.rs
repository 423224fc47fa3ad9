//! Ways of claiming a pool resource.

use super::{ResourceStatus, Selection};
use crate::error::{Result, TokenError};
use crate::journal::{Journal, ResourceEntry, TOKENS_DIR_NAME};
use crate::locks::{CompareMask, CreateMode, IdentityFactory, ResourceLock, RetryPolicy};
use crate::pool::CheckoutCriteria;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A claimed resource. `lock` is set when the claim is a per-resource lock.
#[derive(Debug)]
pub struct Claim {
    pub resource: PathBuf,
    pub lock: Option<ResourceLock>,
}

/// How locks are built and compared.
#[derive(Debug, Clone)]
pub struct LockSettings {
    pub factory: Arc<IdentityFactory>,
    /// Mask used to recognise an existing claim as ours (check-in, status).
    pub mask: CompareMask,
    pub create_mode: CreateMode,
    pub retry: RetryPolicy,
}

impl LockSettings {
    pub fn lock_for(&self, resource: &Path) -> ResourceLock {
        ResourceLock::new(resource, &self.factory)
            .with_mask(self.mask)
            .with_create_mode(self.create_mode)
    }
}

/// Claims, re-confirms and releases pool resources.
pub trait SelectionStrategy {
    fn name(&self) -> &'static str;

    /// Claim one of `candidates` according to `selection`.
    fn claim(&mut self, pool_dir: &Path, candidates: &[PathBuf], selection: &Selection)
    -> Result<Claim>;

    /// Re-confirm a claim made earlier, possibly by another process on this
    /// machine. `claim.lock` is the in-process lock from the checkout, if
    /// any. Never claims anew: a claim that is no longer ours fails with
    /// [`TokenError::LockLost`]. On success the claim survives being dropped.
    fn reclaim(&mut self, claim: &mut Claim) -> Result<()>;

    /// Give the resource back to the pool. On failure `claim` is unchanged.
    fn release(&mut self, claim: &mut Claim) -> Result<()>;

    fn status(&self, candidates: &[PathBuf]) -> Result<Vec<ResourceStatus>>;
}

/// One marker file per resource. The reference policy: a specific resource
/// is tried with `force` and then retried; otherwise the first lockable
/// resource in listing order wins and nothing is ever stolen.
#[derive(Debug)]
pub struct DirectoryScan {
    settings: LockSettings,
}

impl DirectoryScan {
    pub fn new(settings: LockSettings) -> Self {
        Self { settings }
    }
}

impl SelectionStrategy for DirectoryScan {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn claim(
        &mut self,
        pool_dir: &Path,
        candidates: &[PathBuf],
        selection: &Selection,
    ) -> Result<Claim> {
        // A fresh claim must never adopt a marker some other handle wrote,
        // even one from this machine.
        let mask = CompareMask::ALL;

        match selection {
            Selection::Specific { path, force } => {
                let mut lock = self.settings.lock_for(path);
                let held = lock.try_lock(*force, mask)?
                    || lock.safe_lock_with(&self.settings.retry, mask)?;
                if !held {
                    return Err(TokenError::UnableToAcquire(path.clone()));
                }
                Ok(Claim {
                    resource: path.clone(),
                    lock: Some(lock),
                })
            }
            Selection::Any => {
                for path in candidates {
                    let mut lock = self.settings.lock_for(path);
                    if lock.try_lock(false, mask)? {
                        return Ok(Claim {
                            resource: path.clone(),
                            lock: Some(lock),
                        });
                    }
                }
                Err(TokenError::PoolExhausted(pool_dir.to_path_buf()))
            }
        }
    }

    fn reclaim(&mut self, claim: &mut Claim) -> Result<()> {
        let resource = &claim.resource;
        let lock = match claim.lock.take() {
            Some(lock) if lock.resource_path() == resource => lock,
            _ => self.settings.lock_for(resource),
        };
        let lock = claim.lock.insert(lock);

        // The marker must still be the one written at checkout.
        if !lock.adopt(self.settings.mask)? {
            return Err(TokenError::LockLost(resource.clone()));
        }
        lock.set_persistent(true);
        Ok(())
    }

    fn release(&mut self, claim: &mut Claim) -> Result<()> {
        let Some(lock) = claim.lock.as_mut() else {
            return Err(TokenError::LockLost(claim.resource.clone()));
        };

        if !lock.unlock(false, self.settings.mask)? {
            return Err(TokenError::LockLost(claim.resource.clone()));
        }
        Ok(())
    }

    fn status(&self, candidates: &[PathBuf]) -> Result<Vec<ResourceStatus>> {
        candidates
            .iter()
            .map(|path| {
                Ok(ResourceStatus {
                    resource: path.clone(),
                    holder: ResourceLock::holder_of(path)?,
                })
            })
            .collect()
    }
}

/// Claims recorded in a single journal file, read and written under the
/// journal's guard lock. Resources live in the `Tokens` folder next to the
/// journal.
#[derive(Debug)]
pub struct JournalStrategy {
    settings: LockSettings,
    journal_path: PathBuf,
    owner: String,
}

impl JournalStrategy {
    pub fn new(settings: LockSettings, journal_path: impl Into<PathBuf>, owner: impl Into<String>) -> Self {
        Self {
            settings,
            journal_path: journal_path.into(),
            owner: owner.into(),
        }
    }

    /// Folder holding the token files this journal tracks.
    pub fn tokens_dir(&self) -> PathBuf {
        self.journal_path
            .parent()
            .unwrap_or(Path::new("."))
            .join(TOKENS_DIR_NAME)
    }

    /// Lock the journal, load it, apply `mutate`, save and unlock.
    ///
    /// If `mutate` fails nothing is saved. The guard lock uses the full
    /// identity mask: two processes on one machine must not share it.
    fn with_journal<T>(&self, mutate: impl FnOnce(&mut Journal) -> Result<T>) -> Result<T> {
        let mut journal = self.open_journal()?;
        let outcome = mutate(&mut journal)?;

        if !journal.save()? {
            return Err(TokenError::LockLost(self.journal_path.clone()));
        }
        journal.into_guard().unlock(false, CompareMask::ALL)?;

        Ok(outcome)
    }

    /// Lock and load the journal without changing it.
    pub fn snapshot(&self) -> Result<Vec<ResourceEntry>> {
        let journal = self.open_journal()?;
        let entries = journal.entries().to_vec();
        journal.into_guard().unlock(false, CompareMask::ALL)?;
        Ok(entries)
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    fn open_journal(&self) -> Result<Journal> {
        if !self.journal_path.is_file() {
            return Err(TokenError::NoJournal(self.journal_path.clone()));
        }

        let mut guard = self
            .settings
            .lock_for(&self.journal_path)
            .with_mask(CompareMask::ALL);
        if !guard.safe_lock_with(&self.settings.retry, CompareMask::ALL)? {
            return Err(TokenError::UnableToAcquire(self.journal_path.clone()));
        }

        Journal::load(guard)?.ok_or_else(|| TokenError::JournalCorrupt(self.journal_path.clone()))
    }

    fn file_name(resource: &Path) -> String {
        resource
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl SelectionStrategy for JournalStrategy {
    fn name(&self) -> &'static str {
        "journal"
    }

    fn claim(
        &mut self,
        pool_dir: &Path,
        _candidates: &[PathBuf],
        selection: &Selection,
    ) -> Result<Claim> {
        let criteria = match selection {
            Selection::Any => CheckoutCriteria::any(),
            Selection::Specific { path, force } => {
                CheckoutCriteria::specific(Self::file_name(path), *force)
            }
        };

        let file_name = self.with_journal(|journal| {
            journal
                .try_acquire_entry(&criteria, &self.owner)
                .map(|(name, _)| name)
                .ok_or_else(|| match selection {
                    Selection::Any => TokenError::PoolExhausted(pool_dir.to_path_buf()),
                    Selection::Specific { path, .. } => TokenError::UnableToAcquire(path.clone()),
                })
        })?;

        Ok(Claim {
            resource: pool_dir.join(file_name),
            lock: None,
        })
    }

    fn reclaim(&mut self, claim: &mut Claim) -> Result<()> {
        let file_name = Self::file_name(&claim.resource);
        self.with_journal(|journal| {
            if journal.entry_owned_by(&file_name, &self.owner) {
                Ok(())
            } else {
                Err(TokenError::LockLost(claim.resource.clone()))
            }
        })
    }

    fn release(&mut self, claim: &mut Claim) -> Result<()> {
        let file_name = Self::file_name(&claim.resource);
        self.with_journal(|journal| {
            if journal.release_entry(&file_name, Some(&self.owner)) {
                Ok(())
            } else {
                Err(TokenError::LockLost(claim.resource.clone()))
            }
        })
    }

    fn status(&self, candidates: &[PathBuf]) -> Result<Vec<ResourceStatus>> {
        let entries = self.snapshot()?;

        Ok(candidates
            .iter()
            .map(|path| {
                let name = Self::file_name(path);
                let holder = entries
                    .iter()
                    .find(|e| e.file_name.as_deref() == Some(name.as_str()) && e.in_use)
                    .map(|e| e.owner.clone().unwrap_or_else(|| "unknown".to_string()));
                ResourceStatus {
                    resource: path.clone(),
                    holder,
                }
            })
            .collect())
    }
}
