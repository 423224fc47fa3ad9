//! Checkout and check-in of resources from a shared pool.
//!
//! A pool is a directory of resource files (Steam uploader tokens) with a
//! common extension. Checking out copies one resource to a caller-chosen
//! target and keeps it claimed until the target is checked back in, possibly
//! by a later process on the same machine:
//!
//! ```text
//! checkout: claim resource -> copy resource to target -> write target.checkout
//! checkin:  read target.checkout -> re-confirm claim -> copy target back
//!           -> release claim -> delete target.checkout
//! ```
//!
//! How a resource is claimed is up to the [`SelectionStrategy`]: one lock
//! file per resource ([`DirectoryScan`]) or a single shared journal
//! ([`JournalStrategy`]).

pub mod provenance;
mod strategy;


pub use strategy::{Claim, DirectoryScan, JournalStrategy, LockSettings, SelectionStrategy};

use crate::error::{Result, TokenError};
use crate::fs::copy_file;
use std::fs;
use std::path::{Path, PathBuf};

/// What the caller wants checked out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutCriteria {
    /// A specific resource by file name (with or without extension).
    pub specific: Option<String>,

    /// Steal the specific resource if someone else holds it. Never applied
    /// when any resource will do.
    pub force: bool,
}

impl CheckoutCriteria {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn specific(name: impl Into<String>, force: bool) -> Self {
        Self {
            specific: Some(name.into()),
            force,
        }
    }
}

/// A resolved request handed to a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// First available resource in listing order.
    Any,
    /// One resource, resolved to its path in the pool.
    Specific { path: PathBuf, force: bool },
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub resource: PathBuf,
    pub target: PathBuf,
}

/// Who currently holds a pool resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceStatus {
    pub resource: PathBuf,
    /// Marker content or journal owner; `None` when available.
    pub holder: Option<String>,
}

#[derive(Debug)]
struct HeldClaim {
    target: PathBuf,
    claim: Claim,
}

/// A pool of resource files with one active checkout per instance.
pub struct ResourcePool {
    pool_dir: PathBuf,
    extension: String,
    strategy: Box<dyn SelectionStrategy>,
    held: Option<HeldClaim>,
}

impl ResourcePool {
    pub fn new(
        pool_dir: impl AsRef<Path>,
        extension: impl Into<String>,
        strategy: Box<dyn SelectionStrategy>,
    ) -> Result<Self> {
        let pool_dir = pool_dir.as_ref();
        let pool_dir = std::path::absolute(pool_dir)
            .map_err(|e| TokenError::io("failed to resolve pool directory", pool_dir, e))?;

        Ok(Self {
            pool_dir,
            extension: extension.into(),
            strategy,
            held: None,
        })
    }

    pub fn pool_dir(&self) -> &Path {
        &self.pool_dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Candidate resource files in listing order.
    pub fn candidates(&self) -> Result<Vec<PathBuf>> {
        list_candidates(&self.pool_dir, &self.extension)
    }

    /// Claim a resource and copy it to `target`.
    pub fn checkout(&mut self, criteria: &CheckoutCriteria, target: &Path) -> Result<Checkout> {
        let target = absolute(target)?;

        if provenance::exists(&target) {
            return Err(TokenError::CheckoutInProgress(target));
        }
        if let Some(held) = &self.held {
            return Err(TokenError::CheckoutInProgress(held.target.clone()));
        }

        let candidates = self.candidates()?;
        if candidates.is_empty() {
            return Err(TokenError::NoCandidates {
                dir: self.pool_dir.clone(),
                extension: self.extension.clone(),
            });
        }

        let selection = self.resolve(criteria, &candidates)?;
        let mut claim = self.strategy.claim(&self.pool_dir, &candidates, &selection)?;
        let resource = claim.resource.clone();

        let recorded = copy_file(&resource, &target)
            .and_then(|_| provenance::write(&target, &resource));
        if let Err(e) = recorded {
            let _ = self.strategy.release(&mut claim);
            return Err(e);
        }

        if let Some(lock) = claim.lock.as_mut() {
            lock.set_persistent(true);
        }
        self.held = Some(HeldClaim {
            target: target.clone(),
            claim,
        });

        Ok(Checkout { resource, target })
    }

    /// Copy `target` back onto the resource it was checked out from and
    /// release the claim. Returns the resource path.
    ///
    /// The claim must still be the one made at checkout. If any step fails
    /// the sidecar is kept, and so is this instance's checkout.
    pub fn checkin(&mut self, target: &Path) -> Result<PathBuf> {
        let target = absolute(target)?;

        let Some(resource) = provenance::read(&target)? else {
            return Err(TokenError::NoProvenance(target));
        };
        if resource.parent() != Some(self.pool_dir.as_path()) {
            return Err(TokenError::ForeignResource {
                target,
                resource,
                pool_dir: self.pool_dir.clone(),
            });
        }

        let (mut claim, ours) = match self.held.take() {
            Some(held) if held.target == target && held.claim.resource == resource => {
                (held.claim, true)
            }
            other => {
                self.held = other;
                let claim = Claim {
                    resource: resource.clone(),
                    lock: None,
                };
                (claim, false)
            }
        };

        let returned = self
            .strategy
            .reclaim(&mut claim)
            .and_then(|()| copy_file(&target, &resource))
            .and_then(|_| self.strategy.release(&mut claim));
        if let Err(e) = returned {
            if ours {
                self.held = Some(HeldClaim { target, claim });
            }
            return Err(e);
        }

        provenance::remove(&target)?;
        Ok(resource)
    }

    /// Every candidate with its current holder.
    pub fn status(&self) -> Result<Vec<ResourceStatus>> {
        let candidates = self.candidates()?;
        self.strategy.status(&candidates)
    }

    fn resolve(&self, criteria: &CheckoutCriteria, candidates: &[PathBuf]) -> Result<Selection> {
        let Some(name) = criteria.specific.as_deref() else {
            return Ok(Selection::Any);
        };

        let with_extension = format!("{}.{}", name, self.extension);
        candidates
            .iter()
            .find(|path| {
                path.file_name()
                    .is_some_and(|file| file == name || file == with_extension.as_str())
            })
            .map(|path| Selection::Specific {
                path: path.clone(),
                force: criteria.force,
            })
            .ok_or_else(|| TokenError::UnknownResource(name.to_string()))
    }
}

/// Regular files in `dir` with extension `extension` (ASCII case-insensitive),
/// sorted by file name. Hidden files are skipped.
pub fn list_candidates(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).map_err(|e| TokenError::io("failed to read pool directory", dir, e))?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TokenError::io("failed to read pool directory", dir, e))?;
        let path = entry.path();

        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if hidden || !matches || !path.is_file() {
            continue;
        }

        candidates.push(path);
    }

    candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(candidates)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| TokenError::io("failed to resolve path", path, e))
}
