//! Marker-file lock over a single resource file.

use super::identity::{CompareMask, IdentityFactory, LockIdentity};
use crate::error::{Result, TokenError};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Suffix appended to a resource path to form its marker path.
pub const MARKER_SUFFIX: &str = ".lock";

/// How a missing marker is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateMode {
    /// Exclusive create; fails if another writer created the marker first.
    #[default]
    Exclusive,
    /// Plain write followed by a re-read. Two racing writers both write and
    /// the last one wins. For shares where exclusive create is unreliable.
    LastWriterWins,
}

/// Retry budget for [`ResourceLock::safe_lock_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retry_count: u32,
    pub sleep: Duration,
}

impl RetryPolicy {
    pub fn new(retry_count: u32, sleep: Duration) -> Self {
        Self { retry_count, sleep }
    }
}

/// Lock over `resource_path`, held by whoever's identity is in the marker
/// file `resource_path + ".lock"`.
///
/// Marker existence means "someone believes they hold this lock"; the marker
/// content says who. Contention is reported as `Ok(false)`; filesystem
/// failures are returned as errors.
///
/// When dropped, a lock acquired through this handle is released unless the
/// handle is persistent. Drop only removes a marker carrying this handle's
/// exact identity, and ignores failures.
#[derive(Debug)]
pub struct ResourceLock {
    resource_path: PathBuf,
    marker_path: PathBuf,
    identity: LockIdentity,
    serialized: String,
    mask: CompareMask,
    create_mode: CreateMode,
    persistent: bool,
    acquired: bool,
}

impl ResourceLock {
    /// Create a handle with a fresh identity from `factory`. Touches nothing
    /// on disk.
    pub fn new(resource_path: impl Into<PathBuf>, factory: &IdentityFactory) -> Self {
        let resource_path = resource_path.into();
        let marker_path = Self::marker_path_for(&resource_path);
        let identity = factory.create();
        let serialized = identity.serialize();

        Self {
            resource_path,
            marker_path,
            identity,
            serialized,
            mask: CompareMask::default(),
            create_mode: CreateMode::default(),
            persistent: false,
            acquired: false,
        }
    }

    /// Set the mask used by the protected read/write helpers.
    pub fn with_mask(mut self, mask: CompareMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_create_mode(mut self, create_mode: CreateMode) -> Self {
        self.create_mode = create_mode;
        self
    }

    /// Marker path for a resource: the resource path with `.lock` appended.
    pub fn marker_path_for(resource_path: &Path) -> PathBuf {
        let mut marker = OsString::from(resource_path.as_os_str());
        marker.push(MARKER_SUFFIX);
        PathBuf::from(marker)
    }

    pub fn resource_path(&self) -> &Path {
        &self.resource_path
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }

    pub fn identity(&self) -> &LockIdentity {
        &self.identity
    }

    pub fn mask(&self) -> CompareMask {
        self.mask
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// A persistent lock survives this handle being dropped.
    pub fn set_persistent(&mut self, persistent: bool) {
        self.persistent = persistent;
    }

    /// Try once to acquire the lock.
    ///
    /// - No marker: create one with this identity, then re-read it.
    /// - Marker matches this identity under `mask`: already held, marker untouched.
    /// - Marker belongs to someone else: overwrite it if `force`, else `false`.
    pub fn try_lock(&mut self, force: bool, mask: CompareMask) -> Result<bool> {
        let held = match self.read_marker()? {
            None => match self.create_mode {
                CreateMode::Exclusive => {
                    if self.create_marker_exclusive()? {
                        self.has_lock(mask)?
                    } else {
                        // Lost the create race; judge the winner's marker.
                        match self.read_marker()? {
                            Some(content) => self.contend(&content, force, mask)?,
                            None => false,
                        }
                    }
                }
                CreateMode::LastWriterWins => {
                    self.write_marker()?;
                    self.has_lock(mask)?
                }
            },
            Some(content) => self.contend(&content, force, mask)?,
        };

        if held {
            self.acquired = true;
        }
        Ok(held)
    }

    /// Acquire, retrying up to `retry_count` more times with `sleep` between
    /// attempts. Never forces. Returns `false` once the budget is spent.
    pub fn safe_lock(&mut self, retry_count: u32, sleep: Duration, mask: CompareMask) -> Result<bool> {
        let mut remaining = retry_count;
        let mut held = self.try_lock(false, mask)?;

        while !held && remaining > 0 {
            remaining -= 1;
            thread::sleep(sleep);
            held = self.try_lock(false, mask)?;
        }

        Ok(held)
    }

    pub fn safe_lock_with(&mut self, policy: &RetryPolicy, mask: CompareMask) -> Result<bool> {
        self.safe_lock(policy.retry_count, policy.sleep, mask)
    }

    /// Take over a marker that already names this identity under `mask`.
    ///
    /// Never writes: a missing or foreign marker returns `false`. On success
    /// the handle counts as acquired, so a later drop may release it.
    pub fn adopt(&mut self, mask: CompareMask) -> Result<bool> {
        let held = self.has_lock(mask)?;
        if held {
            self.acquired = true;
        }
        Ok(held)
    }

    /// Whether the marker exists and names this identity under `mask`.
    pub fn has_lock(&self, mask: CompareMask) -> Result<bool> {
        Ok(self
            .read_marker()?
            .is_some_and(|content| self.identity.is_same(&content, mask)))
    }

    /// Release the lock.
    ///
    /// Returns `false` if there is no marker, or if `force` is not set and the
    /// marker belongs to someone else. Otherwise deletes the marker and
    /// returns whether it is now gone.
    pub fn unlock(&mut self, force: bool, mask: CompareMask) -> Result<bool> {
        let Some(content) = self.read_marker()? else {
            return Ok(false);
        };

        if !force && !self.identity.is_same(&content, mask) {
            return Ok(false);
        }

        match fs::remove_file(&self.marker_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(TokenError::io("failed to remove lock marker", &self.marker_path, e)),
        }

        self.acquired = false;
        Ok(!self.marker_path.exists())
    }

    /// Read the resource, only if this handle holds the lock.
    pub fn read_protected(&self) -> Result<Option<String>> {
        if !self.has_lock(self.mask)? {
            return Ok(None);
        }

        fs::read_to_string(&self.resource_path)
            .map(Some)
            .map_err(|e| TokenError::io("failed to read locked file", &self.resource_path, e))
    }

    /// Overwrite the resource, only if this handle holds the lock.
    pub fn write_protected(&self, content: &str) -> Result<bool> {
        if !self.has_lock(self.mask)? {
            return Ok(false);
        }

        crate::fs::atomic_write_file(&self.resource_path, content)?;
        Ok(true)
    }

    /// Raw marker content, or `None` when unlocked.
    pub fn holder(&self) -> Result<Option<String>> {
        self.read_marker()
    }

    /// Raw marker content for `resource_path` without creating a handle.
    pub fn holder_of(resource_path: &Path) -> Result<Option<String>> {
        read_marker_at(&Self::marker_path_for(resource_path))
    }

    fn contend(&self, content: &str, force: bool, mask: CompareMask) -> Result<bool> {
        if self.identity.is_same(content, mask) {
            return Ok(true);
        }
        if !force {
            return Ok(false);
        }

        self.write_marker()?;
        self.has_lock(mask)
    }

    fn read_marker(&self) -> Result<Option<String>> {
        read_marker_at(&self.marker_path)
    }

    fn write_marker(&self) -> Result<()> {
        crate::fs::atomic_write_file(&self.marker_path, &self.serialized)
    }

    /// Returns `Ok(false)` if the marker already exists.
    fn create_marker_exclusive(&self) -> Result<bool> {
        if let Some(parent) = self.marker_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .map_err(|e| TokenError::io("failed to create lock directory", parent, e))?;
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.marker_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(TokenError::io("failed to create lock marker", &self.marker_path, e)),
        };

        let written = file
            .write_all(self.serialized.as_bytes())
            .and_then(|()| file.sync_all());
        if let Err(e) = written {
            let _ = fs::remove_file(&self.marker_path);
            return Err(TokenError::io("failed to write lock marker", &self.marker_path, e));
        }

        Ok(true)
    }
}

fn read_marker_at(marker_path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(marker_path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(TokenError::io("failed to read lock marker", marker_path, e)),
    }
}

impl Drop for ResourceLock {
    fn drop(&mut self) {
        if self.acquired && !self.persistent {
            let _ = self.unlock(false, CompareMask::ALL);
        }
    }
}
