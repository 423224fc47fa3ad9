//! Checkout provenance sidecars.
//!
//! A checked-out target `out/config.vdf` gets a sidecar `out/config.vdf.checkout`
//! holding the absolute path of the pool resource it was copied from, so a
//! later process can check it back in.

use crate::error::{Result, TokenError};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Suffix appended to a target path to form its sidecar path.
pub const SIDECAR_SUFFIX: &str = ".checkout";

pub fn sidecar_path(target: &Path) -> PathBuf {
    let mut sidecar = OsString::from(target.as_os_str());
    sidecar.push(SIDECAR_SUFFIX);
    PathBuf::from(sidecar)
}

/// Record that `target` was copied from `resource`.
pub fn write(target: &Path, resource: &Path) -> Result<()> {
    crate::fs::atomic_write_file(sidecar_path(target), &resource.to_string_lossy())
}

/// The resource `target` was copied from, or `None` if no checkout is recorded.
pub fn read(target: &Path) -> Result<Option<PathBuf>> {
    let sidecar = sidecar_path(target);
    match fs::read_to_string(&sidecar) {
        Ok(content) => {
            let content = content.trim();
            Ok((!content.is_empty()).then(|| PathBuf::from(content)))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(TokenError::io("failed to read checkout sidecar", &sidecar, e)),
    }
}

pub fn exists(target: &Path) -> bool {
    sidecar_path(target).exists()
}

pub fn remove(target: &Path) -> Result<()> {
    let sidecar = sidecar_path(target);
    match fs::remove_file(&sidecar) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TokenError::io("failed to remove checkout sidecar", &sidecar, e)),
    }
}
