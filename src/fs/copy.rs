//! Copying resources between the pool and a checkout target.

use crate::error::{Result, TokenError};
use std::fs;
use std::path::Path;

/// Copy `source` onto `destination` byte-for-byte.
///
/// The destination is replaced atomically and its parent directories are
/// created as needed. Returns the number of bytes copied.
pub fn copy_file<P: AsRef<Path>, Q: AsRef<Path>>(source: P, destination: Q) -> Result<u64> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    let content =
        fs::read(source).map_err(|e| TokenError::io("failed to read source file", source, e))?;

    crate::fs::atomic_write(destination, &content)?;

    Ok(content.len() as u64)
}
