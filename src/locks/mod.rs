//! Cooperative file locking over a shared filesystem.
//!
//! A resource file `token.vdf` is locked by creating a marker file
//! `token.vdf.lock` whose content is the holder's serialized
//! [`LockIdentity`]:
//!
//! ```text
//! 1760612345123456789_BUILD-01_0
//! ```
//!
//! Marker existence means "locked"; marker content says by whom. Holders
//! are compared under a [`CompareMask`]; the default compares only the host,
//! so a lock written by one process on a machine counts as held by any other
//! process on that machine. Use [`CompareMask::ALL`] for per-handle precision.
//!
//! # Crash behaviour
//!
//! A process that dies while holding a lock leaves its marker behind. The
//! lock stays orphaned until someone steals it with `force` or clears it
//! (`tokenlock lock clear`).

mod identity;
mod resource_lock;


pub use identity::{CompareMask, DELIMITER, IdentityFactory, IdentityField, LockIdentity};
pub use resource_lock::{CreateMode, MARKER_SUFFIX, ResourceLock, RetryPolicy};
