//! Filesystem helpers for tokenlock.
//!
//! Token files and the journal live on a share that several machines write
//! to, so every content write goes through a temp file and a rename.

pub mod atomic;
mod copy;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
pub use copy::copy_file;
