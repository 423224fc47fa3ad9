//! Error types for tokenlock.
//!
//! Uses thiserror for derive macros. Contention on a single lock is not an
//! error (it is reported as `Ok(false)`); these variants cover the cases a
//! caller cannot simply retry past.

use crate::exit_codes;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for tokenlock operations.
#[derive(Error, Debug)]
pub enum TokenError {
    /// A filesystem operation failed. Never swallowed by the lock layer.
    #[error("{context} '{}': {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The pool directory has no candidate resource files.
    #[error("no resources with extension '.{extension}' in '{}'", .dir.display())]
    NoCandidates { dir: PathBuf, extension: String },

    /// A specific resource was requested that is not part of the pool.
    #[error("resource '{0}' is not part of the pool")]
    UnknownResource(String),

    /// A specific resource could not be locked within the retry budget.
    #[error("unable to acquire '{}'", .0.display())]
    UnableToAcquire(PathBuf),

    /// A lock or journal claim held by this host disappeared before release.
    #[error("claim on '{}' was lost before it could be released", .0.display())]
    LockLost(PathBuf),

    /// Every candidate resource is currently checked out.
    #[error("all resources in '{}' are checked out", .0.display())]
    PoolExhausted(PathBuf),

    /// Check-in was requested for a target with no recorded checkout.
    #[error("no checkout recorded for '{}'", .0.display())]
    NoProvenance(PathBuf),

    /// A checkout record names a file outside the pool it is checked in to.
    #[error("checkout of '{}' points at '{}', outside the pool '{}'", .target.display(), .resource.display(), .pool_dir.display())]
    ForeignResource {
        target: PathBuf,
        resource: PathBuf,
        pool_dir: PathBuf,
    },

    /// The target already has an unresolved checkout.
    #[error("'{}' already has a checkout in progress; check it in first", .0.display())]
    CheckoutInProgress(PathBuf),

    /// A journal operation ran without holding the journal's guard lock.
    #[error("journal guard lock on '{}' is not held", .0.display())]
    GuardNotHeld(PathBuf),

    /// Journal mode is configured but the journal was never created.
    #[error("no journal at '{}'.\n\nRun `tokenlock journal init` to create one.", .0.display())]
    NoJournal(PathBuf),

    /// The journal file exists but could not be parsed.
    #[error("journal '{}' is corrupt", .0.display())]
    JournalCorrupt(PathBuf),

    /// Configuration could not be parsed or failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// User provided invalid arguments or the system is in an invalid state.
    #[error("{0}")]
    UserError(String),
}

impl TokenError {
    /// Wrap an I/O error with the operation and path it happened on.
    pub fn io(context: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        TokenError::Io {
            context,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            TokenError::Io { .. } => exit_codes::IO_FAILURE,
            TokenError::NoCandidates { .. } => exit_codes::USER_ERROR,
            TokenError::UnknownResource(_) => exit_codes::USER_ERROR,
            TokenError::UnableToAcquire(_) => exit_codes::LOCK_FAILURE,
            TokenError::PoolExhausted(_) => exit_codes::LOCK_FAILURE,
            TokenError::LockLost(_) => exit_codes::LOCK_FAILURE,
            TokenError::NoProvenance(_) => exit_codes::PROTOCOL_ERROR,
            TokenError::ForeignResource { .. } => exit_codes::PROTOCOL_ERROR,
            TokenError::CheckoutInProgress(_) => exit_codes::PROTOCOL_ERROR,
            TokenError::GuardNotHeld(_) => exit_codes::PROTOCOL_ERROR,
            TokenError::NoJournal(_) => exit_codes::USER_ERROR,
            TokenError::JournalCorrupt(_) => exit_codes::IO_FAILURE,
            TokenError::Config(_) => exit_codes::CONFIG_ERROR,
            TokenError::UserError(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for tokenlock operations.
pub type Result<T> = std::result::Result<T, TokenError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_error_has_correct_exit_code() {
        let err = TokenError::io(
            "failed to read marker",
            "/share/a.vdf.lock",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.exit_code(), exit_codes::IO_FAILURE);
    }

    #[test]
    fn contention_errors_have_lock_exit_code() {
        assert_eq!(
            TokenError::PoolExhausted(PathBuf::from("/share")).exit_code(),
            exit_codes::LOCK_FAILURE
        );
        assert_eq!(
            TokenError::UnableToAcquire(PathBuf::from("/share/a.vdf")).exit_code(),
            exit_codes::LOCK_FAILURE
        );
    }

    #[test]
    fn misuse_errors_have_protocol_exit_code() {
        assert_eq!(
            TokenError::NoProvenance(PathBuf::from("out.vdf")).exit_code(),
            exit_codes::PROTOCOL_ERROR
        );
        assert_eq!(
            TokenError::GuardNotHeld(PathBuf::from("journal.json")).exit_code(),
            exit_codes::PROTOCOL_ERROR
        );
        let foreign = TokenError::ForeignResource {
            target: PathBuf::from("out.vdf"),
            resource: PathBuf::from("/etc/passwd"),
            pool_dir: PathBuf::from("/share"),
        };
        assert_eq!(foreign.exit_code(), exit_codes::PROTOCOL_ERROR);
    }

    #[test]
    fn missing_journal_is_user_error() {
        let err = TokenError::NoJournal(PathBuf::from("/share/journal.json"));
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert!(err.to_string().contains("tokenlock journal init"));
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = TokenError::io(
            "failed to read marker",
            "/share/a.vdf.lock",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "failed to read marker '/share/a.vdf.lock': denied"
        );

        let err = TokenError::NoCandidates {
            dir: PathBuf::from("/share"),
            extension: "vdf".to_string(),
        };
        assert_eq!(err.to_string(), "no resources with extension '.vdf' in '/share'");
    }
}
