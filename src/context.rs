//! Token folder resolution for tokenlock.
//!
//! Every command works against one token folder, usually a network share.
//! This module turns the configured (or overridden) folder into the absolute
//! paths the pool, the journal and the event log live at:
//!
//! ```text
//! <token_folder>/                 scan mode: token files live here
//! <token_folder>/journal.json     journal mode: claim records
//! <token_folder>/Tokens/          journal mode: token files live here
//! <token_folder>/events.ndjson    audit log
//! ```

use crate::config::{Config, SelectionMode};
use crate::error::{Result, TokenError};
use crate::journal::{JOURNAL_FILE_NAME, TOKENS_DIR_NAME};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the audit log inside the token folder.
pub const EVENTS_FILE_NAME: &str = "events.ndjson";

/// Resolved paths for one token folder. All paths are absolute.
#[derive(Debug, Clone)]
pub struct TokenContext {
    /// The token folder itself.
    pub token_folder: PathBuf,

    /// Directory whose files are checkout candidates.
    pub pool_dir: PathBuf,

    /// Journal file (only used in journal mode).
    pub journal_path: PathBuf,

    pub events_file: PathBuf,

    pub mode: SelectionMode,
}

impl TokenContext {
    /// Resolve the context from the current working directory.
    ///
    /// `folder` overrides `config.token_folder` when given.
    pub fn resolve(config: &Config, folder: Option<&Path>) -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            TokenError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd, config, folder)
    }

    /// Resolve the context with relative folders taken from `cwd`.
    pub fn resolve_from(cwd: &Path, config: &Config, folder: Option<&Path>) -> Result<Self> {
        let folder = folder.unwrap_or_else(|| Path::new(&config.token_folder));
        let token_folder = if folder.is_absolute() {
            folder.to_path_buf()
        } else {
            cwd.join(folder)
        };

        let pool_dir = match config.strategy {
            SelectionMode::Scan => token_folder.clone(),
            SelectionMode::Journal => token_folder.join(TOKENS_DIR_NAME),
        };

        Ok(Self {
            journal_path: token_folder.join(JOURNAL_FILE_NAME),
            events_file: token_folder.join(EVENTS_FILE_NAME),
            pool_dir,
            token_folder,
            mode: config.strategy,
        })
    }

    /// Folder the journal's token files live in, whatever the configured
    /// strategy.
    pub fn journal_tokens_dir(&self) -> PathBuf {
        self.token_folder.join(TOKENS_DIR_NAME)
    }

    /// Fail with a user error if the token folder cannot be reached.
    ///
    /// A missing share is the most common failure on build agents, so it is
    /// reported before any lock is attempted.
    pub fn ensure_reachable(&self) -> Result<()> {
        if !self.token_folder.is_dir() {
            return Err(TokenError::UserError(format!(
                "unable to reach the token folder '{}'.\n\
                 Check that the share is mounted or pass --folder.",
                self.token_folder.display()
            )));
        }
        Ok(())
    }
}

/// `user@HOST` string recorded as the owner of journal claims.
pub fn owner_string(host: &str) -> String {
    let user = env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{}@{}", user, host)
}
