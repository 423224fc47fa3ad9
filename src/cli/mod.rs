//! CLI argument parsing for tokenlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tokenlock: check Steam uploader tokens in and out of a shared folder.
///
/// Build machines share a pool of token files on a network share. A token
/// is checked out by copying it to a target path while a lock marker next to
/// it tells every other machine it is taken, and checked back in (with any
/// refreshed content) once the upload is done.
#[derive(Parser, Debug)]
#[command(name = "tokenlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: ./tokenlock.yaml if present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Token folder, overriding `token_folder` from the config.
    #[arg(long, global = true)]
    pub folder: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for tokenlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a token out to a target path.
    ///
    /// Claims the named token, or the first free one, and copies it to the
    /// target. The claim is kept until `checkin` for the same target.
    Checkout(CheckoutArgs),

    /// Check a token back in.
    ///
    /// Copies the target back onto the token it came from and releases
    /// the claim.
    Checkin(CheckinArgs),

    /// Show every token and who holds it.
    Status,

    /// Lock marker commands.
    ///
    /// List or clear lock markers in the token folder.
    Lock(LockCommand),

    /// Journal commands (journal strategy only).
    Journal(JournalCommand),
}

/// Arguments for the `checkout` command.
#[derive(Parser, Debug)]
pub struct CheckoutArgs {
    /// Where to copy the token (e.g. Steam's config/config.vdf).
    #[arg(long)]
    pub target: PathBuf,

    /// Specific token to check out, with or without extension.
    #[arg(long)]
    pub token: Option<String>,

    /// Take the named token even if someone else holds it.
    #[arg(long, requires = "token")]
    pub force: bool,

    /// Retry budget for a busy token, overriding the config.
    #[arg(long)]
    pub retry_count: Option<u32>,
}

/// Arguments for the `checkin` command.
#[derive(Parser, Debug)]
pub struct CheckinArgs {
    /// Target that was passed to `checkout`.
    #[arg(long)]
    pub target: PathBuf,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List all lock markers with their holder and age.
    List,

    /// Remove a token's lock marker regardless of who holds it.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Token whose lock should be cleared, with or without extension.
    pub name: String,

    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Journal subcommands.
#[derive(Parser, Debug)]
pub struct JournalCommand {
    #[command(subcommand)]
    pub action: JournalAction,
}

/// Available journal actions.
#[derive(Subcommand, Debug)]
pub enum JournalAction {
    /// Create the journal from the files in `Tokens/`, or add entries for
    /// files it does not track yet.
    Init,

    /// Print the journal entries.
    Show,
}
