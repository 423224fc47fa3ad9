//! Implementation of the `tokenlock lock` commands.
//!
//! `lock clear` is the manual escape hatch for a marker left behind by a
//! crashed build: it removes the marker whoever wrote it, and logs what was
//! removed.

use super::Session;
use super::status::describe_holder;
use crate::cli::LockClearArgs;
use crate::error::{Result, TokenError};
use crate::events::EventAction;
use crate::locks::{CompareMask, LockIdentity, MARKER_SUFFIX, ResourceLock};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

/// A lock marker found in the token folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct MarkerInfo {
    pub resource: PathBuf,
    pub holder: Option<String>,
}

/// Execute the `tokenlock lock list` command.
pub fn cmd_lock_list(session: &Session) -> Result<()> {
    session.ctx.ensure_reachable()?;
    let markers = list_markers(session)?;

    if markers.is_empty() {
        println!("No active locks.");
        return Ok(());
    }

    println!("Active locks ({}):", markers.len());
    println!();

    for marker in &markers {
        let name = marker
            .resource
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        println!("  {}:", name);
        println!("    Holder:     {}", describe_holder(marker.holder.as_deref()));
        if let Some(identity) = marker.holder.as_deref().and_then(LockIdentity::parse) {
            println!(
                "    Created:    {}",
                identity.created_at().format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        println!(
            "    Path:       {}",
            ResourceLock::marker_path_for(&marker.resource).display()
        );
        println!();
    }

    println!("Use `tokenlock lock clear <name> --force` to remove a lock left by a crashed build.");

    Ok(())
}

/// Execute the `tokenlock lock clear` command.
pub fn cmd_lock_clear(session: &Session, args: LockClearArgs) -> Result<()> {
    let cleared = run_lock_clear(session, &args)?;

    println!("Cleared lock: {}", cleared.resource.display());
    println!("  Holder:     {}", describe_holder(cleared.holder.as_deref()));

    Ok(())
}

pub(super) fn run_lock_clear(session: &Session, args: &LockClearArgs) -> Result<MarkerInfo> {
    // Require --force flag
    if !args.force {
        return Err(TokenError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock hands the token to the next build even if its holder is still using it.\n\
             Only clear locks if you are certain the holder has crashed.\n\n\
             To clear the lock, run:\n  tokenlock lock clear {} --force",
            args.name
        )));
    }

    session.ctx.ensure_reachable()?;

    if args.name.contains(['/', '\\']) {
        return Err(TokenError::UserError(format!(
            "'{}' is not a token name; pass the file name only",
            args.name
        )));
    }

    let Some(resource) = resolve_locked(session, &args.name) else {
        return Err(TokenError::UserError(format!(
            "no lock marker found for '{}' in '{}'",
            args.name,
            session.ctx.pool_dir.display()
        )));
    };

    let mut lock = ResourceLock::new(&resource, session.factory());
    let holder = lock.holder()?;
    if !lock.unlock(true, CompareMask::ALL)? {
        return Err(TokenError::UserError(format!(
            "lock on '{}' was released before it could be cleared",
            resource.display()
        )));
    }

    let cleared = MarkerInfo { resource, holder };

    session.record(
        session
            .event(EventAction::LockClear)
            .with_resource(&cleared.resource)
            .with_details(json!({
                "holder": cleared.holder.as_deref().map(str::trim),
                "force": args.force,
            })),
    );

    Ok(cleared)
}

/// Every marker in the pool folder, plus the journal guard in journal mode.
pub(super) fn list_markers(session: &Session) -> Result<Vec<MarkerInfo>> {
    let mut dirs = vec![session.ctx.pool_dir.clone()];
    if session.ctx.token_folder != session.ctx.pool_dir {
        dirs.push(session.ctx.token_folder.clone());
    }

    let mut markers = Vec::new();
    for dir in dirs {
        if !dir.is_dir() {
            continue;
        }
        for resource in marked_resources(&dir)? {
            let holder = ResourceLock::holder_of(&resource)?;
            markers.push(MarkerInfo { resource, holder });
        }
    }

    markers.sort_by(|a, b| a.resource.cmp(&b.resource));
    Ok(markers)
}

/// Resources in `dir` that have a marker next to them.
fn marked_resources(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).map_err(|e| TokenError::io("failed to read lock directory", dir, e))?;

    let mut resources = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TokenError::io("failed to read lock directory", dir, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(resource) = name.strip_suffix(MARKER_SUFFIX)
            && !resource.is_empty()
            && entry.path().is_file()
        {
            resources.push(dir.join(resource));
        }
    }
    Ok(resources)
}

/// Find the locked resource `name` refers to: a pool token with or without
/// its extension, or a file in the token folder such as the journal.
fn resolve_locked(session: &Session, name: &str) -> Option<PathBuf> {
    let ctx = &session.ctx;
    let with_extension = format!("{}.{}", name, session.config.extension);

    [
        ctx.pool_dir.join(name),
        ctx.pool_dir.join(&with_extension),
        ctx.token_folder.join(name),
    ]
    .into_iter()
    .find(|resource| ResourceLock::marker_path_for(resource).is_file())
}
