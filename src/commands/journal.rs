//! Implementation of the `tokenlock journal` commands.

use super::Session;
use crate::error::{Result, TokenError};
use crate::events::EventAction;
use crate::journal::{Journal, ResourceEntry};
use crate::locks::CompareMask;
use serde_json::json;

/// Outcome of `journal init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct JournalInit {
    pub created: bool,
    pub added: usize,
    pub total: usize,
}

/// Execute the `tokenlock journal init` command.
pub fn cmd_journal_init(session: &Session) -> Result<()> {
    let init = run_journal_init(session)?;

    if init.created {
        println!(
            "Created journal {} with {} token(s).",
            session.ctx.journal_path.display(),
            init.total
        );
    } else if init.added > 0 {
        println!(
            "Added {} token(s) to {} ({} total).",
            init.added,
            session.ctx.journal_path.display(),
            init.total
        );
    } else {
        println!("Journal already tracks all {} token(s).", init.total);
    }

    Ok(())
}

/// Create the journal from the token files, or add entries for token files
/// it does not track yet. Existing entries are never changed.
pub(super) fn run_journal_init(session: &Session) -> Result<JournalInit> {
    session.ctx.ensure_reachable()?;

    let tokens_dir = session.ctx.journal_tokens_dir();
    if !tokens_dir.is_dir() {
        return Err(TokenError::UserError(format!(
            "token folder has no '{}' directory to build a journal from",
            tokens_dir.display()
        )));
    }
    let seed = Journal::seed_from_dir(&tokens_dir, &session.config.extension)?;

    let journal_path = &session.ctx.journal_path;
    let settings = session.settings();
    let mut guard = settings.lock_for(journal_path).with_mask(CompareMask::ALL);
    if !guard.safe_lock_with(&settings.retry, CompareMask::ALL)? {
        return Err(TokenError::UnableToAcquire(journal_path.clone()));
    }

    let created = !journal_path.exists();
    let (journal, added) = if created {
        let added = seed.len();
        (Journal::create(guard, seed)?, added)
    } else {
        let mut journal =
            Journal::load(guard)?.ok_or_else(|| TokenError::JournalCorrupt(journal_path.clone()))?;
        let added = journal.merge_entries(seed);
        (journal, added)
    };

    if (created || added > 0) && !journal.save()? {
        return Err(TokenError::LockLost(journal_path.clone()));
    }
    let total = journal.entries().len();
    journal.into_guard().unlock(false, CompareMask::ALL)?;

    let init = JournalInit {
        created,
        added,
        total,
    };

    if created || added > 0 {
        session.record(session.event(EventAction::JournalInit).with_details(json!({
            "journal": journal_path.display().to_string(),
            "created": created,
            "added": added,
            "total": total,
        })));
    }

    Ok(init)
}

/// Execute the `tokenlock journal show` command.
pub fn cmd_journal_show(session: &Session) -> Result<()> {
    let entries = read_journal(session)?;

    if entries.is_empty() {
        println!("Journal is empty.");
        return Ok(());
    }

    println!("{:24} {:6} OWNER", "TOKEN", "IN USE");
    for entry in &entries {
        println!(
            "{:24} {:6} {}",
            entry.file_name.as_deref().unwrap_or("-"),
            if entry.in_use { "yes" } else { "no" },
            entry.owner.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

pub(super) fn read_journal(session: &Session) -> Result<Vec<ResourceEntry>> {
    session.ctx.ensure_reachable()?;
    session.journal_strategy(session.settings()).snapshot()
}
