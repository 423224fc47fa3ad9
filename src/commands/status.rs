//! Implementation of the `tokenlock status` command.
//!
//! Lists every token in the pool with its holder, and the last audit event
//! recorded for it when the event log is enabled.

use super::Session;
use crate::error::Result;
use crate::events::{Event, read_events};
use crate::locks::LockIdentity;
use crate::pool::ResourceStatus;
use std::collections::HashMap;

/// Execute the `tokenlock status` command.
pub fn cmd_status(session: &Session) -> Result<()> {
    session.ctx.ensure_reachable()?;

    let pool = session.pool(session.settings())?;
    let statuses = pool.status()?;
    let last_events = if session.config.events_enabled {
        last_event_per_resource(read_events(&session.ctx.events_file)?)
    } else {
        HashMap::new()
    };

    println!("Token Status");
    println!("============");
    println!();
    println!("Folder:   {}", pool.pool_dir().display());
    println!("Strategy: {}", pool.strategy_name());
    println!();

    if statuses.is_empty() {
        println!("No .{} tokens found.", pool.extension());
        return Ok(());
    }

    let held = statuses.iter().filter(|s| s.holder.is_some()).count();
    for status in &statuses {
        let name = file_name(status);
        println!("  {:24} {}", name, describe_holder(status.holder.as_deref()));
        if let Some(event) = last_events.get(&name) {
            println!(
                "  {:24} last: {} by {} at {}",
                "",
                event.action,
                event.actor,
                event.ts.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }
    println!();
    println!("{} of {} token(s) checked out.", held, statuses.len());

    Ok(())
}

/// One-line description of a holder as shown by `status` and `lock list`.
///
/// Marker contents are decoded into host, ticket and age; anything else
/// (journal owners, unreadable markers) is shown as is.
pub(super) fn describe_holder(holder: Option<&str>) -> String {
    let Some(holder) = holder else {
        return "available".to_string();
    };

    match LockIdentity::parse(holder) {
        Some(identity) => format!(
            "held by {} (ticket {}, {} ago)",
            identity.host(),
            identity.ticket(),
            identity.age_string()
        ),
        None => format!("held by {}", holder.trim()),
    }
}

fn last_event_per_resource(events: Vec<Event>) -> HashMap<String, Event> {
    let mut last = HashMap::new();
    for event in events {
        if let Some(resource) = event.resource.clone() {
            last.insert(resource, event);
        }
    }
    last
}

fn file_name(status: &ResourceStatus) -> String {
    status
        .resource
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
