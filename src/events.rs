//! Audit log for tokenlock.
//!
//! Commands append one event per state change to `events.ndjson` in the
//! token folder, so the history of who held which token survives across
//! machines. Each line is a JSON object with these fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: `checkout`, `checkin`, `lock_clear` or `journal_init`
//! - `actor`: the owner string (`user@HOST`)
//! - `resource`: token file the event is about, if any
//! - `details`: freeform object with action-specific details
//!
//! Events are written after the state change has succeeded. A failed append
//! never rolls the change back; commands report it as a warning.

use crate::error::{Result, TokenError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Token copied out to a target
    Checkout,
    /// Token copied back and released
    Checkin,
    /// Lock marker removed by hand
    LockClear,
    /// Journal created or extended
    JournalInit,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Checkout => write!(f, "checkout"),
            EventAction::Checkin => write!(f, "checkin"),
            EventAction::LockClear => write!(f, "lock_clear"),
            EventAction::JournalInit => write!(f, "journal_init"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,

    pub action: EventAction,

    /// Who performed the action (`user@HOST`).
    pub actor: String,

    /// Token file name, for events about a single token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    pub details: Value,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(action: EventAction, actor: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor.into(),
            resource: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Record the token the event is about, by file name.
    pub fn with_resource(mut self, resource: &Path) -> Self {
        self.resource = resource
            .file_name()
            .map(|name| name.to_string_lossy().to_string());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| TokenError::UserError(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// Append `event` as one line to the log at `events_file`, creating the file
/// and its parent directory if needed.
pub fn append_event(events_file: &Path, event: &Event) -> Result<()> {
    let json_line = event.to_ndjson_line()?;

    if let Some(dir) = events_file.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        fs::create_dir_all(dir)
            .map_err(|e| TokenError::io("failed to create events directory", dir, e))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(events_file)
        .map_err(|e| TokenError::io("failed to open events file", events_file, e))?;

    writeln!(file, "{}", json_line)
        .map_err(|e| TokenError::io("failed to write event", events_file, e))?;

    file.sync_all()
        .map_err(|e| TokenError::io("failed to sync events file", events_file, e))?;

    Ok(())
}

/// Read every event in the log. Lines that fail to parse are skipped.
pub fn read_events(events_file: &Path) -> Result<Vec<Event>> {
    let content = match fs::read_to_string(events_file) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(TokenError::io("failed to read events file", events_file, e)),
    };

    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}
