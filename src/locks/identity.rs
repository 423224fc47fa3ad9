//! Lock holder identity.
//!
//! A [`LockIdentity`] is written into a marker file when a lock is acquired and
//! compared against the marker content afterwards. It is serialized as
//! `<timestamp>_<host>_<ticket>`:
//! - `timestamp`: creation time in nanoseconds since the Unix epoch
//! - `host`: machine name, with any `_` replaced by `-`
//! - `ticket`: per-factory sequence number starting at 0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Delimiter between the three serialized identity fields.
pub const DELIMITER: char = '_';

/// A field of [`LockIdentity`] that can take part in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityField {
    Timestamp,
    Host,
    Ticket,
}

/// Selects which identity fields must match for two identities to count as
/// the same lock holder.
///
/// Always non-empty. The default compares only the host, so any process on
/// the machine that wrote the marker is treated as the holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareMask(u8);

impl CompareMask {
    pub const TIMESTAMP: CompareMask = CompareMask(0b001);
    pub const HOST: CompareMask = CompareMask(0b010);
    pub const TICKET: CompareMask = CompareMask(0b100);
    pub const ALL: CompareMask = CompareMask(0b111);

    /// Build a mask from individual flags. Returns `None` if no field is selected.
    pub fn new(timestamp: bool, host: bool, ticket: bool) -> Option<Self> {
        let bits = (timestamp as u8) | ((host as u8) << 1) | ((ticket as u8) << 2);
        (bits != 0).then_some(CompareMask(bits))
    }

    /// Build a mask from a list of fields. Returns `None` for an empty list.
    pub fn from_fields(fields: &[IdentityField]) -> Option<Self> {
        Self::new(
            fields.contains(&IdentityField::Timestamp),
            fields.contains(&IdentityField::Host),
            fields.contains(&IdentityField::Ticket),
        )
    }

    /// Whether every field selected by `other` is also selected by `self`.
    pub fn contains(self, other: CompareMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for CompareMask {
    fn default() -> Self {
        CompareMask::HOST
    }
}

impl BitOr for CompareMask {
    type Output = CompareMask;

    fn bitor(self, rhs: CompareMask) -> CompareMask {
        CompareMask(self.0 | rhs.0)
    }
}

/// Who holds (or is trying to hold) a lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockIdentity {
    timestamp: i64,
    host: String,
    ticket: u64,
}

impl LockIdentity {
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Creation time as a UTC datetime.
    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.timestamp)
    }

    /// Serialize to the marker file format.
    pub fn serialize(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.timestamp, DELIMITER, self.host, DELIMITER, self.ticket
        )
    }

    /// Parse a serialized identity. Returns `None` unless the input has
    /// exactly three well-formed fields.
    pub fn parse(serialized: &str) -> Option<Self> {
        let parts: Vec<&str> = serialized.trim().split(DELIMITER).collect();
        let [timestamp, host, ticket] = parts.as_slice() else {
            return None;
        };

        Some(Self {
            timestamp: timestamp.parse().ok()?,
            host: host.to_string(),
            ticket: ticket.parse().ok()?,
        })
    }

    /// Compare against a serialized identity on the fields selected by `mask`.
    ///
    /// Malformed input never matches: a wrong field count, or a selected
    /// numeric field that does not parse, returns `false`.
    pub fn is_same(&self, serialized_other: &str, mask: CompareMask) -> bool {
        let parts: Vec<&str> = serialized_other.trim().split(DELIMITER).collect();
        let [timestamp, host, ticket] = parts.as_slice() else {
            return false;
        };

        if mask.contains(CompareMask::TIMESTAMP)
            && timestamp.parse::<i64>().ok() != Some(self.timestamp)
        {
            return false;
        }
        if mask.contains(CompareMask::HOST) && *host != self.host {
            return false;
        }
        if mask.contains(CompareMask::TICKET) && ticket.parse::<u64>().ok() != Some(self.ticket) {
            return false;
        }
        true
    }

    /// Human-readable age, e.g. `3m`, `2h 5m`, `1d 4h`.
    pub fn age_string(&self) -> String {
        let age = Utc::now().signed_duration_since(self.created_at());
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }
}

impl fmt::Display for LockIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// Hands out identities for one process.
///
/// Owns the ticket counter, so every identity from the same factory has a
/// distinct ticket even when created on several threads.
#[derive(Debug)]
pub struct IdentityFactory {
    host: String,
    next_ticket: AtomicU64,
}

impl IdentityFactory {
    /// Factory for the current machine.
    pub fn new() -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self::with_host(host)
    }

    /// Factory with an explicit host name.
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: sanitize_host(&host.into()),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Create a new identity with the current time and the next ticket.
    pub fn create(&self) -> LockIdentity {
        LockIdentity {
            timestamp: Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX),
            host: self.host.clone(),
            ticket: self.next_ticket.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Restart ticket numbering at 0.
    pub fn reset(&self) {
        self.next_ticket.store(0, Ordering::Relaxed);
    }
}

impl Default for IdentityFactory {
    fn default() -> Self {
        Self::new()
    }
}

fn sanitize_host(host: &str) -> String {
    let host = host.trim();
    if host.is_empty() {
        return "unknown".to_string();
    }
    host.replace(DELIMITER, "-")
}
