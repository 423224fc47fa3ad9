//! Config struct definition and default implementation.

use super::types::*;
use crate::locks::{CreateMode, IdentityField};
use serde::{Deserialize, Serialize};

/// Configuration for tokenlock.
///
/// This struct represents the contents of `tokenlock.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Pool settings
    // =========================================================================
    /// Folder holding the token files, usually on a network share.
    #[serde(default = "default_token_folder")]
    pub token_folder: String,

    /// Extension of token files (no leading dot).
    #[serde(default = "default_extension")]
    pub extension: String,

    /// How a checkout claims a token.
    #[serde(default)]
    pub strategy: SelectionMode,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Extra attempts made when a specific token or the journal is busy.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Milliseconds to wait between attempts.
    #[serde(default = "default_retry_sleep_ms")]
    pub retry_sleep_ms: u64,

    /// Identity fields that must match for a marker to count as ours.
    #[serde(default = "default_compare")]
    pub compare: Vec<IdentityField>,

    /// How a missing marker is created.
    #[serde(default)]
    pub create_mode: CreateMode,

    // =========================================================================
    // Audit settings
    // =========================================================================
    /// Whether commands append to `events.ndjson` in the token folder.
    #[serde(default = "default_true")]
    pub events_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token_folder: default_token_folder(),
            extension: default_extension(),
            strategy: SelectionMode::default(),
            retry_count: default_retry_count(),
            retry_sleep_ms: default_retry_sleep_ms(),
            compare: default_compare(),
            create_mode: CreateMode::default(),
            events_enabled: default_true(),
        }
    }
}
