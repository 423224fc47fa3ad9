//! Configuration types and defaults for tokenlock.

use crate::locks::IdentityField;
use serde::{Deserialize, Serialize};

/// File looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "tokenlock.yaml";

/// How a checkout claims a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// One marker file per token in the token folder (default).
    #[default]
    Scan,
    /// A single `journal.json` next to a `Tokens/` folder.
    Journal,
}

impl SelectionMode {
    /// Parse a selection mode from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scan" => Some(Self::Scan),
            "journal" => Some(Self::Journal),
            _ => None,
        }
    }
}

// Default value functions for serde
pub(crate) fn default_token_folder() -> String {
    "tokens".to_string()
}
pub(crate) fn default_extension() -> String {
    "vdf".to_string()
}
pub(crate) fn default_retry_count() -> u32 {
    5
}
pub(crate) fn default_retry_sleep_ms() -> u64 {
    5000
}
pub(crate) fn default_compare() -> Vec<IdentityField> {
    vec![IdentityField::Host]
}
pub(crate) fn default_true() -> bool {
    true
}
