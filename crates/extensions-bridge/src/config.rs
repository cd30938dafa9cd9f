//! Extension bridge limits.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Samples longer than this are cut before they are stored.
    pub max_sample_chars: usize,
    /// Oldest directives are dropped once the queue is full.
    pub max_pending_directives: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_sample_chars: tabguard_core_types::DEFAULT_MAX_CONTENT_CHARS,
            max_pending_directives: 256,
        }
    }
}
