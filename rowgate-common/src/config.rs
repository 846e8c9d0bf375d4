//! Configuration for the collection access engine

use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Maximum rows a single list request may return
    pub max_rows: usize,
    /// Generate a v4 uuid for inserts whose body carries no id
    pub generate_missing_ids: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            max_rows: 1000,
            generate_missing_ids: true,
        }
    }
}
