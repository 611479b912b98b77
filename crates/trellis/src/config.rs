//! Session settings.

use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_LIMIT;

/// Session settings. Every field has a default, so a partial configuration
/// file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of undo points.
    pub history_limit: usize,
    /// Name of the group created for an empty document.
    pub default_group: String,
    /// Prefix for generated group names.
    pub group_prefix: String,
    /// Prefix for generated component names.
    pub name_prefix: String,
    /// Left edge of every group root.
    pub origin_x: i32,
    /// Top edge of every group root.
    pub origin_y: i32,
    /// Width of a new group root.
    pub group_width: i32,
    /// Height of a new group root.
    pub group_height: i32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_LIMIT,
            default_group: "Layout1".to_string(),
            group_prefix: "Layout".to_string(),
            name_prefix: "w".to_string(),
            origin_x: 0,
            origin_y: 0,
            group_width: 800,
            group_height: 600,
        }
    }
}
