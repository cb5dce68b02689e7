use serde::Serialize;
use std::fmt;

use super::bucket::{Gradient, LevelBucket};
use super::ModelIndex;
use crate::registry::level_name;

/// One flattened row of the tree, derived from a node and its record at the
/// moment it was requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionRow {
    #[serde(skip)]
    pub index: ModelIndex,
    pub depth: usize,
    pub qualified_name: String,
    pub label: String,
    pub explicit_level: Option<i32>,
    pub effective_level: i32,
    pub bucket: LevelBucket,
    pub gradient: Gradient,
    pub placeholder: bool,
}

impl fmt::Display for ProjectionRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "  ".repeat(self.depth);
        let origin = match (self.placeholder, self.explicit_level) {
            (true, _) => " (placeholder)",
            (false, None) => " (inherited)",
            (false, Some(_)) => "",
        };
        write!(
            f,
            "{indent}{} [{}: {}]{origin}",
            self.label,
            self.bucket,
            level_name(self.effective_level)
        )
    }
}
