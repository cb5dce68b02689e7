//! Logger hierarchy
//!
//! Rebuilds the tree implied by dotted logger names. A forest is produced whole
//! from a registry snapshot and thrown away on reload; nodes have no identity
//! across rebuilds.

pub mod builder;
pub mod cache;
pub mod forest;

pub use builder::{AncestorPolicy, HierarchyBuilder};
pub use cache::ForestCache;
pub use forest::{Forest, NodeId, TreeNode};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("Logger '{logger}' has no registered ancestor '{ancestor}'")]
    MissingAncestor { logger: String, ancestor: String },

    #[error("Invalid logger name '{0}'")]
    InvalidName(String),
}
