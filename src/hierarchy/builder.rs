use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::{Forest, HierarchyError, NodeId};
use crate::registry::{LoggerRecord, depth_of, validate_name};

/// What to do when a logger's ancestor was never registered, e.g. `a.b.c`
/// without `a.b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AncestorPolicy {
    /// Insert placeholder nodes without a record for the missing names.
    #[default]
    Synthesize,
    /// Abort the build with [`HierarchyError::MissingAncestor`].
    Fail,
}

/// Turns flat `(name, record)` pairs into a [`Forest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchyBuilder {
    policy: AncestorPolicy,
    sort_roots: bool,
}

impl HierarchyBuilder {
    pub fn new(policy: AncestorPolicy) -> Self {
        Self {
            policy,
            sort_roots: false,
        }
    }

    /// Order roots by label instead of first-seen order.
    pub fn with_sorted_roots(mut self, sort_roots: bool) -> Self {
        self.sort_roots = sort_roots;
        self
    }

    pub fn policy(&self) -> AncestorPolicy {
        self.policy
    }

    /// Build the forest. Entries are processed by increasing depth (stable with
    /// respect to the input order), so every registered ancestor is already in
    /// place when its descendants arrive.
    pub fn build(
        &self,
        entries: Vec<(String, Arc<LoggerRecord>)>,
    ) -> Result<Forest, HierarchyError> {
        let mut entries = entries;
        for (name, _) in &entries {
            validate_name(name).map_err(|_| HierarchyError::InvalidName(name.clone()))?;
        }
        entries.sort_by_key(|(name, _)| depth_of(name));

        let mut forest = Forest::default();
        for (name, record) in entries {
            match name.rsplit_once('.') {
                None => {
                    debug!(logger = %name, "Logger is a root");
                    forest.insert_root(name, Some(record));
                }
                Some((ancestry, _)) => {
                    let parent = self.resolve_parent(&mut forest, &name, ancestry)?;
                    debug!(logger = %name, parent = %parent, "Logger is a sub-logger");
                    forest.insert_child(parent, name, Some(record));
                }
            }
        }

        if self.sort_roots {
            forest.sort_roots();
        }
        Ok(forest)
    }

    /// Walk `ancestry` from the roots down, one segment at a time.
    fn resolve_parent(
        &self,
        forest: &mut Forest,
        logger: &str,
        ancestry: &str,
    ) -> Result<NodeId, HierarchyError> {
        let mut current: Option<NodeId> = None;
        let mut qualified = String::with_capacity(ancestry.len());

        for segment in ancestry.split('.') {
            if !qualified.is_empty() {
                qualified.push('.');
            }
            qualified.push_str(segment);

            let found = match current {
                None => forest.find_root(segment),
                Some(parent) => forest.find_child(parent, segment),
            };

            let next = match (found, self.policy) {
                (Some(id), _) => id,
                (None, AncestorPolicy::Synthesize) => {
                    debug!(logger, ancestor = %qualified, "Synthesizing placeholder ancestor");
                    match current {
                        None => forest.insert_root(qualified.clone(), None),
                        Some(parent) => forest.insert_child(parent, qualified.clone(), None),
                    }
                }
                (None, AncestorPolicy::Fail) => {
                    return Err(HierarchyError::MissingAncestor {
                        logger: logger.to_string(),
                        ancestor: qualified,
                    });
                }
            };
            current = Some(next);
        }

        current.ok_or_else(|| HierarchyError::InvalidName(logger.to_string()))
    }
}
