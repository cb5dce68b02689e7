//! Tree projection
//!
//! Row/column addressable view over the cached logger forest, with level
//! editing. A consuming view (tree widget, terminal listing) only talks to
//! [`TreeProjection`].
//!
//! Indices are tied to the forest generation they were issued for. Any call with
//! an index from before a reload, or pointing outside the forest, fails with
//! [`ProjectionError::InvalidNodeReference`].

pub mod bucket;
pub mod row;

pub use bucket::{BucketStyle, Gradient, LevelBucket, Rgb, bucket_of, level_choices};
pub use row::ProjectionRow;

use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::hierarchy::{Forest, ForestCache, HierarchyBuilder, HierarchyError, NodeId, TreeNode};
use crate::registry::{LoggerRecord, LoggerRegistry};

pub const NAME_COLUMN: usize = 0;
pub const LEVEL_COLUMN: usize = 1;
pub const COLUMN_COUNT: usize = 2;

const HEADERS: [&str; COLUMN_COUNT] = ["Name", "Level"];
const CELL_SIZE_HINT: (u32, u32) = (50, 20);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Invalid node reference: {0}")]
    InvalidNodeReference(String),

    #[error("'{0}' is a placeholder without a logger record")]
    PlaceholderNode(String),

    #[error("Unknown level bucket '{0}'")]
    UnknownBucket(String),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

/// Address of one cell in the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelIndex {
    row: usize,
    column: usize,
    node: NodeId,
    generation: u64,
}

impl ModelIndex {
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The same row at another column.
    pub fn at_column(self, column: usize) -> Self {
        Self { column, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Display,
    Level,
    Background,
    Decoration,
    SizeHint,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellData {
    Text(String),
    Level(i32),
    Gradient(Gradient),
    Icon(&'static str),
    Size { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemFlags {
    pub enabled: bool,
    pub selectable: bool,
    pub editable: bool,
}

pub struct TreeProjection {
    cache: ForestCache,
}

impl TreeProjection {
    pub fn new(registry: Arc<dyn LoggerRegistry>, builder: HierarchyBuilder) -> Self {
        Self::from_cache(ForestCache::new(registry, builder))
    }

    pub fn from_cache(cache: ForestCache) -> Self {
        Self { cache }
    }

    /// Discard the forest; every index handed out so far becomes stale.
    pub fn reload(&mut self) {
        debug!(generation = self.cache.generation(), "Reloading logger tree");
        self.cache.reload();
    }

    pub fn generation(&self) -> u64 {
        self.cache.generation()
    }

    pub fn registry(&self) -> &Arc<dyn LoggerRegistry> {
        self.cache.registry()
    }

    pub fn forest(&mut self) -> Result<&Forest, ProjectionError> {
        Ok(self.cache.forest()?)
    }

    pub fn column_count(&self) -> usize {
        COLUMN_COUNT
    }

    pub fn header_data(&self, column: usize) -> Option<&'static str> {
        HEADERS.get(column).copied()
    }

    /// Number of children under `parent`, or of roots when `parent` is `None`.
    pub fn row_count(&mut self, parent: Option<&ModelIndex>) -> Result<usize, ProjectionError> {
        match parent {
            None => Ok(self.cache.forest()?.roots().len()),
            Some(index) => {
                let (_, node) = self.lookup(index)?;
                Ok(node.children().len())
            }
        }
    }

    pub fn index(
        &mut self,
        row: usize,
        column: usize,
        parent: Option<&ModelIndex>,
    ) -> Result<ModelIndex, ProjectionError> {
        let generation = self.cache.generation();
        let node = match parent {
            None => self.cache.forest()?.roots().get(row).copied(),
            Some(parent) => {
                let (_, node) = self.lookup(parent)?;
                node.children().get(row).copied()
            }
        };

        match node {
            Some(node) if column < COLUMN_COUNT => Ok(ModelIndex {
                row,
                column,
                node,
                generation,
            }),
            _ => Err(ProjectionError::InvalidNodeReference(format!(
                "row {row}, column {column} is out of range"
            ))),
        }
    }

    /// Index of the parent row (column 0), `None` for roots.
    pub fn parent(&mut self, index: &ModelIndex) -> Result<Option<ModelIndex>, ProjectionError> {
        let generation = self.cache.generation();
        let (forest, node) = self.lookup(index)?;
        let Some(parent) = node.parent() else {
            return Ok(None);
        };
        let row = forest.row_of(parent).ok_or_else(|| {
            ProjectionError::InvalidNodeReference(format!("parent {parent} is detached"))
        })?;
        Ok(Some(ModelIndex {
            row,
            column: NAME_COLUMN,
            node: parent,
            generation,
        }))
    }

    /// Index (column 0) of the node with the given dotted name.
    pub fn index_of(&mut self, qualified_name: &str) -> Result<Option<ModelIndex>, ProjectionError> {
        let generation = self.cache.generation();
        let forest = self.cache.forest()?;
        Ok(forest.find(qualified_name).and_then(|node| {
            forest.row_of(node).map(|row| ModelIndex {
                row,
                column: NAME_COLUMN,
                node,
                generation,
            })
        }))
    }

    pub fn flags(&mut self, index: &ModelIndex) -> Result<ItemFlags, ProjectionError> {
        let (_, node) = self.lookup(index)?;
        Ok(ItemFlags {
            enabled: true,
            selectable: true,
            editable: index.column == LEVEL_COLUMN && !node.is_placeholder(),
        })
    }

    pub fn data(&mut self, index: &ModelIndex, role: Role) -> Result<Option<CellData>, ProjectionError> {
        let label = self.label_of(index)?;
        let level = self.effective_level_of(index)?;
        let style = bucket_of(level).style();
        let level_column = index.column == LEVEL_COLUMN;

        let data = match role {
            Role::Display if level_column => Some(CellData::Text(style.label.to_string())),
            Role::Display => Some(CellData::Text(label)),
            Role::Level => Some(CellData::Level(level)),
            Role::Background if level_column => Some(CellData::Gradient(style.gradient())),
            Role::Decoration if level_column => Some(CellData::Icon(style.icon)),
            Role::Background | Role::Decoration => None,
            Role::SizeHint => Some(CellData::Size {
                width: CELL_SIZE_HINT.0,
                height: CELL_SIZE_HINT.1,
            }),
        };
        Ok(data)
    }

    /// Edit entry point for a view. Only the level column accepts edits;
    /// returns whether anything changed.
    pub fn set_data(&mut self, index: &ModelIndex, level: i32) -> Result<bool, ProjectionError> {
        if index.column != LEVEL_COLUMN {
            self.lookup(index)?;
            return Ok(false);
        }
        self.set_level(index, level)?;
        Ok(true)
    }

    pub fn label_of(&mut self, index: &ModelIndex) -> Result<String, ProjectionError> {
        let (_, node) = self.lookup(index)?;
        Ok(node.display_label().to_string())
    }

    pub fn qualified_name_of(&mut self, index: &ModelIndex) -> Result<String, ProjectionError> {
        let (_, node) = self.lookup(index)?;
        Ok(node.qualified_name().to_string())
    }

    /// Level set directly on the node's record, if any.
    pub fn explicit_level_of(&mut self, index: &ModelIndex) -> Result<Option<i32>, ProjectionError> {
        let (_, node) = self.lookup(index)?;
        Ok(node.record().and_then(|record| record.level()))
    }

    /// Resolved level of the node's record. Placeholders resolve through the
    /// nearest ancestor node that has a record, then the registry root.
    pub fn effective_level_of(&mut self, index: &ModelIndex) -> Result<i32, ProjectionError> {
        let root = self.cache.registry().root();
        let (forest, _) = self.lookup(index)?;
        Ok(effective_level(forest, index.node, &root))
    }

    /// Write `level` to the node's record. Tree order is unaffected.
    pub fn set_level(&mut self, index: &ModelIndex, level: i32) -> Result<(), ProjectionError> {
        let record = self.record_of(index)?;
        debug!(logger = record.name(), level, "Setting logger level");
        record.set_level(level);
        Ok(())
    }

    /// Clear the node's explicit level so it inherits again.
    pub fn reset_level(&mut self, index: &ModelIndex) -> Result<(), ProjectionError> {
        let record = self.record_of(index)?;
        debug!(logger = record.name(), "Clearing logger level");
        record.set_level(None);
        Ok(())
    }

    /// Apply one level to every node touched by `indices`. All indices are
    /// checked before anything is written; placeholders are skipped. Returns the
    /// number of loggers changed.
    pub fn set_level_for_selection(
        &mut self,
        indices: &[ModelIndex],
        level: i32,
    ) -> Result<usize, ProjectionError> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for index in indices {
            let (_, node) = self.lookup(index)?;
            if !seen.insert(index.node) {
                continue;
            }
            if let Some(record) = node.record() {
                records.push(record.clone());
            }
        }

        for record in &records {
            debug!(logger = record.name(), level, "Setting logger level");
            record.set_level(level);
        }
        Ok(records.len())
    }

    /// Flatten the tree in display order.
    pub fn rows(&mut self) -> Result<Vec<ProjectionRow>, ProjectionError> {
        let root = self.cache.registry().root();
        let generation = self.cache.generation();
        let forest = self.cache.forest()?;

        let mut rows = Vec::with_capacity(forest.len());
        for (id, depth) in forest.walk() {
            let (Some(node), Some(row)) = (forest.node(id), forest.row_of(id)) else {
                continue;
            };
            let effective_level = effective_level(forest, id, &root);
            let bucket = bucket_of(effective_level);
            rows.push(ProjectionRow {
                index: ModelIndex {
                    row,
                    column: NAME_COLUMN,
                    node: id,
                    generation,
                },
                depth,
                qualified_name: node.qualified_name().to_string(),
                label: node.display_label().to_string(),
                explicit_level: node.record().and_then(|record| record.level()),
                effective_level,
                bucket,
                gradient: bucket.style().gradient(),
                placeholder: node.is_placeholder(),
            });
        }
        Ok(rows)
    }

    fn record_of(&mut self, index: &ModelIndex) -> Result<Arc<LoggerRecord>, ProjectionError> {
        let (_, node) = self.lookup(index)?;
        node.record()
            .cloned()
            .ok_or_else(|| ProjectionError::PlaceholderNode(node.qualified_name().to_string()))
    }

    fn lookup(&mut self, index: &ModelIndex) -> Result<(&Forest, &TreeNode), ProjectionError> {
        let generation = self.cache.generation();
        if index.generation != generation {
            return Err(ProjectionError::InvalidNodeReference(format!(
                "index from generation {} used after reload (current {generation})",
                index.generation
            )));
        }
        if index.column >= COLUMN_COUNT {
            return Err(ProjectionError::InvalidNodeReference(format!(
                "column {} is out of range",
                index.column
            )));
        }

        let forest = self.cache.forest()?;
        let node = forest.node(index.node).ok_or_else(|| {
            ProjectionError::InvalidNodeReference(format!("unknown node {}", index.node))
        })?;
        Ok((forest, node))
    }
}

fn effective_level(forest: &Forest, id: NodeId, root: &LoggerRecord) -> i32 {
    let mut current = Some(id);
    while let Some(node) = current.and_then(|id| forest.node(id)) {
        if let Some(record) = node.record() {
            return record.effective_level();
        }
        current = node.parent();
    }
    root.effective_level()
}
