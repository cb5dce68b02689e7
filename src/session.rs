//! Editor session
//!
//! Owns at most one level editor and one bucket filter at a time. The caller
//! constructs the session, opens what it needs and drops or closes it when done.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::hierarchy::HierarchyBuilder;
use crate::projection::{LevelBucket, ProjectionError, ProjectionRow, TreeProjection};
use crate::registry::LoggerRegistry;

/// Which level buckets are shown. Every bucket is visible by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketFilter {
    visible: BTreeSet<LevelBucket>,
}

impl Default for BucketFilter {
    fn default() -> Self {
        Self {
            visible: LevelBucket::ALL.into_iter().collect(),
        }
    }
}

impl BucketFilter {
    pub fn is_visible(&self, bucket: LevelBucket) -> bool {
        self.visible.contains(&bucket)
    }

    pub fn set_visible(&mut self, bucket: LevelBucket, visible: bool) {
        if visible {
            self.visible.insert(bucket);
        } else {
            self.visible.remove(&bucket);
        }
    }

    /// Flip a bucket and return its new state.
    pub fn toggle(&mut self, bucket: LevelBucket) -> bool {
        let visible = !self.is_visible(bucket);
        self.set_visible(bucket, visible);
        visible
    }

    pub fn visible(&self) -> impl Iterator<Item = LevelBucket> + '_ {
        self.visible.iter().copied()
    }
}

pub struct EditorSession {
    registry: Arc<dyn LoggerRegistry>,
    builder: HierarchyBuilder,
    editor: Option<TreeProjection>,
    filters: Option<BucketFilter>,
}

impl EditorSession {
    pub fn new(registry: Arc<dyn LoggerRegistry>, builder: HierarchyBuilder) -> Self {
        Self {
            registry,
            builder,
            editor: None,
            filters: None,
        }
    }

    /// The editor, created on first use. Later calls return the same instance.
    pub fn open_editor(&mut self) -> &mut TreeProjection {
        let registry = &self.registry;
        let builder = self.builder;
        self.editor.get_or_insert_with(|| {
            info!("Opening logging editor");
            TreeProjection::new(registry.clone(), builder)
        })
    }

    pub fn editor(&mut self) -> Option<&mut TreeProjection> {
        self.editor.as_mut()
    }

    pub fn is_editor_open(&self) -> bool {
        self.editor.is_some()
    }

    /// Open the filter state if closed, close it if open. Returns whether it is
    /// open afterwards.
    pub fn toggle_filters(&mut self) -> bool {
        if self.filters.take().is_none() {
            self.filters = Some(BucketFilter::default());
        }
        debug!(open = self.filters.is_some(), "Toggled level filters");
        self.filters.is_some()
    }

    pub fn filters_mut(&mut self) -> Option<&mut BucketFilter> {
        self.filters.as_mut()
    }

    /// Rebuild the editor's tree from the registry. Returns false when no
    /// editor is open.
    pub fn refresh(&mut self) -> bool {
        match self.editor.as_mut() {
            Some(editor) => {
                editor.reload();
                true
            }
            None => false,
        }
    }

    /// Rows of the open editor that pass the filter (all rows when the filter
    /// is closed). Empty when no editor is open.
    pub fn visible_rows(&mut self) -> Result<Vec<ProjectionRow>, ProjectionError> {
        let Some(editor) = self.editor.as_mut() else {
            return Ok(Vec::new());
        };
        let rows = editor.rows()?;
        Ok(match &self.filters {
            Some(filter) => rows
                .into_iter()
                .filter(|row| filter.is_visible(row.bucket))
                .collect(),
            None => rows,
        })
    }

    /// Tear down the editor and the filter state.
    pub fn close(&mut self) {
        if self.editor.take().is_some() {
            info!("Closed logging editor");
        }
        self.filters = None;
    }
}
