use std::fmt;
use std::sync::Arc;

use crate::registry::LoggerRecord;

/// Handle to a node inside one [`Forest`]. Only meaningful for the forest that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// One segment of a dotted logger name.
#[derive(Debug, Clone)]
pub struct TreeNode {
    qualified_name: String,
    record: Option<Arc<LoggerRecord>>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TreeNode {
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Text after the final `.` of the qualified name.
    pub fn display_label(&self) -> &str {
        label_of(&self.qualified_name)
    }

    /// The wrapped logger; `None` for a synthesized intermediate node.
    pub fn record(&self) -> Option<&Arc<LoggerRecord>> {
        self.record.as_ref()
    }

    pub fn is_placeholder(&self) -> bool {
        self.record.is_none()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children ordered by display label.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

fn label_of(qualified_name: &str) -> &str {
    qualified_name
        .rsplit_once('.')
        .map_or(qualified_name, |(_, label)| label)
}

/// Arena of [`TreeNode`]s with an ordered list of roots.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: Vec<TreeNode>,
    roots: Vec<NodeId>,
}

impl Forest {
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.index())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(TreeNode::children).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find_root(&self, label: &str) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|id| self.nodes[id.index()].display_label() == label)
    }

    pub fn find_child(&self, parent: NodeId, label: &str) -> Option<NodeId> {
        let children = self.children(parent);
        children
            .binary_search_by(|id| self.nodes[id.index()].display_label().cmp(label))
            .ok()
            .map(|pos| children[pos])
    }

    /// Locate a node by its full dotted name.
    pub fn find(&self, qualified_name: &str) -> Option<NodeId> {
        let mut segments = qualified_name.split('.');
        let mut current = self.find_root(segments.next()?)?;
        for segment in segments {
            current = self.find_child(current, segment)?;
        }
        Some(current)
    }

    /// Position of `id` among its siblings (or among the roots).
    pub fn row_of(&self, id: NodeId) -> Option<usize> {
        let node = self.node(id)?;
        let siblings = match node.parent {
            Some(parent) => self.children(parent),
            None => self.roots.as_slice(),
        };
        siblings.iter().position(|sibling| *sibling == id)
    }

    pub fn depth_of(&self, id: NodeId) -> Option<usize> {
        let mut depth = 0;
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            depth += 1;
            current = &self.nodes[parent.index()];
        }
        Some(depth)
    }

    /// Pre-order traversal as `(node, depth)`, roots in forest order.
    pub fn walk(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeId, usize)> =
            self.roots.iter().rev().map(|id| (*id, 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            out.push((id, depth));
            for child in self.children(id).iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        out
    }

    /// Order roots alphabetically by label. Builders keep first-seen order.
    pub fn sort_roots(&mut self) {
        let nodes = &self.nodes;
        self.roots
            .sort_by(|a, b| nodes[a.index()].display_label().cmp(nodes[b.index()].display_label()));
    }

    pub(crate) fn insert_root(
        &mut self,
        qualified_name: String,
        record: Option<Arc<LoggerRecord>>,
    ) -> NodeId {
        if let Some(existing) = self.find_root(&qualified_name) {
            self.merge_record(existing, record);
            return existing;
        }
        let id = self.push_node(qualified_name, record, None);
        self.roots.push(id);
        id
    }

    /// Attach a child, keeping the parent's children sorted by label.
    pub(crate) fn insert_child(
        &mut self,
        parent: NodeId,
        qualified_name: String,
        record: Option<Arc<LoggerRecord>>,
    ) -> NodeId {
        let label = label_of(&qualified_name).to_string();
        let search = {
            let nodes = &self.nodes;
            nodes[parent.index()]
                .children
                .binary_search_by(|id| nodes[id.index()].display_label().cmp(label.as_str()))
        };

        match search {
            Ok(pos) => {
                let existing = self.nodes[parent.index()].children[pos];
                self.merge_record(existing, record);
                existing
            }
            Err(pos) => {
                let id = self.push_node(qualified_name, record, Some(parent));
                self.nodes[parent.index()].children.insert(pos, id);
                id
            }
        }
    }

    fn push_node(
        &mut self,
        qualified_name: String,
        record: Option<Arc<LoggerRecord>>,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TreeNode {
            qualified_name,
            record,
            parent,
            children: Vec::new(),
        });
        id
    }

    /// A second entry for an existing name only fills in a missing record.
    fn merge_record(&mut self, id: NodeId, record: Option<Arc<LoggerRecord>>) {
        let node = &mut self.nodes[id.index()];
        match record {
            Some(record) if node.record.is_none() => node.record = Some(record),
            Some(_) => {
                tracing::warn!(logger = %node.qualified_name, "Duplicate logger name ignored");
            }
            None => {}
        }
    }
}
