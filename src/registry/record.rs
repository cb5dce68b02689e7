use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use super::level::NOTSET;

/// A named logger with a mutable verbosity level.
///
/// Records are shared through `Arc`, so a level change made through one handle is
/// visible to every other holder (tree nodes, the registry, other views).
pub struct LoggerRecord {
    name: String,
    level: RwLock<Option<i32>>,
    parent: RwLock<Option<Arc<LoggerRecord>>>,
}

impl LoggerRecord {
    /// A record with no explicit level and no parent.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: RwLock::new(None),
            parent: RwLock::new(None),
        }
    }

    /// The registry root. It always terminates the inheritance walk.
    pub fn root(level: i32) -> Self {
        Self {
            name: "root".to_string(),
            level: RwLock::new(Some(level)),
            parent: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The explicitly set level; `None` means inherited.
    pub fn level(&self) -> Option<i32> {
        *self.level.read()
    }

    pub fn set_level(&self, level: impl Into<Option<i32>>) {
        *self.level.write() = level.into();
    }

    pub fn parent(&self) -> Option<Arc<LoggerRecord>> {
        self.parent.read().clone()
    }

    pub(crate) fn set_parent(&self, parent: Arc<LoggerRecord>) {
        *self.parent.write() = Some(parent);
    }

    /// Own level if set, otherwise the nearest ancestor's explicit level.
    pub fn effective_level(&self) -> i32 {
        if let Some(level) = self.level() {
            return level;
        }

        let mut current = self.parent();
        while let Some(record) = current {
            if let Some(level) = record.level() {
                return level;
            }
            current = record.parent();
        }
        NOTSET
    }
}

impl fmt::Debug for LoggerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerRecord")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("parent", &self.parent().map(|p| p.name.clone()))
            .finish()
    }
}
