use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::level::WARNING;
use super::{LoggerRecord, LoggerRegistry, RegistryError, validate_name};

#[derive(Default)]
struct Inner {
    order: Vec<Arc<LoggerRecord>>,
    by_name: HashMap<String, Arc<LoggerRecord>>,
}

/// Registry backed by an in-process map.
///
/// Parent links follow the registered names: a new record is attached to its
/// nearest registered ancestor (or the root), and already registered
/// descendants are moved under it when it sits closer to them.
pub struct InMemoryRegistry {
    root: Arc<LoggerRecord>,
    inner: RwLock<Inner>,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::with_root_level(WARNING)
    }

    pub fn with_root_level(level: i32) -> Self {
        Self {
            root: Arc::new(LoggerRecord::root(level)),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Return the logger called `name`, registering it first if needed.
    pub fn get_logger(&self, name: &str) -> Result<Arc<LoggerRecord>, RegistryError> {
        validate_name(name)?;

        let mut inner = self.inner.write();
        if let Some(existing) = inner.by_name.get(name) {
            return Ok(existing.clone());
        }

        let record = Arc::new(LoggerRecord::new(name));

        let parent = ancestor_names(name)
            .find_map(|ancestor| inner.by_name.get(ancestor).cloned())
            .unwrap_or_else(|| self.root.clone());
        record.set_parent(parent);

        let prefix = format!("{name}.");
        for existing in &inner.order {
            if !existing.name().starts_with(&prefix) {
                continue;
            }
            let closer = match existing.parent() {
                Some(current) => {
                    Arc::ptr_eq(&current, &self.root) || current.name().len() < name.len()
                }
                None => true,
            };
            if closer {
                existing.set_parent(record.clone());
            }
        }

        tracing::debug!(logger = name, "Registered logger");

        inner.order.push(record.clone());
        inner.by_name.insert(name.to_string(), record.clone());
        Ok(record)
    }

    /// Register `name` (if needed) and set its explicit level.
    pub fn set_level(
        &self,
        name: &str,
        level: impl Into<Option<i32>>,
    ) -> Result<Arc<LoggerRecord>, RegistryError> {
        let record = self.get_logger(name)?;
        record.set_level(level);
        Ok(record)
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LoggerRegistry for InMemoryRegistry {
    fn root(&self) -> Arc<LoggerRecord> {
        self.root.clone()
    }

    fn entries(&self) -> Vec<(String, Arc<LoggerRecord>)> {
        self.inner
            .read()
            .order
            .iter()
            .map(|record| (record.name().to_string(), record.clone()))
            .collect()
    }

    fn lookup(&self, name: &str) -> Option<Arc<LoggerRecord>> {
        self.inner.read().by_name.get(name).cloned()
    }
}

/// Proper ancestors of a dotted name, nearest first: `a.b.c` yields `a.b`, `a`.
fn ancestor_names(name: &str) -> impl Iterator<Item = &str> {
    name.rmatch_indices('.').map(move |(idx, _)| &name[..idx])
}
