use std::sync::Arc;
use tracing::info;

use super::{Forest, HierarchyBuilder, HierarchyError};
use crate::registry::LoggerRegistry;

/// Lazily built forest over an injected registry.
///
/// The forest is built on first access and kept until [`reload`](Self::reload).
/// Each reload bumps the generation so that handles taken from an older forest
/// can be recognised as stale.
pub struct ForestCache {
    registry: Arc<dyn LoggerRegistry>,
    builder: HierarchyBuilder,
    forest: Option<Forest>,
    generation: u64,
}

impl ForestCache {
    pub fn new(registry: Arc<dyn LoggerRegistry>, builder: HierarchyBuilder) -> Self {
        Self {
            registry,
            builder,
            forest: None,
            generation: 0,
        }
    }

    pub fn forest(&mut self) -> Result<&Forest, HierarchyError> {
        let forest = match self.forest.take() {
            Some(forest) => forest,
            None => {
                let forest = self.builder.build(self.registry.entries())?;
                info!(
                    nodes = forest.len(),
                    roots = forest.roots().len(),
                    generation = self.generation,
                    "Built logger hierarchy"
                );
                forest
            }
        };
        Ok(self.forest.insert(forest))
    }

    /// Drop the cached forest; the next access rebuilds it from the registry.
    pub fn reload(&mut self) {
        self.forest = None;
        self.generation += 1;
    }

    pub fn is_cached(&self) -> bool {
        self.forest.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn registry(&self) -> &Arc<dyn LoggerRegistry> {
        &self.registry
    }

    pub fn builder(&self) -> &HierarchyBuilder {
        &self.builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::AncestorPolicy;
    use crate::registry::InMemoryRegistry;
    use tracing_test::traced_test;

    fn registry() -> Arc<InMemoryRegistry> {
        let registry = Arc::new(InMemoryRegistry::new());
        registry.set_level("app", 10).unwrap();
        registry.get_logger("app.io").unwrap();
        registry
    }

    #[test]
    fn test_lazy_build_and_reload() {
        let registry = registry();
        let mut cache = ForestCache::new(registry.clone(), HierarchyBuilder::default());
        assert!(!cache.is_cached());

        assert_eq!(cache.forest().unwrap().len(), 2);
        assert!(cache.is_cached());

        // New loggers stay invisible until a reload.
        registry.get_logger("render").unwrap();
        assert_eq!(cache.forest().unwrap().len(), 2);

        cache.reload();
        assert!(!cache.is_cached());
        assert_eq!(cache.generation(), 1);
        assert_eq!(cache.forest().unwrap().len(), 3);
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let registry = Arc::new(InMemoryRegistry::new());
        registry.get_logger("a.b").unwrap();
        let mut cache = ForestCache::new(registry.clone(), HierarchyBuilder::new(AncestorPolicy::Fail));

        assert!(cache.forest().is_err());
        assert!(!cache.is_cached());

        registry.get_logger("a").unwrap();
        assert_eq!(cache.forest().unwrap().len(), 2);
    }

    #[traced_test]
    #[test]
    fn test_build_is_logged_once() {
        let mut cache = ForestCache::new(registry(), HierarchyBuilder::default());
        cache.forest().unwrap();
        cache.forest().unwrap();

        assert!(logs_contain("Built logger hierarchy"));
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|line| line.contains("Built logger hierarchy"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("expected one build, saw {n}")),
            }
        });
    }
}
