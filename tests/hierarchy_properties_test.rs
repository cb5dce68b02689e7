use pipeline_devtools::hierarchy::{Forest, HierarchyBuilder, NodeId};
use pipeline_devtools::projection::{LevelBucket, TreeProjection, bucket_of};
use pipeline_devtools::registry::{InMemoryRegistry, LoggerRegistry};
use proptest::prelude::*;
use std::sync::Arc;

fn dotted_name() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-d]{1,2}", 1..4).prop_map(|segments| segments.join("."))
}

fn name_set() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::btree_set(dotted_name(), 0..24)
        .prop_map(|names| names.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

fn registry_of(names: &[String]) -> Arc<InMemoryRegistry> {
    let registry = Arc::new(InMemoryRegistry::new());
    for name in names {
        registry.get_logger(name).unwrap();
    }
    registry
}

fn reconstruct(forest: &Forest, id: NodeId) -> String {
    let mut labels = Vec::new();
    let mut current = Some(id);
    while let Some(node_id) = current {
        let node = forest.node(node_id).unwrap();
        labels.push(node.display_label().to_string());
        current = node.parent();
    }
    labels.reverse();
    labels.join(".")
}

fn shape(forest: &Forest) -> Vec<(String, usize, bool)> {
    forest
        .walk()
        .into_iter()
        .map(|(id, depth)| {
            let node = forest.node(id).unwrap();
            (node.qualified_name().to_string(), depth, node.is_placeholder())
        })
        .collect()
}

proptest! {
    #[test]
    fn qualified_names_rebuild_from_ancestors(names in name_set()) {
        let registry = registry_of(&names);
        let forest = HierarchyBuilder::default().build(registry.entries()).unwrap();

        for (id, depth) in forest.walk() {
            let node = forest.node(id).unwrap();
            prop_assert_eq!(reconstruct(&forest, id), node.qualified_name());
            prop_assert_eq!(depth + 1, node.qualified_name().split('.').count());
        }
        for name in &names {
            prop_assert!(forest.find(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn rebuilding_is_idempotent(names in name_set()) {
        let registry = registry_of(&names);
        let builder = HierarchyBuilder::default();

        let first = builder.build(registry.entries()).unwrap();
        let second = builder.build(registry.entries()).unwrap();
        prop_assert_eq!(shape(&first), shape(&second));
    }

    #[test]
    fn children_strictly_ordered(names in name_set()) {
        let registry = registry_of(&names);
        let forest = HierarchyBuilder::default().build(registry.entries()).unwrap();

        for (id, _) in forest.walk() {
            let labels: Vec<&str> = forest
                .children(id)
                .iter()
                .map(|child| forest.node(*child).unwrap().display_label())
                .collect();
            prop_assert!(
                labels.windows(2).all(|pair| pair[0] < pair[1]),
                "unsorted children {:?}",
                labels
            );
        }
    }

    #[test]
    fn sorted_forest_ignores_registration_order(names in name_set()) {
        let builder = HierarchyBuilder::default().with_sorted_roots(true);
        let mut reversed = names.clone();
        reversed.reverse();

        let forward = builder.build(registry_of(&names).entries()).unwrap();
        let backward = builder.build(registry_of(&reversed).entries()).unwrap();
        prop_assert_eq!(shape(&forward), shape(&backward));
    }

    #[test]
    fn bucketing_is_total(level in any::<i32>()) {
        let expected = if level <= 10 {
            LevelBucket::Debug
        } else if level <= 20 {
            LevelBucket::Info
        } else if level <= 30 {
            LevelBucket::Warning
        } else {
            LevelBucket::Error
        };
        prop_assert_eq!(bucket_of(level), expected);
    }

    #[test]
    fn set_level_round_trips(level in any::<i32>()) {
        let registry = registry_of(&["app".to_string(), "app.io".to_string()]);
        let mut projection = TreeProjection::new(registry, HierarchyBuilder::default());

        for name in ["app", "app.io"] {
            let index = projection.index_of(name).unwrap().unwrap();
            projection.set_level(&index, level).unwrap();
            prop_assert_eq!(projection.effective_level_of(&index).unwrap(), level);
        }
    }
}

#[test]
fn bucket_boundaries() {
    for (below, above, lower, upper) in [
        (10, 11, LevelBucket::Debug, LevelBucket::Info),
        (20, 21, LevelBucket::Info, LevelBucket::Warning),
        (30, 31, LevelBucket::Warning, LevelBucket::Error),
    ] {
        assert_eq!(bucket_of(below), lower);
        assert_eq!(bucket_of(above), upper);
    }
}
