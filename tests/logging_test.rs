use pipeline_devtools::app::LoggingSystem;
use pipeline_devtools::app::initialization::LogLevel;
use pipeline_devtools::hierarchy::{AncestorPolicy, HierarchyBuilder};
use pipeline_devtools::profiling::{Bindings, CallGraphOptions, create_call_graph};
use pipeline_devtools::registry::{InMemoryRegistry, LoggerRegistry};
use tempfile::TempDir;
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_placeholder_synthesis_is_logged() {
    let registry = InMemoryRegistry::new();
    registry.set_level("a.b.c", 5).unwrap();

    HierarchyBuilder::new(AncestorPolicy::Synthesize)
        .build(registry.entries())
        .unwrap();

    assert!(logs_contain("Synthesizing placeholder ancestor"));
    assert!(logs_contain("ancestor=a.b"));
    assert!(logs_contain("Registered logger"));
}

#[traced_test]
#[test]
fn test_missing_renderer_is_logged_as_warning() {
    let dir = TempDir::new().unwrap();
    let options = CallGraphOptions {
        output_image: Some(dir.path().join("graph.png")),
        renderer: Some(dir.path().join("no-dot-here")),
        ..CallGraphOptions::default()
    };

    create_call_graph("work()", &Bindings::new(), &options, |_, _| {
        Ok::<_, String>(())
    });

    assert!(logs_contain("No call graph produced for 'work()'"));
    assert!(logs_contain("Graph renderer unavailable"));
    assert!(!logs_contain("Call graph written"));
}

#[cfg(unix)]
#[traced_test]
#[test]
fn test_renderer_timeout_is_logged() {
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;

    let dir = TempDir::new().unwrap();
    let renderer = dir.path().join("slow-dot");
    std::fs::write(&renderer, "#!/bin/sh\nexec sleep 30\n").unwrap();
    std::fs::set_permissions(&renderer, std::fs::Permissions::from_mode(0o755)).unwrap();

    let options = CallGraphOptions {
        output_image: Some(dir.path().join("graph.png")),
        renderer: Some(renderer),
        render_timeout: Duration::from_millis(200),
        ..CallGraphOptions::default()
    };
    create_call_graph("slow()", &Bindings::new(), &options, |_, _| {
        Ok::<_, String>(())
    });

    assert!(logs_contain("Graph renderer exceeded"));
    assert!(logs_contain("Graph renderer timed out"));
}

#[test]
fn test_directives_build_env_filter_string() {
    let logging_system = LoggingSystem::new();
    logging_system
        .add_directive("pipeline_devtools::hierarchy=debug")
        .unwrap();
    logging_system.add_directive("not a directive").unwrap();

    assert_eq!(logging_system.directive_count(), 1);
    assert_eq!(
        logging_system.build_filter_string(LogLevel::Warn),
        "warn,pipeline_devtools::hierarchy=debug"
    );
}
