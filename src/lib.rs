#![warn(rust_2018_idioms, rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Durations and call counts stay far below the limits
    clippy::cast_precision_loss,      // Acceptable for percentages shown in the call graph
    clippy::missing_errors_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. RegistryError in registry module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod error;
pub mod hierarchy;
pub mod profiling;
pub mod projection;
pub mod registry;
pub mod session;

// Re-export main types for easy access
pub use app::{App, Config};
pub use error::DevtoolsError;
pub use hierarchy::{AncestorPolicy, Forest, ForestCache, HierarchyBuilder, NodeId, TreeNode};
pub use profiling::{
    Bindings, CallGraphOptions, GraphRenderer, ProfileError, Profiler, create_call_graph,
};
pub use projection::{LevelBucket, ModelIndex, TreeProjection, bucket_of};
pub use registry::{InMemoryRegistry, LoggerRecord, LoggerRegistry};
pub use session::{BucketFilter, EditorSession};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
