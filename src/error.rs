use thiserror::Error;

use crate::app::{ConfigError, InitializationError};
use crate::hierarchy::HierarchyError;
use crate::profiling::ProfileError;
use crate::projection::ProjectionError;
use crate::registry::RegistryError;

/// Top-level error for callers that drive several subsystems at once.
#[derive(Error, Debug)]
pub enum DevtoolsError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Profiling error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Initialization error: {0}")]
    Initialization(#[from] InitializationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
