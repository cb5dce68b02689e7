//! Logger registry
//!
//! The hierarchy builder and the projection never reach for a process-global
//! logging manager. They depend on the narrow [`LoggerRegistry`] interface, which
//! is injected by whoever owns the loggers.

pub mod level;
pub mod memory;
pub mod record;
pub mod snapshot;

pub use level::{level_name, parse_level};
pub use memory::InMemoryRegistry;
pub use record::LoggerRecord;
pub use snapshot::{LevelValue, LoggerSpec, RegistrySnapshot};

use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid log level '{input}'. Valid levels: {valid_levels:?}")]
    InvalidLogLevel {
        input: String,
        valid_levels: Vec<String>,
    },

    #[error("Invalid logger name '{0}': names must be non-empty dot-separated segments")]
    InvalidName(String),

    #[error("Unknown logger '{0}'")]
    UnknownLogger(String),

    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Read/write access to a set of named loggers.
pub trait LoggerRegistry: Send + Sync {
    /// The root record, which is never part of [`entries`](Self::entries).
    fn root(&self) -> Arc<LoggerRecord>;

    /// Every named logger as `(name, record)`, in registration order.
    fn entries(&self) -> Vec<(String, Arc<LoggerRecord>)>;

    fn lookup(&self, name: &str) -> Option<Arc<LoggerRecord>>;
}

/// Checks that `name` is a sequence of non-empty dot-separated segments.
pub fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.is_empty() || name.split('.').any(str::is_empty) {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Number of `.` separators in a dotted name.
pub fn depth_of(name: &str) -> usize {
    name.matches('.').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("app").is_ok());
        assert!(validate_name("app.io.net").is_ok());

        for bad in ["", ".", "app.", ".app", "app..io"] {
            assert!(
                matches!(validate_name(bad), Err(RegistryError::InvalidName(_))),
                "Should reject: {bad:?}"
            );
        }
    }

    #[test]
    fn test_depth_of() {
        assert_eq!(depth_of("app"), 0);
        assert_eq!(depth_of("app.io"), 1);
        assert_eq!(depth_of("app.io.net"), 2);
    }
}
