use serde::{Deserialize, Serialize};
use std::path::Path;

use super::level::{WARNING, parse_level};
use super::{InMemoryRegistry, LoggerRegistry, RegistryError};

/// A level written either as a number or as a name. The name `inherit` leaves the
/// logger without an explicit level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelValue {
    Numeric(i32),
    Named(String),
}

impl LevelValue {
    pub fn resolve(&self) -> Result<Option<i32>, RegistryError> {
        match self {
            LevelValue::Numeric(level) => Ok(Some(*level)),
            LevelValue::Named(name) if name.eq_ignore_ascii_case("inherit") => Ok(None),
            LevelValue::Named(name) => parse_level(name).map(Some),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LevelValue>,
}

/// Serializable seed for an [`InMemoryRegistry`].
///
/// ```toml
/// root_level = "warning"
///
/// [[loggers]]
/// name = "app"
/// level = "debug"
///
/// [[loggers]]
/// name = "app.io"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_level: Option<LevelValue>,
    #[serde(default)]
    pub loggers: Vec<LoggerSpec>,
}

impl RegistrySnapshot {
    pub fn from_toml_str(content: &str) -> Result<Self, RegistryError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, RegistryError> {
        Ok(toml::to_string(self)?)
    }

    /// Register every logger in file order and apply its level.
    pub fn into_registry(self) -> Result<InMemoryRegistry, RegistryError> {
        let root_level = match &self.root_level {
            Some(value) => value.resolve()?.unwrap_or(WARNING),
            None => WARNING,
        };
        let registry = InMemoryRegistry::with_root_level(root_level);

        for spec in &self.loggers {
            let level = match &spec.level {
                Some(value) => value.resolve()?,
                None => None,
            };
            registry.set_level(&spec.name, level)?;
        }

        tracing::debug!(loggers = registry.len(), root_level, "Seeded registry");
        Ok(registry)
    }

    /// Capture the explicit levels of `registry`.
    pub fn from_registry(registry: &dyn LoggerRegistry) -> Self {
        let loggers = registry
            .entries()
            .into_iter()
            .map(|(name, record)| LoggerSpec {
                name,
                level: record.level().map(LevelValue::Numeric),
            })
            .collect();

        Self {
            root_level: registry.root().level().map(LevelValue::Numeric),
            loggers,
        }
    }
}
