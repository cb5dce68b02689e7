use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("Invalid log level '{input}'. Valid levels: {valid_levels:?}")]
    InvalidLogLevel {
        input: String,
        valid_levels: Vec<String>,
    },

    #[error("Invalid directive format '{input}'. Expected: '{expected}'")]
    InvalidDirectiveFormat { input: String, expected: String },

    #[error("Empty target in directive '{input}'")]
    EmptyTarget { input: String },

    #[error("Logging system initialization failed: {details}")]
    LoggingInitFailed {
        details: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl InitializationError {
    /// What [`LoggingSystem`](super::LoggingSystem) does when a directive is rejected.
    pub fn fallback_strategy(&self) -> FallbackStrategy {
        match self {
            InitializationError::InvalidLogLevel { .. } => FallbackStrategy::UseDefaultLevel,
            InitializationError::InvalidDirectiveFormat { .. } => FallbackStrategy::SkipDirective,
            InitializationError::EmptyTarget { .. } => FallbackStrategy::SkipDirective,
            InitializationError::LoggingInitFailed { .. } => FallbackStrategy::Abort,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStrategy {
    UseDefaultLevel,
    SkipDirective,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = InitializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(InitializationError::InvalidLogLevel {
                input: s.to_string(),
                valid_levels: ["error", "warn", "info", "debug", "trace"]
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            }),
        }
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// One `target=level` filter entry, e.g. `pipeline_devtools::hierarchy=debug`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirective {
    pub target: String,
    pub level: LogLevel,
}

impl LogDirective {
    pub fn new(target: impl Into<String>, level: LogLevel) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    pub fn parse(directive: &str) -> Result<Self, InitializationError> {
        let Some((target, level)) = directive.split_once('=') else {
            return Err(InitializationError::InvalidDirectiveFormat {
                input: directive.to_string(),
                expected: "target=level".to_string(),
            });
        };
        if level.contains('=') {
            return Err(InitializationError::InvalidDirectiveFormat {
                input: directive.to_string(),
                expected: "target=level".to_string(),
            });
        }

        let target = target.trim();
        if target.is_empty() {
            return Err(InitializationError::EmptyTarget {
                input: directive.to_string(),
            });
        }

        Ok(LogDirective::new(target, LogLevel::from_str(level.trim())?))
    }

    /// Form accepted by `tracing_subscriber::EnvFilter`.
    pub fn to_filter_string(&self) -> String {
        format!("{}={}", self.target, self.level.as_str())
    }
}
