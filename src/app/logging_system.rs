use super::config::{LogFormat, LogLevel as ConfigLogLevel};
use super::initialization::{FallbackStrategy, InitializationError, LogDirective, LogLevel};
use parking_lot::RwLock;
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Collects filter directives and installs the global tracing subscriber.
/// Output goes to stderr so command output on stdout stays clean.
pub struct LoggingSystem {
    directives: RwLock<Vec<LogDirective>>,
    fallback_level: LogLevel,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: RwLock::new(Vec::new()),
            fallback_level: LogLevel::Info,
        }
    }

    /// Add a `target=level` directive. Malformed directives are skipped and an
    /// unknown level falls back to info; both are reported on stderr.
    pub fn add_directive(&self, directive_str: &str) -> Result<(), InitializationError> {
        match LogDirective::parse(directive_str) {
            Ok(directive) => {
                self.directives.write().push(directive);
                Ok(())
            }
            Err(e) => match e.fallback_strategy() {
                FallbackStrategy::UseDefaultLevel => {
                    eprintln!("Warning: {e}, using default level");
                    self.add_default_directive(directive_str);
                    Ok(())
                }
                FallbackStrategy::SkipDirective => {
                    eprintln!("Warning: {e}, skipping directive");
                    Ok(())
                }
                FallbackStrategy::Abort => Err(e),
            },
        }
    }

    fn add_default_directive(&self, directive_str: &str) {
        let target = directive_str.split('=').next().unwrap_or("unknown").trim();
        self.directives
            .write()
            .push(LogDirective::new(target, self.fallback_level));
    }

    pub fn initialize_tracing(
        &self,
        default_level: LogLevel,
        format: LogFormat,
    ) -> Result<(), InitializationError> {
        let filter_string = self.build_filter_string(default_level);

        let env_filter = EnvFilter::try_new(&filter_string).map_err(|e| {
            InitializationError::LoggingInitFailed {
                details: format!("Failed to create EnvFilter with '{filter_string}'"),
                source: Box::new(e),
            }
        })?;

        let result = match format {
            LogFormat::Json => tracing::subscriber::set_global_default(
                tracing_subscriber::registry().with(env_filter).with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_current_span(true)
                        .with_writer(std::io::stderr),
                ),
            ),
            LogFormat::Compact => tracing::subscriber::set_global_default(
                tracing_subscriber::registry().with(env_filter).with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_ansi(true)
                        .with_writer(std::io::stderr)
                        .compact(),
                ),
            ),
        };

        result.map_err(|e| InitializationError::LoggingInitFailed {
            details: "Failed to set global tracing subscriber".to_string(),
            source: Box::new(e),
        })
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();

        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        filter_parts.extend(directives.iter().map(LogDirective::to_filter_string));

        filter_parts.join(",")
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ConfigLogLevel> for LogLevel {
    fn from(config_level: ConfigLogLevel) -> Self {
        match config_level {
            ConfigLogLevel::Error => LogLevel::Error,
            ConfigLogLevel::Warn => LogLevel::Warn,
            ConfigLogLevel::Info => LogLevel::Info,
            ConfigLogLevel::Debug => LogLevel::Debug,
            ConfigLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// Install logging once per process. Later calls return the first outcome.
pub fn setup_logging_safe(
    level: ConfigLogLevel,
    format: LogFormat,
    directives: &[String],
) -> Result<(), InitializationError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let outcome = INIT.get_or_init(|| {
        let logging_system = LoggingSystem::new();
        let result: Result<(), InitializationError> = (|| {
            for directive in directives {
                logging_system.add_directive(directive)?;
            }
            logging_system.initialize_tracing(level.into(), format)
        })();
        result.map_err(|e| e.to_string())
    });

    outcome
        .clone()
        .map_err(|details| InitializationError::LoggingInitFailed {
            details,
            source: Box::new(std::io::Error::other("Logging initialization error")),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_add_valid_directive() {
        let logging_system = LoggingSystem::new();
        assert!(logging_system.add_directive("pipeline_devtools=warn").is_ok());
        assert!(logging_system.add_directive("which=error").is_ok());
        assert_eq!(logging_system.directive_count(), 2);
    }

    #[test]
    fn test_fallback_strategies() {
        let logging_system = LoggingSystem::new();

        let test_cases = [
            ("hierarchy=warn", 1),
            ("invalid_format", 1),
            ("target=invalid_level", 2),
            ("=empty", 2),
            ("", 2),
        ];

        for (directive, expected_count) in test_cases {
            assert!(logging_system.add_directive(directive).is_ok(), "{directive}");
            assert_eq!(logging_system.directive_count(), expected_count, "{directive}");
        }
        assert!(
            logging_system
                .build_filter_string(LogLevel::Warn)
                .ends_with("target=info")
        );
    }

    #[test]
    fn test_build_filter_string() {
        let logging_system = LoggingSystem::new();
        assert_eq!(logging_system.build_filter_string(LogLevel::Info), "info");

        logging_system.add_directive("pipeline_devtools::profiling=trace").unwrap();
        assert_eq!(
            logging_system.build_filter_string(LogLevel::Debug),
            "debug,pipeline_devtools::profiling=trace"
        );
    }

    #[test]
    fn test_concurrent_directive_modification() {
        let logging_system = Arc::new(LoggingSystem::new());

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let logging_system = logging_system.clone();
                thread::spawn(move || {
                    logging_system.add_directive(&format!("target{i}=info")).unwrap();
                    logging_system.build_filter_string(LogLevel::Info)
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().is_ok());
        }
        assert_eq!(logging_system.directive_count(), 50);
    }

    #[test]
    fn test_config_log_level_conversion() {
        assert_eq!(LogLevel::from(ConfigLogLevel::Error), LogLevel::Error);
        assert_eq!(LogLevel::from(ConfigLogLevel::Trace), LogLevel::Trace);
    }

    #[test]
    fn test_setup_logging_safe_is_idempotent() {
        let first = setup_logging_safe(ConfigLogLevel::Info, LogFormat::Compact, &[]);
        let second = setup_logging_safe(ConfigLogLevel::Debug, LogFormat::Json, &[]);
        // Another test harness may own the global subscriber already; either
        // way both calls must agree.
        assert_eq!(first.is_ok(), second.is_ok());
    }
}
