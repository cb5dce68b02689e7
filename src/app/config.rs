use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::hierarchy::{AncestorPolicy, HierarchyBuilder};
use crate::profiling::CallGraphOptions;
use crate::projection::LevelBucket;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

/// Verbosity of this tool's own diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human readable output
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the logger tree with effective levels
    Tree {
        /// Emit rows as JSON instead of an indented tree
        #[arg(long)]
        json: bool,
        /// Hide rows whose level falls in this bucket (repeatable)
        #[arg(long = "hide", value_name = "BUCKET")]
        hide: Vec<LevelBucket>,
    },
    /// Set explicit levels on one or more loggers
    SetLevel {
        /// Level name (debug, info, warning, error, ...) or number
        level: String,
        /// Qualified logger names
        #[arg(required = true)]
        names: Vec<String>,
        /// Write the updated registry back to the registry file
        #[arg(long)]
        save: bool,
    },
    /// Clear a logger's explicit level so it inherits again
    Reset {
        name: String,
        #[arg(long)]
        save: bool,
    },
    /// List the levels offered by the editor
    Levels,
    /// Profile building and flattening the tree and render a call graph
    Profile {
        /// PNG to write (defaults to a file in the temp directory)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Keep the statistics at this path
        #[arg(long)]
        profile_output: Option<PathBuf>,
        /// Title the graph with the current stack instead of the timing summary
        #[arg(long)]
        show_stack: bool,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Tree {
            json: false,
            hide: Vec::new(),
        }
    }
}

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Log level
    #[arg(long, env = "DEVTOOLS_LOG_LEVEL", default_value = "warn")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "RUST_LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Extra `target=level` logging directives (repeatable)
    #[arg(long = "log-directive", env = "DEVTOOLS_LOG_DIRECTIVES", value_delimiter = ',')]
    pub log_directives: Vec<String>,

    /// TOML file seeding the logger registry
    #[arg(long, env = "DEVTOOLS_REGISTRY_FILE")]
    pub registry_file: Option<PathBuf>,

    /// How to treat loggers whose ancestors were never registered
    #[arg(long, env = "DEVTOOLS_ANCESTOR_POLICY", default_value = "synthesize")]
    pub ancestor_policy: AncestorPolicy,

    /// Order top-level loggers by name instead of registration order
    #[arg(long, env = "DEVTOOLS_SORT_ROOTS")]
    pub sort_roots: bool,

    /// Graphviz `dot` executable (searched on PATH when unset)
    #[arg(long, env = "DEVTOOLS_RENDERER")]
    pub renderer_path: Option<PathBuf>,

    /// Seconds to wait for the renderer before killing it
    #[arg(long, env = "DEVTOOLS_RENDERER_TIMEOUT_SECS", default_value = "60")]
    pub renderer_timeout_secs: u64,

    /// Keep the intermediate profile and DOT files next to the image
    #[arg(long, env = "DEVTOOLS_KEEP_INTERMEDIATES")]
    pub keep_intermediates: bool,

    /// Configuration file path (optional)
    #[arg(long, env = "DEVTOOLS_CONFIG")]
    pub config_file: Option<PathBuf>,

    #[serde(skip)]
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub renderer_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            log_format: LogFormat::Compact,
            log_directives: Vec::new(),
            registry_file: None,
            ancestor_policy: AncestorPolicy::Synthesize,
            sort_roots: false,
            renderer_path: None,
            renderer_timeout_secs: 60,
            keep_intermediates: false,
            config_file: None,
            command: None,
            renderer_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::try_parse_from(args)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`from_args`](Self::from_args), with a `--config-file` underneath.
    /// File values only fill fields the command line and environment left at
    /// their defaults.
    pub fn from_args_and_file<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::try_parse_from(args)?;
        if let Some(path) = config.config_file.clone() {
            let base_config = Self::from_file(&path)?;
            config.merge_base(base_config);
        }

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    fn merge_base(&mut self, base_config: Config) {
        let defaults = Config::default();

        if self.log_level == defaults.log_level {
            self.log_level = base_config.log_level;
        }
        if self.log_format == defaults.log_format {
            self.log_format = base_config.log_format;
        }
        if self.log_directives.is_empty() {
            self.log_directives = base_config.log_directives;
        }
        if self.registry_file.is_none() {
            self.registry_file = base_config.registry_file;
        }
        if self.ancestor_policy == defaults.ancestor_policy {
            self.ancestor_policy = base_config.ancestor_policy;
        }
        if !self.sort_roots {
            self.sort_roots = base_config.sort_roots;
        }
        if self.renderer_path.is_none() {
            self.renderer_path = base_config.renderer_path;
        }
        if self.renderer_timeout_secs == defaults.renderer_timeout_secs {
            self.renderer_timeout_secs = base_config.renderer_timeout_secs;
        }
        if !self.keep_intermediates {
            self.keep_intermediates = base_config.keep_intermediates;
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.renderer_timeout = Duration::from_secs(self.renderer_timeout_secs);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.renderer_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Renderer timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(path) = &self.registry_file
            && !path.is_file()
        {
            return Err(ConfigError::InvalidConfig(format!(
                "Registry file does not exist: {}",
                path.display()
            )));
        }

        Ok(())
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or_default()
    }

    pub fn hierarchy_builder(&self) -> HierarchyBuilder {
        HierarchyBuilder::new(self.ancestor_policy).with_sorted_roots(self.sort_roots)
    }

    pub fn call_graph_options(&self) -> CallGraphOptions {
        CallGraphOptions {
            renderer: self.renderer_path.clone(),
            render_timeout: self.renderer_timeout,
            keep_intermediates: self.keep_intermediates,
            ..CallGraphOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::from_args(["pipeline-devtools"]).unwrap();
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.ancestor_policy, AncestorPolicy::Synthesize);
        assert_eq!(config.renderer_timeout, Duration::from_secs(60));
        assert_eq!(config.command(), Command::default());
    }

    #[test]
    fn test_set_level_command() {
        let config = Config::from_args([
            "pipeline-devtools",
            "--ancestor-policy",
            "fail",
            "set-level",
            "debug",
            "app",
            "app.io",
        ])
        .unwrap();
        assert_eq!(config.ancestor_policy, AncestorPolicy::Fail);
        assert_eq!(
            config.command(),
            Command::SetLevel {
                level: "debug".to_string(),
                names: vec!["app".to_string(), "app.io".to_string()],
                save: false,
            }
        );
    }

    #[test]
    fn test_tree_hide_buckets() {
        let config = Config::from_args([
            "pipeline-devtools",
            "tree",
            "--hide",
            "debug",
            "--hide",
            "warning",
        ])
        .unwrap();
        match config.command() {
            Command::Tree { hide, json } => {
                assert!(!json);
                assert_eq!(hide, vec![LevelBucket::Debug, LevelBucket::Warning]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Config::from_args(["pipeline-devtools", "--renderer-timeout-secs", "0"])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_registry_file_rejected() {
        let err = Config::from_args([
            "pipeline-devtools",
            "--registry-file",
            "/definitely/not/here.toml",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("Registry file does not exist"));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "log_level = \"debug\"\nancestor_policy = \"fail\"\nrenderer_timeout_secs = 5"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.ancestor_policy, AncestorPolicy::Fail);
        assert_eq!(config.renderer_timeout, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_call_graph_options() {
        let config = Config {
            renderer_path: Some(PathBuf::from("/opt/graphviz/dot")),
            renderer_timeout: Duration::from_secs(9),
            keep_intermediates: true,
            ..Config::default()
        };
        let options = config.call_graph_options();
        assert_eq!(options.renderer, Some(PathBuf::from("/opt/graphviz/dot")));
        assert_eq!(options.render_timeout, Duration::from_secs(9));
        assert!(options.keep_intermediates);
        assert!(options.output_image.is_none());
    }
}
