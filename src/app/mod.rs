pub mod config;
pub mod initialization;
pub mod logging_system;

pub use config::{Command, Config, ConfigError, LogFormat, LogLevel};
pub use initialization::InitializationError;
pub use logging_system::{LoggingSystem, setup_logging_safe};

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::DevtoolsError;
use crate::profiling::{Bindings, create_call_graph};
use crate::projection::{ModelIndex, TreeProjection, level_choices};
use crate::registry::{
    InMemoryRegistry, LoggerRegistry, RegistryError, RegistrySnapshot, level_name, parse_level,
};
use crate::session::EditorSession;

/// The command line front end: one registry, one editor session, one command.
pub struct App {
    config: Config,
    registry: Arc<InMemoryRegistry>,
    session: EditorSession,
}

impl App {
    pub fn from_args<I, T>(args: I) -> Result<Self, DevtoolsError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::from_args_and_file(args)?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, DevtoolsError> {
        let registry = match &config.registry_file {
            Some(path) => {
                info!("Loading registry from {}", path.display());
                RegistrySnapshot::from_file(path)?.into_registry()?
            }
            None => InMemoryRegistry::new(),
        };
        let registry = Arc::new(registry);
        let session = EditorSession::new(registry.clone(), config.hierarchy_builder());

        Ok(Self {
            config,
            registry,
            session,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<InMemoryRegistry> {
        &self.registry
    }

    /// Run the configured command, writing its output to `out`.
    pub fn run(&mut self, out: &mut dyn Write) -> Result<(), DevtoolsError> {
        match self.config.command() {
            Command::Tree { json, hide } => {
                if !hide.is_empty() {
                    self.session.toggle_filters();
                    if let Some(filter) = self.session.filters_mut() {
                        for bucket in hide {
                            filter.set_visible(bucket, false);
                        }
                    }
                }
                self.print_tree(out, json)
            }
            Command::SetLevel { level, names, save } => {
                let level = parse_level(&level)?;
                let indices = self.resolve(&names)?;
                let changed = self
                    .session
                    .open_editor()
                    .set_level_for_selection(&indices, level)?;
                info!(changed, level, "Applied level");
                if save {
                    self.save()?;
                }
                self.print_tree(out, false)
            }
            Command::Reset { name, save } => {
                let indices = self.resolve(std::slice::from_ref(&name))?;
                let editor = self.session.open_editor();
                for index in &indices {
                    editor.reset_level(index)?;
                }
                if save {
                    self.save()?;
                }
                self.print_tree(out, false)
            }
            Command::Levels => {
                for bucket in level_choices() {
                    writeln!(out, "{:>3}  {}", bucket.code(), bucket.label())?;
                }
                Ok(())
            }
            Command::Profile {
                output,
                profile_output,
                show_stack,
            } => self.profile(out, output, profile_output, show_stack),
        }
    }

    fn resolve(&mut self, names: &[String]) -> Result<Vec<ModelIndex>, DevtoolsError> {
        let editor = self.session.open_editor();
        names
            .iter()
            .map(|name| -> Result<ModelIndex, DevtoolsError> {
                editor
                    .index_of(name)?
                    .ok_or_else(|| RegistryError::UnknownLogger(name.clone()).into())
            })
            .collect()
    }

    fn print_tree(&mut self, out: &mut dyn Write, json: bool) -> Result<(), DevtoolsError> {
        self.session.open_editor();
        let rows = self.session.visible_rows()?;

        if json {
            serde_json::to_writer_pretty(&mut *out, &rows).map_err(std::io::Error::from)?;
            writeln!(out)?;
            return Ok(());
        }

        writeln!(
            out,
            "root [{}]",
            level_name(self.registry.root().effective_level())
        )?;
        for row in &rows {
            writeln!(out, "{row}")?;
        }
        Ok(())
    }

    fn save(&self) -> Result<(), DevtoolsError> {
        let Some(path) = &self.config.registry_file else {
            return Err(ConfigError::InvalidConfig(
                "--save needs --registry-file".to_string(),
            )
            .into());
        };
        let snapshot = RegistrySnapshot::from_registry(self.registry.as_ref());
        std::fs::write(path, snapshot.to_toml_string()?)?;
        info!("Saved registry to {}", path.display());
        Ok(())
    }

    fn profile(
        &self,
        out: &mut dyn Write,
        output: Option<PathBuf>,
        profile_output: Option<PathBuf>,
        show_stack: bool,
    ) -> Result<(), DevtoolsError> {
        let mut options = self.config.call_graph_options();
        options.output_image = output;
        options.output_profile = profile_output;
        options.show_stack = show_stack;

        let bindings = Bindings::new()
            .with_global("loggers", self.registry.len())
            .with_global(
                "registry_file",
                self.config
                    .registry_file
                    .as_ref()
                    .map(|path| path.display().to_string()),
            );
        let registry: Arc<dyn LoggerRegistry> = self.registry.clone();
        let builder = self.config.hierarchy_builder();

        let report = create_call_graph("render logger tree", &bindings, &options, |profiler, _| {
            let entries = profiler.time("LoggerRegistry::entries", || registry.entries());
            let forest = profiler.time("HierarchyBuilder::build", || builder.build(entries))?;
            profiler.time("Forest::walk", || forest.walk());

            let mut projection = TreeProjection::new(registry.clone(), builder);
            let rows = profiler.time("TreeProjection::rows", || projection.rows())?;
            Ok::<_, DevtoolsError>(rows.len())
        });

        writeln!(out, "{}", report.label)?;
        if let Some(path) = &report.profile {
            writeln!(out, "profile data: {}", path.display())?;
        }
        match &report.image {
            Ok(path) => writeln!(out, "call graph: {}", path.display())?,
            Err(e) => {
                warn!("Call graph not rendered: {}", e);
                writeln!(out, "no call graph produced: {e}")?;
            }
        }
        let rows = report.into_outcome()?;
        info!(rows, "Profiled logger tree");
        Ok(())
    }
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Entry point used by the binary.
pub fn main() -> anyhow::Result<()> {
    let config = match Config::from_args_and_file(std::env::args_os()) {
        Ok(config) => config,
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = setup_logging_safe(config.log_level, config.log_format, &config.log_directives)
    {
        eprintln!("Warning: {e}");
    }
    info!("Starting pipeline-devtools v{}", get_version());

    let mut app = App::from_config(config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    app.run(&mut out)?;
    out.flush()?;
    Ok(())
}
