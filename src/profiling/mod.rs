//! Profiling runner
//!
//! Measures a closure, stores its call statistics, turns them into a DOT call
//! graph and renders that to PNG with graphviz. Only the measured code's own
//! failure reaches the caller; artifact and renderer problems are logged and
//! show up as "no image" in the report.

pub mod artifact;
pub mod dot;
pub mod recorder;
pub mod renderer;
pub mod runner;

pub use artifact::{read_stats, write_stats};
pub use dot::{DotOptions, to_dot};
pub use recorder::{CallStats, EdgeStats, FunctionStats, Profiler, SpanGuard};
pub use renderer::{DEFAULT_RENDER_TIMEOUT, GraphRenderer};
pub use runner::{Bindings, ProfileRun, run_profile, summary_label};

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Failed to write profile artifact {}: {source}", .path.display())]
    ProfilerWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Graph renderer unavailable: {0}")]
    RendererUnavailable(String),

    #[error("Graph renderer exited with {code:?}: {stderr}")]
    RendererFailed { code: Option<i32>, stderr: String },

    #[error("Graph renderer timed out after {timeout:?}")]
    RendererTimedOut { timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProfileError {
    /// True for problems with the external renderer rather than with our own
    /// artifacts.
    pub fn is_renderer_error(&self) -> bool {
        matches!(
            self,
            ProfileError::RendererUnavailable(_)
                | ProfileError::RendererFailed { .. }
                | ProfileError::RendererTimedOut { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct CallGraphOptions {
    /// Target PNG. Defaults to a timestamped file in the temp directory.
    pub output_image: Option<PathBuf>,
    /// Where to keep the statistics. Defaults to `<image stem>.profile`.
    pub output_profile: Option<PathBuf>,
    /// Explicit renderer executable; searched for when unset.
    pub renderer: Option<PathBuf>,
    pub render_timeout: Duration,
    /// Title the graph with the current stack instead of the run summary.
    pub show_stack: bool,
    /// Keep the derived `.profile` and `.dot` files next to the image.
    pub keep_intermediates: bool,
    pub dot: DotOptions,
}

impl Default for CallGraphOptions {
    fn default() -> Self {
        Self {
            output_image: None,
            output_profile: None,
            renderer: None,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            show_stack: false,
            keep_intermediates: false,
            dot: DotOptions::default(),
        }
    }
}

/// What a call-graph run produced.
#[derive(Debug)]
pub struct CallGraphReport<T, E> {
    pub elapsed: Duration,
    pub outcome: Result<T, E>,
    pub label: String,
    /// Statistics file left on disk, if any.
    pub profile: Option<PathBuf>,
    pub image: Result<PathBuf, ProfileError>,
}

impl<T, E> CallGraphReport<T, E> {
    pub fn image_path(&self) -> Option<&Path> {
        self.image.as_deref().ok()
    }

    pub fn into_outcome(self) -> Result<T, E> {
        self.outcome
    }
}

/// Measure `body`, write its statistics and render a call graph image.
///
/// The body always runs and its statistics are always written, even when no
/// renderer can be found. The body's result is returned untouched in
/// [`CallGraphReport::outcome`]. A derived `.profile` is only removed once it
/// has been rendered.
pub fn create_call_graph<T, E, F>(
    snippet: &str,
    bindings: &Bindings,
    options: &CallGraphOptions,
    body: F,
) -> CallGraphReport<T, E>
where
    F: FnOnce(&Profiler, &Bindings) -> Result<T, E>,
{
    let image = resolve_image_path(options.output_image.as_deref());
    let renderer = GraphRenderer::locate(options.renderer.as_deref(), options.render_timeout);

    let run = run_profile(snippet, bindings, body);
    let label = summary_label(snippet, run.elapsed, options.show_stack);

    let profile_path = options
        .output_profile
        .clone()
        .unwrap_or_else(|| image.with_extension("profile"));
    let mut profile = match write_stats(&run.stats, &profile_path) {
        Ok(()) => Some(profile_path),
        Err(e) => {
            warn!("Profile statistics not saved: {}", e);
            None
        }
    };

    let rendered = renderer.and_then(|renderer| {
        produce_image(&renderer, &run.stats, &label, &image, options)
    });
    match &rendered {
        Ok(path) => info!("Call graph written to {}", path.display()),
        Err(e) => warn!("No call graph produced for '{}': {}", snippet, e),
    }

    // An explicitly requested profile is output, not an intermediate.
    if rendered.is_ok()
        && !options.keep_intermediates
        && options.output_profile.is_none()
        && let Some(path) = profile.take()
    {
        remove_quietly(&path);
    }

    CallGraphReport {
        elapsed: run.elapsed,
        outcome: run.outcome,
        label,
        profile,
        image: rendered,
    }
}

fn produce_image(
    renderer: &GraphRenderer,
    stats: &CallStats,
    label: &str,
    image: &Path,
    options: &CallGraphOptions,
) -> Result<PathBuf, ProfileError> {
    let dot_path = image.with_extension("dot");

    let result = fs::write(&dot_path, to_dot(stats, label, &options.dot))
        .map_err(|source| ProfileError::ProfilerWriteFailure {
            path: dot_path.clone(),
            source,
        })
        .and_then(|()| renderer.render(&dot_path, image));

    if !options.keep_intermediates {
        remove_quietly(&dot_path);
    }

    result.map(|()| image.to_path_buf())
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}

/// Normalise a user supplied image path: expand a leading `~` and make it
/// absolute. Without one, pick a fresh file in the temp directory.
pub fn resolve_image_path(requested: Option<&Path>) -> PathBuf {
    let Some(requested) = requested else {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%6f");
        return std::env::temp_dir().join(format!("profileGraph_{stamp}.png"));
    };

    let expanded = expand_home(requested);
    std::path::absolute(&expanded).unwrap_or(expanded)
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_image_in_temp_dir() {
        let path = resolve_image_path(None);
        assert_eq!(path.parent(), Some(std::env::temp_dir().as_path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("profileGraph_"));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn test_relative_image_made_absolute() {
        let path = resolve_image_path(Some(Path::new("graphs/run.png")));
        assert!(path.is_absolute());
        assert!(path.ends_with("graphs/run.png"));
    }

    #[test]
    fn test_renderer_error_classification() {
        assert!(ProfileError::RendererUnavailable("x".into()).is_renderer_error());
        assert!(
            ProfileError::RendererTimedOut {
                timeout: Duration::from_secs(1)
            }
            .is_renderer_error()
        );
        assert!(!ProfileError::Io(std::io::Error::other("x")).is_renderer_error());
    }

    #[cfg(unix)]
    mod call_graph {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn fake_renderer(dir: &TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("fake-dot");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn options(dir: &TempDir, renderer: PathBuf) -> CallGraphOptions {
            CallGraphOptions {
                output_image: Some(dir.path().join("graph.png")),
                renderer: Some(renderer),
                ..CallGraphOptions::default()
            }
        }

        #[test]
        fn test_image_produced_and_intermediates_removed() {
            let dir = TempDir::new().unwrap();
            let renderer = fake_renderer(&dir, "cp \"$2\" \"$4\"");
            let options = options(&dir, renderer);

            let report = create_call_graph("work()", &Bindings::new(), &options, |p, _| {
                p.time("inner", || Ok::<_, String>(7))
            });

            assert_eq!(report.outcome, Ok(7));
            let image = report.image_path().unwrap();
            assert_eq!(image, dir.path().join("graph.png"));
            let rendered = fs::read_to_string(image).unwrap();
            assert!(rendered.starts_with("digraph {"));
            assert!(rendered.contains("work() | Total Time:"));
            assert!(!dir.path().join("graph.dot").exists());
            assert!(!dir.path().join("graph.profile").exists());
            assert_eq!(report.profile, None);
        }

        #[test]
        fn test_keep_intermediates() {
            let dir = TempDir::new().unwrap();
            let renderer = fake_renderer(&dir, "cp \"$2\" \"$4\"");
            let options = CallGraphOptions {
                keep_intermediates: true,
                ..options(&dir, renderer)
            };

            let report = create_call_graph("work()", &Bindings::new(), &options, |_, _| {
                Ok::<_, String>(())
            });

            assert!(report.image.is_ok());
            assert!(dir.path().join("graph.dot").exists());
            let stats = read_stats(&dir.path().join("graph.profile")).unwrap();
            assert_eq!(stats.snippet, "work()");
        }

        #[test]
        fn test_explicit_profile_kept() {
            let dir = TempDir::new().unwrap();
            let renderer = fake_renderer(&dir, "cp \"$2\" \"$4\"");
            let profile = dir.path().join("keep").join("run.profile");
            let options = CallGraphOptions {
                output_profile: Some(profile.clone()),
                ..options(&dir, renderer)
            };

            create_call_graph("work()", &Bindings::new(), &options, |_, _| {
                Ok::<_, String>(())
            });
            assert!(profile.exists());
            assert!(!dir.path().join("graph.dot").exists());
        }

        #[test]
        fn test_snippet_error_propagates_untouched() {
            let dir = TempDir::new().unwrap();
            let renderer = fake_renderer(&dir, "cp \"$2\" \"$4\"");
            let options = options(&dir, renderer);

            let report = create_call_graph("fail()", &Bindings::new(), &options, |_, _| {
                Err::<(), _>("division by zero".to_string())
            });

            assert_eq!(report.into_outcome(), Err("division by zero".to_string()));
        }

        #[test]
        fn test_missing_renderer_still_runs_body() {
            let dir = TempDir::new().unwrap();
            let options = options(&dir, dir.path().join("no-such-dot"));
            let mut ran = false;

            let report = create_call_graph("work()", &Bindings::new(), &options, |_, _| {
                ran = true;
                Ok::<_, String>(1)
            });

            assert!(ran);
            assert_eq!(report.outcome, Ok(1));
            assert!(matches!(
                report.image,
                Err(ProfileError::RendererUnavailable(_))
            ));
            assert!(!dir.path().join("graph.png").exists());
            // Nothing was rendered, so the statistics stay behind.
            let profile = dir.path().join("graph.profile");
            assert_eq!(report.profile.as_deref(), Some(profile.as_path()));
            assert_eq!(read_stats(&profile).unwrap().snippet, "work()");
        }

        #[test]
        fn test_explicit_profile_written_without_renderer() {
            let dir = TempDir::new().unwrap();
            let profile = dir.path().join("run.profile");
            let options = CallGraphOptions {
                output_profile: Some(profile.clone()),
                ..options(&dir, dir.path().join("missing-dot"))
            };

            let report = create_call_graph("work()", &Bindings::new(), &options, |p, _| {
                p.time("inner", || Ok::<_, String>(()))
            });

            assert!(matches!(
                report.image,
                Err(ProfileError::RendererUnavailable(_))
            ));
            assert_eq!(report.profile.as_deref(), Some(profile.as_path()));
            let stats = read_stats(&profile).unwrap();
            assert!(stats.function("inner").is_some());
        }

        #[test]
        fn test_failing_renderer_reports_no_image() {
            let dir = TempDir::new().unwrap();
            let renderer = fake_renderer(&dir, "echo bad graph >&2\nexit 1");
            let options = options(&dir, renderer);

            let report = create_call_graph("work()", &Bindings::new(), &options, |_, _| {
                Ok::<_, String>(())
            });

            assert!(report.outcome.is_ok());
            assert!(report.image_path().is_none());
            assert!(matches!(report.image, Err(ProfileError::RendererFailed { .. })));
            assert!(!dir.path().join("graph.dot").exists());
        }
    }
}
