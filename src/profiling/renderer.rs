use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use super::ProfileError;

pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

const RENDERER_NAME: &str = "dot";

// Keep error messages readable when the renderer dumps a lot of diagnostics.
const MAX_STDERR_BYTES: u64 = 4096;

/// Graphviz `dot` wrapper turning a DOT file into a PNG.
#[derive(Debug, Clone)]
pub struct GraphRenderer {
    executable: PathBuf,
    timeout: Duration,
}

impl GraphRenderer {
    /// Use `executable` as-is, without checking that it exists.
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout,
        }
    }

    /// Find the renderer. An explicit path wins and must exist; otherwise the
    /// search path is consulted, then the usual install locations.
    pub fn locate(explicit: Option<&Path>, timeout: Duration) -> Result<Self, ProfileError> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(Self::new(path, timeout));
            }
            return Err(ProfileError::RendererUnavailable(format!(
                "configured renderer {} does not exist",
                path.display()
            )));
        }

        if let Ok(path) = which::which(RENDERER_NAME) {
            debug!("Found graph renderer on PATH: {}", path.display());
            return Ok(Self::new(path, timeout));
        }

        let common_paths = if cfg!(target_os = "macos") {
            vec![
                "/usr/local/bin/dot",
                "/opt/homebrew/bin/dot",
                "/opt/local/bin/dot",
            ]
        } else if cfg!(target_os = "windows") {
            vec![
                "C:\\Program Files\\Graphviz\\bin\\dot.exe",
                "C:\\Program Files (x86)\\Graphviz\\bin\\dot.exe",
            ]
        } else {
            vec!["/usr/bin/dot", "/usr/local/bin/dot"]
        };

        for path_str in common_paths {
            let path = PathBuf::from(path_str);
            if path.is_file() {
                return Ok(Self::new(path, timeout));
            }
        }

        Err(ProfileError::RendererUnavailable(format!(
            "'{RENDERER_NAME}' was not found on PATH or in the usual install locations"
        )))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `<renderer> -Tpng <input> -o <output>` and wait for it.
    pub fn render(&self, input: &Path, output: &Path) -> Result<(), ProfileError> {
        let mut stderr_log = tempfile::tempfile()?;

        let mut command = Command::new(&self.executable);
        command
            .arg("-Tpng")
            .arg(input)
            .arg("-o")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_log.try_clone()?));

        debug!(
            "Rendering {} to {} with {}",
            input.display(),
            output.display(),
            self.executable.display()
        );

        let mut child = command.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                ProfileError::RendererUnavailable(format!(
                    "cannot run {}: {e}",
                    self.executable.display()
                ))
            }
            _ => ProfileError::Io(e),
        })?;

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => return Err(self.abandon(&mut child)),
        };

        if !status.success() {
            let mut stderr = String::new();
            stderr_log.seek(SeekFrom::Start(0))?;
            let _ = stderr_log
                .by_ref()
                .take(MAX_STDERR_BYTES)
                .read_to_string(&mut stderr);
            return Err(ProfileError::RendererFailed {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(())
    }

    /// Kill and reap a renderer that ran past its timeout. The child may exit on
    /// its own in the meantime, so a failed kill is only logged.
    fn abandon(&self, child: &mut Child) -> ProfileError {
        warn!("Graph renderer exceeded {:?}, killing it", self.timeout);
        if let Err(e) = child.kill() {
            debug!("Renderer kill failed: {}", e);
        }
        if let Err(e) = child.wait() {
            warn!("Failed to reap graph renderer: {}", e);
        }
        ProfileError::RendererTimedOut {
            timeout: self.timeout,
        }
    }
}
