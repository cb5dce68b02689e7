use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use super::ProfileError;
use super::recorder::CallStats;

/// Write `stats` to `path` as JSON. The file either appears complete or not at
/// all: data goes to a sibling temp file that is renamed into place.
pub fn write_stats(stats: &CallStats, path: &Path) -> Result<(), ProfileError> {
    let failure = |source: std::io::Error| ProfileError::ProfilerWriteFailure {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(failure)?;

    let mut temp = NamedTempFile::new_in(dir).map_err(failure)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, stats).map_err(|e| failure(e.into()))?;
        writer.flush().map_err(failure)?;
    }
    temp.as_file().sync_all().map_err(failure)?;
    temp.persist(path).map_err(|e| failure(e.error))?;

    tracing::debug!("Wrote profile artifact to {}", path.display());
    Ok(())
}

pub fn read_stats(path: &Path) -> Result<CallStats, ProfileError> {
    let data = fs::read(path)?;
    serde_json::from_slice(&data).map_err(|e| ProfileError::Io(e.into()))
}
