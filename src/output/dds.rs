//! DDS output: one `<name>.dds` file per entry.

use crate::parser::Container;
use log::{info, warn};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing extracted textures.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Entry name {0:?} is not a safe file name")]
    UnsafeName(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of writing a container's entries to disk.
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Written files, in entry order.
    pub written: Vec<PathBuf>,
    /// Entries that were not written: (index, reason).
    pub skipped: Vec<(usize, String)>,
}

/// File name for an entry: trailing whitespace trimmed, `.dds` appended.
pub fn dds_file_name(name: &str) -> Result<String, OutputError> {
    let trimmed = name.trim_end();
    let unsafe_name = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\', '\0', ':', '*', '?', '"', '<', '>', '|']);
    if unsafe_name {
        return Err(OutputError::UnsafeName(name.to_string()));
    }
    Ok(format!("{}.dds", trimmed))
}

/// Write every entry's payload to `<dir>/<name>.dds`, creating `dir` first.
///
/// Entries with unusable names are skipped and reported; I/O failures abort.
/// When several entries share a name the last one wins, and the file appears
/// once in [`WriteReport::written`].
pub fn write_dds_files(container: &Container, dir: &Path) -> Result<WriteReport, OutputError> {
    fs::create_dir_all(dir)?;

    let mut report = WriteReport::default();
    let mut seen = HashSet::new();

    for (index, entry) in container.entries.iter().enumerate() {
        let file_name = match dds_file_name(&entry.name) {
            Ok(file_name) => file_name,
            Err(e) => {
                warn!("skipping entry {index}: {e}");
                report.skipped.push((index, e.to_string()));
                continue;
            }
        };
        let first = seen.insert(file_name.clone());
        if !first {
            warn!("entry {index} overwrites an earlier {file_name}");
        }

        let path = dir.join(&file_name);
        fs::write(&path, &entry.payload)?;
        info!("extracted {}", path.display());
        // Each file is listed once, however many entries wrote it.
        if first {
            report.written.push(path);
        }
    }

    Ok(report)
}
