//! File-level entry point: open a .tpf, parse it, and name its output folder.

use crate::parser::{Container, ParseError, ParseOptions};
use log::debug;
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor};
use std::path::{Path, PathBuf};

/// A parsed .tpf file.
#[derive(Debug)]
pub struct TpfFile {
    /// Path the container was read from, if any.
    pub source: Option<PathBuf>,
    pub container: Container,
}

impl TpfFile {
    /// Parse from an in-memory copy of the file.
    pub fn from_bytes(bytes: &[u8], options: &ParseOptions) -> Result<Self, ParseError> {
        let container = Container::parse(Cursor::new(bytes), options)?;
        Ok(Self {
            source: None,
            container,
        })
    }

    /// Read from a file path. The handle is closed before returning, on
    /// success and on error.
    pub fn from_file(path: &Path, options: &ParseOptions) -> Result<Self, ParseError> {
        let file = File::open(path)?;
        debug!("parsing {}", path.display());
        let container = Container::parse(BufReader::new(file), options)?;
        Ok(Self {
            source: Some(path.to_path_buf()),
            container,
        })
    }

    /// Folder the textures of `path` go to by default:
    /// `textures/m10.tpf` becomes `textures/m10_textures`.
    pub fn default_output_dir(path: &Path) -> PathBuf {
        let mut dir = path.with_extension("").into_os_string();
        dir.push("_textures");
        PathBuf::from(dir)
    }

    /// Check if parsing stopped early under `ErrorPolicy::KeepResolved`.
    pub fn is_incomplete(&self) -> bool {
        self.container.incomplete.is_some()
    }
}

/// The .tpf files directly inside `dir` (extension matched case-insensitively),
/// sorted by path. Subdirectories are not searched.
pub fn find_tpf_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_tpf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("tpf"));
        if is_tpf && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
