//! Conversion of extracted DDS files through an external converter process.

use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Converter exited with {status} for {input}")]
    Failed { input: PathBuf, status: ExitStatus },

    #[error("Converter reported success but {0} was not written")]
    MissingOutput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Turns one DDS file into a sibling file of another format.
pub trait Converter {
    /// Convert `input`, returning the path of the converted file.
    fn convert(&self, input: &Path) -> Result<PathBuf, ConvertError>;
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Target file type, passed to the converter and used as the extension.
    pub format: String,
    /// Leave the .dds next to the converted file.
    pub keep_source: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            format: "png".to_string(),
            keep_source: false,
        }
    }
}

/// DirectXTex `texconv` command line converter.
#[derive(Debug, Clone)]
pub struct Texconv {
    pub program: PathBuf,
    pub options: ConvertOptions,
}

impl Texconv {
    pub fn new(program: impl Into<PathBuf>, options: ConvertOptions) -> Self {
        Self {
            program: program.into(),
            options,
        }
    }

    /// `texconv <input> -ft <format> -o <dir> -y`, output discarded.
    pub fn command(&self, input: &Path) -> Command {
        let out_dir = match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut command = Command::new(&self.program);
        command
            .arg(input)
            .arg("-ft")
            .arg(&self.options.format)
            .arg("-o")
            .arg(out_dir)
            .arg("-y")
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }

    fn finish(&self, input: &Path) -> Result<(), ConvertError> {
        if !self.options.keep_source {
            fs::remove_file(input)?;
        }
        Ok(())
    }
}

impl Converter for Texconv {
    fn convert(&self, input: &Path) -> Result<PathBuf, ConvertError> {
        let target = input.with_extension(&self.options.format);

        if target.exists() {
            debug!("{} already converted", target.display());
            self.finish(input)?;
            return Ok(target);
        }

        let status = self
            .command(input)
            .status()
            .map_err(|source| ConvertError::Launch {
                program: self.program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(ConvertError::Failed {
                input: input.to_path_buf(),
                status,
            });
        }
        if !target.exists() {
            return Err(ConvertError::MissingOutput(target));
        }

        self.finish(input)?;
        Ok(target)
    }
}

#[derive(Debug, Default)]
pub struct ConvertReport {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Convert each file, logging and collecting failures instead of stopping.
pub fn convert_all<C: Converter + ?Sized>(converter: &C, files: &[PathBuf]) -> ConvertReport {
    let mut report = ConvertReport::default();

    for file in files {
        match converter.convert(file) {
            Ok(target) => {
                info!("converted {}", target.display());
                report.converted.push(target);
            }
            Err(e) => {
                warn!("failed to convert {}: {}", file.display(), e);
                report.failed.push((file.clone(), e.to_string()));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    struct RejectOdd;

    impl Converter for RejectOdd {
        fn convert(&self, input: &Path) -> Result<PathBuf, ConvertError> {
            if input.to_string_lossy().contains("odd") {
                return Err(ConvertError::MissingOutput(input.with_extension("png")));
            }
            Ok(input.with_extension("png"))
        }
    }

    #[test]
    fn test_convert_all_isolates_failures() {
        let files = vec![
            PathBuf::from("out/a.dds"),
            PathBuf::from("out/odd.dds"),
            PathBuf::from("out/b.dds"),
        ];
        let report = convert_all(&RejectOdd, &files);

        assert_eq!(
            report.converted,
            vec![PathBuf::from("out/a.png"), PathBuf::from("out/b.png")]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, PathBuf::from("out/odd.dds"));
    }

    #[test]
    fn test_texconv_command() {
        let texconv = Texconv::new("tools/texconv", ConvertOptions::default());
        let command = texconv.command(Path::new("out/c1000_a.dds"));

        assert_eq!(command.get_program(), OsStr::new("tools/texconv"));
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(args, ["out/c1000_a.dds", "-ft", "png", "-o", "out", "-y"]);

        let bare = texconv.command(Path::new("c1000_a.dds"));
        assert_eq!(bare.get_args().nth(4), Some(OsStr::new(".")));
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("c1000_a.dds");
        fs::write(&input, b"DDS ").unwrap();

        let texconv = Texconv::new(dir.path().join("no-such-texconv"), ConvertOptions::default());
        assert!(matches!(
            texconv.convert(&input),
            Err(ConvertError::Launch { .. })
        ));
        assert!(input.exists());
    }

    #[test]
    fn test_existing_target_skips_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("c1000_a.dds");
        let target = dir.path().join("c1000_a.png");
        fs::write(&input, b"DDS ").unwrap();
        fs::write(&target, b"PNG").unwrap();

        let texconv = Texconv::new(dir.path().join("no-such-texconv"), ConvertOptions::default());
        assert_eq!(texconv.convert(&input).unwrap(), target);
        assert!(!input.exists());

        fs::write(&input, b"DDS ").unwrap();
        let keep = Texconv::new(
            dir.path().join("no-such-texconv"),
            ConvertOptions {
                keep_source: true,
                ..ConvertOptions::default()
            },
        );
        assert_eq!(keep.convert(&input).unwrap(), target);
        assert!(input.exists());
    }
}
