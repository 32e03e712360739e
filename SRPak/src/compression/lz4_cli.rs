//! `lz4` command-line backend

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{Compressor, StagedFile};
use crate::error::{Error, Result};

/// Program name looked up on `PATH` by default
pub const DEFAULT_PROGRAM: &str = "lz4";

/// Runs an external `lz4` executable.
///
/// Compression uses `-9 -BS5` (level 9, 64 KiB independent blocks), the
/// frame settings the game expects.
#[derive(Debug, Clone)]
pub struct Lz4Cli {
    program: PathBuf,
}

impl Default for Lz4Cli {
    fn default() -> Self {
        Self::new()
    }
}

impl Lz4Cli {
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
        }
    }

    /// Use a specific executable instead of `lz4` from `PATH`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Whether the executable can be launched at all.
    #[must_use]
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    fn run(&self, args: &[&OsStr]) -> Result<()> {
        let program = self.program.display().to_string();
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::CompressorUnavailable {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(Error::Compression {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Compressor for Lz4Cli {
    fn compress(&self, source: &Path, work_dir: &Path) -> Result<StagedFile> {
        let file_name = source.file_name().ok_or_else(|| Error::IoAt {
            path: source.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
        })?;
        std::fs::create_dir_all(work_dir).map_err(Error::io_at(work_dir))?;
        let target = work_dir.join(file_name);

        self.run(&[
            OsStr::new("-9"),
            OsStr::new("-BS5"),
            source.as_os_str(),
            target.as_os_str(),
        ])?;

        let size = std::fs::metadata(&target)
            .map_err(Error::io_at(&target))?
            .len();
        Ok(StagedFile { path: target, size })
    }

    fn decompress(&self, path: &Path) -> Result<()> {
        let mut decoded = OsString::from(path.as_os_str());
        decoded.push("_dec");
        let decoded = PathBuf::from(decoded);

        self.run(&[
            OsStr::new("-d"),
            path.as_os_str(),
            decoded.as_os_str(),
            OsStr::new("--rm"),
            OsStr::new("-f"),
        ])?;

        std::fs::rename(&decoded, path).map_err(Error::io_at(path))
    }
}
