//! Compression gateway
//!
//! Entry bodies are compressed and decompressed by an external tool. The
//! [`Compressor`] trait is the seam; [`Lz4Cli`] is the production backend.

mod lz4_cli;

use std::path::{Path, PathBuf};

use crate::error::Result;

pub use lz4_cli::{DEFAULT_PROGRAM, Lz4Cli};

/// A compressed copy of a source file, waiting to be written into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    /// Compressed length in bytes
    pub size: u64,
}

/// File-to-file compression backend.
pub trait Compressor: Send + Sync {
    /// Compress `source` into `work_dir`, keeping the source file name.
    ///
    /// # Errors
    /// Returns an error if the backend fails or the output cannot be inspected.
    fn compress(&self, source: &Path, work_dir: &Path) -> Result<StagedFile>;

    /// Decompress the file at `path` in place.
    ///
    /// # Errors
    /// Returns an error if the backend fails or the result cannot be moved
    /// over `path`.
    fn decompress(&self, path: &Path) -> Result<()>;
}
