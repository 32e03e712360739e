//! Options for unpacking and packing

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::classify::{CompressionPolicy, Layout};
use crate::compression::{Compressor, Lz4Cli};
use crate::error::Result;
use crate::scheduler::{DEFAULT_THREADS, validate_threads};

/// Options for [`PackfileOperations::unpack`](super::PackfileOperations::unpack)
#[derive(Clone)]
pub struct UnpackOptions {
    /// Maximum number of entries extracted at once (1-50)
    pub threads: usize,
    /// Backend used to decompress compressed entries
    pub compressor: Arc<dyn Compressor>,
    /// Directory conventions for the output tree
    pub layout: Layout,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            compressor: Arc::new(Lz4Cli::new()),
            layout: Layout::DEFAULT,
        }
    }
}

impl fmt::Debug for UnpackOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnpackOptions")
            .field("threads", &self.threads)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl UnpackOptions {
    /// Create options with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker thread count
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Use a different decompression backend
    #[must_use]
    pub fn with_compressor(mut self, compressor: impl Compressor + 'static) -> Self {
        self.compressor = Arc::new(compressor);
        self
    }

    /// Check option values before any work starts.
    ///
    /// # Errors
    /// Returns [`ValidationError::ThreadCount`](crate::error::ValidationError::ThreadCount)
    /// if `threads` is out of range.
    pub fn validate(&self) -> Result<()> {
        validate_threads(self.threads)
    }
}

/// Options for [`PackfileOperations::pack`](super::PackfileOperations::pack)
#[derive(Clone)]
pub struct PackOptions {
    /// Store every file as-is
    pub no_compression: bool,
    /// Backend used to compress entries
    pub compressor: Arc<dyn Compressor>,
    /// Directory conventions for the source tree
    pub layout: Layout,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            no_compression: false,
            compressor: Arc::new(Lz4Cli::new()),
            layout: Layout::DEFAULT,
        }
    }
}

impl fmt::Debug for PackOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackOptions")
            .field("no_compression", &self.no_compression)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl PackOptions {
    /// Create options with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable compression entirely
    #[must_use]
    pub fn with_no_compression(mut self, no_compression: bool) -> Self {
        self.no_compression = no_compression;
        self
    }

    /// Use a different compression backend
    #[must_use]
    pub fn with_compressor(mut self, compressor: impl Compressor + 'static) -> Self {
        self.compressor = Arc::new(compressor);
        self
    }

    /// Compression policy for a given output archive
    #[must_use]
    pub fn policy_for(&self, output: &Path) -> CompressionPolicy {
        CompressionPolicy::for_output(output, self.no_compression)
    }
}
