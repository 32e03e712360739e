//! Error types for `SRPak`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `SRPak` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO error tied to a specific path.
    #[error("IO error on {path}: {source}")]
    IoAt {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal error during packing.
    #[error("directory traversal error: {0}")]
    WalkDir(String),

    // ==================== Packfile Errors ====================
    /// The archive is malformed or uses an unsupported layout.
    #[error("malformed packfile: {0}")]
    Format(#[from] FormatError),

    /// A layout value does not fit its on-disk field.
    #[error("{field} does not fit its packfile field: {value}")]
    LayoutOverflow {
        /// Name of the header or entry field.
        field: &'static str,
        /// The value that overflowed.
        value: u64,
    },

    /// A source file changed size between scanning and writing.
    #[error("source file changed while packing: {path} (expected {expected} bytes, found {actual})")]
    SourceChanged {
        /// The file that changed.
        path: PathBuf,
        /// Size recorded in the entry table.
        expected: u64,
        /// Bytes actually streamed into the archive.
        actual: u64,
    },

    // ==================== Argument Errors ====================
    /// Caller-supplied arguments were rejected before any work started.
    #[error("invalid arguments: {0}")]
    Validation(#[from] ValidationError),

    // ==================== Compression Errors ====================
    /// The external compressor could not be launched.
    #[error("failed to launch compressor `{program}`: {source}")]
    CompressorUnavailable {
        /// The program that was invoked.
        program: String,
        /// The spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The external compressor exited with a failure status.
    #[error("compressor `{program}` failed ({status}): {stderr}")]
    Compression {
        /// The program that was invoked.
        program: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Captured standard error output.
        stderr: String,
    },

    // ==================== Extraction Errors ====================
    /// Extraction stopped after the first failing entry.
    ///
    /// Entries that had not started when the failure was observed are
    /// skipped; entries already in flight were allowed to finish.
    #[error(
        "extraction aborted: {failed} of {total} entries failed ({completed} completed, {skipped} skipped): {source}"
    )]
    ExtractionAborted {
        /// Number of entries submitted.
        total: usize,
        /// Number of entries that failed.
        failed: usize,
        /// Number of entries written successfully.
        completed: usize,
        /// Number of entries skipped after cancellation.
        skipped: usize,
        /// The first error observed.
        #[source]
        source: Box<Error>,
    },

    /// A task panicked instead of returning.
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// The worker pool could not be created.
    #[error("failed to start worker pool: {0}")]
    Scheduler(String),
}

/// Structural problems found while decoding an archive.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The file does not start with the packfile magic.
    #[error("bad magic {found:02X?}, expected [CE, 0A, 89, 51]")]
    BadMagic {
        /// The four bytes found at offset 0.
        found: [u8; 4],
    },

    /// The container version is not the one this crate understands.
    #[error("unsupported packfile version {found} (supported: {expected})")]
    UnsupportedVersion {
        /// Version read from the header.
        found: u32,
        /// The only supported version.
        expected: u32,
    },

    /// A structure ended before its declared size.
    #[error("truncated {what}")]
    Truncated {
        /// Which structure was being read.
        what: &'static str,
    },

    /// A name offset points outside the name table or at an unterminated string.
    #[error("name offset {offset} is invalid for a {size}-byte name table")]
    BadNameOffset {
        /// The offending offset.
        offset: u64,
        /// Size of the name table.
        size: u64,
    },

    /// An entry's data range lies outside the archive.
    #[error("data for `{name}` ({start}..{end}) lies outside the archive ({len} bytes)")]
    DataOutOfBounds {
        /// Directory-qualified entry name.
        name: String,
        /// Absolute start offset.
        start: u64,
        /// Absolute end offset (exclusive).
        end: u64,
        /// Archive length.
        len: u64,
    },

    /// An entry would be written outside the output directory.
    #[error("entry path `{path}` escapes the output directory")]
    UnsafePath {
        /// Directory-qualified entry name.
        path: String,
    },

    /// An entry name cannot be represented as a path on this platform.
    #[error("entry name `{path}` is not valid UTF-8 and cannot be used as a path here")]
    UnrepresentableName {
        /// Directory-qualified entry name, decoded lossily for display.
        path: String,
    },

    /// Two entries of one archive resolve to the same output file.
    #[error("entry path `{path}` occurs more than once in the archive")]
    DuplicatePath {
        /// Directory-qualified entry name, decoded lossily for display.
        path: String,
    },
}

/// Argument problems detected before any file is opened.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Worker thread count outside the supported range.
    #[error("thread count must be between {min} and {max}, got {count}")]
    ThreadCount {
        /// Requested count.
        count: usize,
        /// Inclusive minimum.
        min: usize,
        /// Inclusive maximum.
        max: usize,
    },

    /// An input or output path has the wrong extension.
    #[error("invalid file extension: {path} (expected {expected})")]
    BadExtension {
        /// The rejected path.
        path: PathBuf,
        /// Accepted extensions.
        expected: &'static str,
    },

    /// An input path does not exist.
    #[error("input not found: {path}")]
    MissingInput {
        /// The missing path.
        path: PathBuf,
    },
}

impl Error {
    /// Attach a path to an IO error.
    pub(crate) fn io_at(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Error::IoAt { path, source }
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDir(err.to_string())
    }
}

/// Result type alias for `SRPak` operations.
pub type Result<T> = std::result::Result<T, Error>;
