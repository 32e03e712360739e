//! Types shared by the packfile reader, writer and operations

use serde::Serialize;

use super::{EntryRecord, Header};

/// Separator used in stored directory names
pub const DIR_SEPARATOR: char = '\\';

/// An entry record with its directory and file names resolved.
///
/// Names are kept as the exact bytes from the name table; `directory` and
/// `name` are lossy UTF-8 renderings for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackfileEntry {
    /// Directory name for display (backslash separated)
    pub directory: String,
    /// File name for display
    pub name: String,
    /// Directory name bytes as stored
    pub directory_bytes: Vec<u8>,
    /// File name bytes as stored
    pub name_bytes: Vec<u8>,
    /// The raw record
    pub record: EntryRecord,
}

impl PackfileEntry {
    #[must_use]
    pub fn new(directory_bytes: &[u8], name_bytes: &[u8], record: EntryRecord) -> Self {
        Self {
            directory: String::from_utf8_lossy(directory_bytes).into_owned(),
            name: String::from_utf8_lossy(name_bytes).into_owned(),
            directory_bytes: directory_bytes.to_vec(),
            name_bytes: name_bytes.to_vec(),
            record,
        }
    }

    /// `directory\name`, as the game refers to the file.
    #[must_use]
    pub fn display_path(&self) -> String {
        if self.directory.is_empty() {
            self.name.clone()
        } else {
            format!("{}{DIR_SEPARATOR}{}", self.directory, self.name)
        }
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.record.is_compressed()
    }
}

/// Everything decoded from an archive before any body is touched.
#[derive(Debug, Clone)]
pub struct PackfileIndex {
    pub header: Header,
    /// Directory names in table order
    pub directories: Vec<String>,
    /// Entries in table order
    pub entries: Vec<PackfileEntry>,
}

impl PackfileIndex {
    /// Sum of body sizes in the data section.
    #[must_use]
    pub fn stored_total(&self) -> u64 {
        self.entries.iter().map(|e| e.record.effective_size()).sum()
    }

    /// Sum of decompressed body sizes.
    #[must_use]
    pub fn uncompressed_total(&self) -> u64 {
        self.entries.iter().map(|e| e.record.uncompressed_size).sum()
    }
}

/// Listing row for one entry (used by `list --json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub path: String,
    pub directory: String,
    pub name: String,
    pub data_offset: u64,
    pub stored_size: u64,
    pub uncompressed_size: u64,
    pub compressed: bool,
    pub alignment: u16,
}

impl From<&PackfileEntry> for EntryInfo {
    fn from(entry: &PackfileEntry) -> Self {
        Self {
            path: entry.display_path(),
            directory: entry.directory.clone(),
            name: entry.name.clone(),
            data_offset: entry.record.data_offset,
            stored_size: entry.record.effective_size(),
            uncompressed_size: entry.record.uncompressed_size,
            compressed: entry.record.is_compressed(),
            alignment: entry.record.alignment,
        }
    }
}

/// Progress information during packfile operations
#[derive(Debug, Clone)]
pub struct PackProgress {
    /// Current operation phase
    pub phase: PackPhase,
    /// Current item number (1-indexed)
    pub current: usize,
    /// Total number of items
    pub total: usize,
    /// Current file being processed (if applicable)
    pub current_file: Option<String>,
}

impl PackProgress {
    /// Create a new progress update
    #[must_use]
    pub fn new(phase: PackPhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: None,
        }
    }

    /// Create a progress update with a file name
    #[must_use]
    pub fn with_file(
        phase: PackPhase,
        current: usize,
        total: usize,
        file: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: Some(file.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// Progress callback for packfile operations.
///
/// Must be `Sync + Send` since extraction reports from worker threads.
pub type ProgressCallback<'a> = &'a (dyn Fn(&PackProgress) + Sync + Send);

/// Phase of a packfile operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackPhase {
    /// Reading the header
    ReadingHeader,
    /// Reading the entry table and name table
    ReadingTable,
    /// Writing (and decompressing) entry bodies
    ExtractingFiles,
    /// Walking the source tree
    ScanningFiles,
    /// Running the compressor on source files
    CompressingFiles,
    /// Writing the header, entry table and name table
    WritingTable,
    /// Streaming entry bodies into the archive
    WritingFiles,
    /// Operation complete
    Complete,
}

impl PackPhase {
    /// Human-readable label
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PackPhase::ReadingHeader => "Parsing header",
            PackPhase::ReadingTable => "Parsing entries",
            PackPhase::ExtractingFiles => "Extracting files",
            PackPhase::ScanningFiles => "Populating paths",
            PackPhase::CompressingFiles => "Compressing files",
            PackPhase::WritingTable => "Writing file entries",
            PackPhase::WritingFiles => "Writing files",
            PackPhase::Complete => "Complete",
        }
    }
}
