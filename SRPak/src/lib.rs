//! # SRPak
//!
//! A pure-Rust library for Saints Row packfiles (`.vpp_pc` / `.str2_pc`).
//!
//! ## Supported Operations
//!
//! - **Unpack** - Extract one or more archives into a directory tree
//! - **Pack** - Build an archive from a directory tree
//! - **List** - Inspect an archive's entry table
//!
//! Entry bodies are compressed with an external `lz4` executable, which must
//! be on `PATH` (or passed explicitly) for archives that contain compressed
//! entries.
//!
//! ## Quick Start
//!
//! ### Working with Packfiles
//!
//! ```no_run
//! use std::path::PathBuf;
//! use srpak::pak_tools::{PackOptions, PackfileOperations, UnpackOptions};
//!
//! // List contents of an archive
//! let entries = PackfileOperations::list("misc.vpp_pc")?;
//! println!("Found {} files", entries.len());
//!
//! // Extract with 16 workers
//! let options = UnpackOptions::new().with_threads(16);
//! PackfileOperations::unpack(&[PathBuf::from("misc.vpp_pc")], "extracted", &options)?;
//!
//! // Repack the extracted tree
//! PackfileOperations::pack("extracted", "misc_mod.vpp_pc", &PackOptions::new())?;
//! # Ok::<(), srpak::Error>(())
//! ```
//!
//! ### Reading the Container Directly
//!
//! ```no_run
//! use srpak::packfile::PackfileReader;
//!
//! let reader = PackfileReader::open("misc.vpp_pc")?;
//! let index = reader.index()?;
//! for entry in &index.entries {
//!     println!("{} ({} bytes)", entry.display_path(), entry.record.uncompressed_size);
//! }
//! # Ok::<(), srpak::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `srpak` command-line binary

pub mod compression;
pub mod error;
pub mod pak_tools;
pub mod packfile;
pub mod scheduler;

#[cfg(feature = "cli")]
pub mod cli;

// Re-exports for convenience
pub use error::{Error, FormatError, Result, ValidationError};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::compression::{Compressor, Lz4Cli, StagedFile};
    pub use crate::error::{Error, FormatError, Result, ValidationError};
    pub use crate::packfile::{
        EntryInfo, PackPhase, PackProgress, PackfileEntry, PackfileIndex, PackfileReader,
    };
    pub use crate::pak_tools::{
        CompressionPolicy, PackOptions, PackSummary, PackfileOperations, UnpackOptions,
        UnpackSummary,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
