//! Packfile (`.vpp_pc` / `.str2_pc`) container codec
//!
//! Layout, in file order:
//!
//! | Region | Size |
//! |---|---|
//! | Header | [`HEADER_SIZE`] bytes |
//! | Entry table | [`ENTRY_SIZE`] bytes per file |
//! | Directory name offsets | 8 bytes per directory |
//! | Name table | `names_size` bytes of NUL-terminated strings |
//! | Data section | stored file bodies, back to back |
//!
//! All integers are little-endian.

mod entry;
mod header;
mod names;
mod reader;
mod types;
mod writer;

pub use entry::{EntryRecord, read_directory_offsets, read_entry_table, write_directory_offsets, write_entry_table};
pub use header::{Header, PatchPositions};
pub use names::{NameTable, NameTableBuilder};
pub use reader::{PackfileReader, ReadAt};
pub use types::*;
pub use writer::{LaidOutDirectory, LaidOutFile, LaidOutPack, PackPlan, PackfileWriter, PlannedFile};

use crate::error::{Error, FormatError};

/// Packfile magic bytes
pub const MAGIC: [u8; 4] = [0xCE, 0x0A, 0x89, 0x51];

/// The only supported container version
pub const VERSION: u32 = 17;

/// Size of the fixed header; the entry table starts here
pub const HEADER_SIZE: u64 = 0x78;

/// Size of one entry table record
pub const ENTRY_SIZE: u64 = 48;

/// Stored-size value marking an entry as not compressed
pub const UNCOMPRESSED_SENTINEL: u64 = u64::MAX;

/// Header flags written on pack
pub const DEFAULT_FLAGS: u32 = 0x5001;

/// Entry flag bit set when the body is compressed
pub const FLAG_COMPRESSED: u16 = 0x1;

/// Map an unexpected EOF to a truncation error for `what`.
pub(crate) fn truncated(what: &'static str) -> impl Fn(std::io::Error) -> Error {
    move |err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Format(FormatError::Truncated { what })
        } else {
            Error::Io(err)
        }
    }
}
