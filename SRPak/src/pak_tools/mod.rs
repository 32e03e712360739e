//! Packfile operations: unpack, pack and list

pub mod classify;
mod helpers;
mod operations;
mod options;

pub use classify::{CompressionPolicy, Layout};
pub use helpers::{
    ARCHIVE_EXTENSIONS, DEFAULT_PACK_OUTPUT, DEFAULT_UNPACK_DIR, normalize_inputs,
    resolve_output_path, validate_archive_path,
};
pub use operations::{PackSummary, PackfileOperations, UnpackSummary};
pub use options::{PackOptions, UnpackOptions};

pub use crate::packfile::ProgressCallback;
