//! Path helpers for packfile operations

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use super::classify::{Layout, has_extension};
use crate::error::{FormatError, Result, ValidationError};

/// Accepted archive extensions
pub const ARCHIVE_EXTENSIONS: &[&str] = &[".vpp_pc", ".str2_pc"];

/// Human-readable form of [`ARCHIVE_EXTENSIONS`] for error messages
const ARCHIVE_EXTENSIONS_DISPLAY: &str = ".vpp_pc or .str2_pc";

/// Default unpack output directory
pub const DEFAULT_UNPACK_DIR: &str = "srpak_extracted";

/// Default pack output archive
pub const DEFAULT_PACK_OUTPUT: &str = "srpak_packed.vpp_pc";

/// Check that `path` ends in a packfile extension.
///
/// # Errors
/// Returns [`ValidationError::BadExtension`] otherwise.
pub fn validate_archive_path(path: &Path) -> Result<()> {
    if has_extension(&path.to_string_lossy(), ARCHIVE_EXTENSIONS) {
        Ok(())
    } else {
        Err(ValidationError::BadExtension {
            path: path.to_path_buf(),
            expected: ARCHIVE_EXTENSIONS_DISPLAY,
        }
        .into())
    }
}

/// Make input paths absolute, strip trailing separators and drop
/// case-insensitive duplicates (first occurrence wins).
///
/// # Errors
/// Returns an error if the current directory cannot be determined.
pub fn normalize_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut seen: Vec<String> = Vec::with_capacity(paths.len());
    let mut filtered = Vec::with_capacity(paths.len());

    for path in paths {
        // Rebuilding from components drops trailing separators.
        let normalized: PathBuf = std::path::absolute(path)?.components().collect();
        let key = normalized.to_string_lossy().to_lowercase();
        if seen.contains(&key) {
            tracing::warn!("Duplicate path filtered: {}", normalized.display());
            continue;
        }
        seen.push(key);
        filtered.push(normalized);
    }

    Ok(filtered)
}

/// Output path for an entry under `out_dir`.
///
/// `directory` and `name` are the raw name table bytes. The directory
/// (backslash or slash separated) is resolved lexically below
/// `out_dir/<primary group>`. `..` may climb out of the primary group (the
/// remapped group lives beside it) but never out of `out_dir`.
///
/// # Errors
/// Returns [`FormatError::UnsafePath`] if the entry would land outside
/// `out_dir` or the file name is not a plain name, and
/// [`FormatError::UnrepresentableName`] if a name cannot become a path on
/// this platform.
pub fn resolve_output_path(
    out_dir: &Path,
    layout: &Layout,
    directory: &[u8],
    name: &[u8],
) -> Result<PathBuf> {
    let shown = || {
        let mut full = directory.to_vec();
        if !full.is_empty() {
            full.push(b'\\');
        }
        full.extend_from_slice(name);
        String::from_utf8_lossy(&full).into_owned()
    };
    let unsafe_path = || FormatError::UnsafePath { path: shown() };
    let unrepresentable = || FormatError::UnrepresentableName { path: shown() };

    let mut parts: Vec<&OsStr> = vec![OsStr::new(layout.primary_group)];
    for part in directory.split(|&b| b == b'\\' || b == b'/') {
        match part {
            b"" | b"." => {}
            b".." => {
                parts.pop().ok_or_else(unsafe_path)?;
            }
            _ if is_plain_name(part) => {
                parts.push(os_component(part).ok_or_else(unrepresentable)?);
            }
            _ => return Err(unsafe_path().into()),
        }
    }

    if !is_plain_name(name) {
        return Err(unsafe_path().into());
    }

    let mut path = out_dir.to_path_buf();
    path.extend(parts);
    path.push(os_component(name).ok_or_else(unrepresentable)?);
    Ok(path)
}

/// A single normal path component with no separators, drive or root.
fn is_plain_name(part: &[u8]) -> bool {
    !part.is_empty()
        && part != b"."
        && part != b".."
        && !part.iter().any(|&b| matches!(b, b'\\' | b'/' | b':'))
}

/// Name bytes as a path component, byte for byte.
#[cfg(unix)]
fn os_component(part: &[u8]) -> Option<&OsStr> {
    use std::os::unix::ffi::OsStrExt;

    Some(OsStr::from_bytes(part))
}

/// Name bytes as a path component; only UTF-8 names are representable.
#[cfg(not(unix))]
fn os_component(part: &[u8]) -> Option<&OsStr> {
    std::str::from_utf8(part).ok().map(OsStr::new)
}
