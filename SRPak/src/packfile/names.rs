//! Name table: NUL-terminated directory and file names

use crate::error::{FormatError, Result};

/// Append-only name table used while laying out an archive.
///
/// Every insert gets its own slot; equal strings are not shared.
#[derive(Debug, Default, Clone)]
pub struct NameTableBuilder {
    buf: Vec<u8>,
}

impl NameTableBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name` plus a NUL and return the offset of its first byte.
    pub fn insert(&mut self, name: &str) -> u64 {
        let offset = self.buf.len() as u64;
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.push(0);
        offset
    }

    /// Current table length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Freeze the table.
    #[must_use]
    pub fn finish(self) -> NameTable {
        NameTable { buf: self.buf }
    }
}

/// Immutable name table, either freshly built or read from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTable {
    buf: Vec<u8>,
}

impl NameTable {
    /// Wrap raw name table bytes.
    #[must_use]
    pub fn from_bytes(buf: Vec<u8>) -> Self {
        Self { buf }
    }

    /// Raw table bytes, as written to the archive.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes from `offset` up to (not including) the next NUL.
    ///
    /// # Errors
    /// Returns [`FormatError::BadNameOffset`] if `offset` is past the end of
    /// the table or the string has no terminator.
    pub fn get(&self, offset: u64) -> Result<&[u8]> {
        let bad = || FormatError::BadNameOffset {
            offset,
            size: self.buf.len() as u64,
        };
        let start = usize::try_from(offset).map_err(|_| bad())?;
        let tail = self.buf.get(start..).ok_or_else(bad)?;
        let end = tail.iter().position(|&b| b == 0).ok_or_else(bad)?;
        Ok(&tail[..end])
    }

    /// Like [`get`](Self::get), decoded lossily as UTF-8.
    ///
    /// # Errors
    /// Returns [`FormatError::BadNameOffset`] for an invalid offset.
    pub fn get_str(&self, offset: u64) -> Result<String> {
        Ok(String::from_utf8_lossy(self.get(offset)?).into_owned())
    }
}
