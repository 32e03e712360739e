//! Packfile reader built on positioned reads
//!
//! The reader never moves a shared cursor, so one open handle can serve any
//! number of extraction tasks concurrently.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use super::{
    ENTRY_SIZE, EntryRecord, HEADER_SIZE, Header, NameTable, PackfileEntry, PackfileIndex,
    read_directory_offsets, read_entry_table, truncated,
};
use crate::error::{Error, FormatError, Result};

/// Random-access, read-only byte source.
pub trait ReadAt: Send + Sync {
    /// Fill `buf` from `offset`, failing with `UnexpectedEof` if the source
    /// ends first.
    ///
    /// # Errors
    /// Returns an error if the read fails or hits the end of the source.
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()>;

    /// Total length of the source in bytes.
    ///
    /// # Errors
    /// Returns an error if the length cannot be determined.
    fn size(&self) -> io::Result<u64>;
}

impl ReadAt for File {
    #[cfg(unix)]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        std::os::unix::fs::FileExt::read_exact_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_exact_at(&self, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
        use std::os::windows::fs::FileExt;

        while !buf.is_empty() {
            match self.seek_read(buf, offset) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "failed to fill whole buffer",
                    ));
                }
                Ok(n) => {
                    buf = &mut std::mem::take(&mut buf)[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

impl ReadAt for Vec<u8> {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let src = usize::try_from(offset)
            .ok()
            .and_then(|start| self.get(start..)?.get(..buf.len()))
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }
}

/// Packfile reader
pub struct PackfileReader<R: ReadAt> {
    source: R,
    /// Archive path, for log and error messages
    path: Option<PathBuf>,
    archive_len: u64,
}

impl PackfileReader<File> {
    /// Open an archive on disk.
    ///
    /// # Errors
    /// Returns [`Error::IoAt`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(Error::io_at(path))?;
        let mut reader = Self::new(file)?;
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }
}

impl<R: ReadAt> PackfileReader<R> {
    /// Wrap any positioned byte source.
    ///
    /// # Errors
    /// Returns an error if the source length cannot be determined.
    pub fn new(source: R) -> Result<Self> {
        let archive_len = source.size()?;
        Ok(Self {
            source,
            path: None,
            archive_len,
        })
    }

    /// Total archive length in bytes.
    #[must_use]
    pub fn archive_len(&self) -> u64 {
        self.archive_len
    }

    /// The archive path, if opened from disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read `len` bytes at `offset`, reporting a short source as truncation of `what`.
    fn read_region(&self, offset: u64, len: u64, what: &'static str) -> Result<Vec<u8>> {
        let end = offset
            .checked_add(len)
            .ok_or(FormatError::Truncated { what })?;
        if end > self.archive_len {
            return Err(FormatError::Truncated { what }.into());
        }
        let len = usize::try_from(len).map_err(|_| FormatError::Truncated { what })?;
        let mut buf = vec![0u8; len];
        self.source
            .read_exact_at(&mut buf, offset)
            .map_err(truncated(what))?;
        Ok(buf)
    }

    /// Read and validate the header.
    ///
    /// # Errors
    /// Returns a [`FormatError`] if the header is truncated, has the wrong
    /// magic or an unsupported version.
    pub fn read_header(&self) -> Result<Header> {
        let buf = self.read_region(0, HEADER_SIZE, "header")?;
        Header::read(&mut buf.as_slice())
    }

    /// Read every entry record.
    ///
    /// # Errors
    /// Returns [`FormatError::Truncated`] if the table runs past the archive end.
    pub fn read_entry_table(&self, header: &Header) -> Result<Vec<EntryRecord>> {
        let len = u64::from(header.file_count) * ENTRY_SIZE;
        let buf = self.read_region(HEADER_SIZE, len, "entry table")?;
        read_entry_table(&mut buf.as_slice(), header.file_count)
    }

    /// Read the directory-name-offset array that follows the entry table.
    ///
    /// # Errors
    /// Returns [`FormatError::Truncated`] if the array runs past the archive end.
    pub fn read_directory_offsets(&self, header: &Header) -> Result<Vec<u64>> {
        let start = HEADER_SIZE + u64::from(header.file_count) * ENTRY_SIZE;
        let len = u64::from(header.dir_count) * 8;
        let buf = self.read_region(start, len, "directory table")?;
        read_directory_offsets(&mut buf.as_slice(), header.dir_count)
    }

    /// Read the name table.
    ///
    /// # Errors
    /// Returns [`FormatError::Truncated`] if the table runs past the archive end.
    pub fn read_name_table(&self, header: &Header) -> Result<NameTable> {
        let buf = self.read_region(
            header.names_start(),
            u64::from(header.names_size),
            "name table",
        )?;
        Ok(NameTable::from_bytes(buf))
    }

    /// Decode header, entries and names, and check every body lies inside
    /// the archive. No body bytes are read.
    ///
    /// # Errors
    /// Returns a [`FormatError`] for any structural problem.
    pub fn index(&self) -> Result<PackfileIndex> {
        tracing::info!("Parsing header...");
        let header = self.read_header()?;

        tracing::info!("Parsing entries...");
        let records = self.read_entry_table(&header)?;
        let dir_offsets = self.read_directory_offsets(&header)?;

        tracing::info!("Parsing name and directory string table...");
        let names = self.read_name_table(&header)?;

        let directories = dir_offsets
            .iter()
            .map(|&offset| names.get_str(offset))
            .collect::<Result<Vec<_>>>()?;

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let entry = PackfileEntry::new(
                names.get(record.dir_name_offset)?,
                names.get(record.name_offset)?,
                record,
            );
            let (start, end) = self.data_range(&header, &entry)?;
            tracing::debug!(
                path = %entry.display_path(),
                start = %format!("{start:#X}"),
                end = %format!("{end:#X}"),
                stored = record.effective_size(),
                uncompressed = record.uncompressed_size,
                compressed = record.is_compressed(),
                "entry"
            );
            entries.push(entry);
        }

        Ok(PackfileIndex {
            header,
            directories,
            entries,
        })
    }

    /// Absolute `[start, end)` of an entry's body, checked against the archive length.
    fn data_range(&self, header: &Header, entry: &PackfileEntry) -> Result<(u64, u64)> {
        let out_of_bounds = |start: u64, end: u64| FormatError::DataOutOfBounds {
            name: entry.display_path(),
            start,
            end,
            len: self.archive_len,
        };
        let start = header
            .data_base
            .checked_add(entry.record.data_offset)
            .ok_or_else(|| out_of_bounds(header.data_base, u64::MAX))?;
        let end = start
            .checked_add(entry.record.effective_size())
            .ok_or_else(|| out_of_bounds(start, u64::MAX))?;
        if end > self.archive_len {
            return Err(out_of_bounds(start, end).into());
        }
        Ok((start, end))
    }

    /// Read an entry's stored body (still compressed if the entry is).
    ///
    /// # Errors
    /// Returns [`FormatError::DataOutOfBounds`] if the body lies outside the
    /// archive, or an IO error if the read fails.
    pub fn read_entry_data(&self, header: &Header, entry: &PackfileEntry) -> Result<Vec<u8>> {
        let (start, end) = self.data_range(header, entry)?;
        self.read_region(start, end - start, "entry data")
    }
}
