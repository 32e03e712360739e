//! 48-byte entry records and the directory-name-offset array

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{FLAG_COMPRESSED, UNCOMPRESSED_SENTINEL, truncated};
use crate::error::Result;

/// One entry table record.
///
/// `stored_size` is the raw on-disk field: the compressed length, or
/// [`UNCOMPRESSED_SENTINEL`] when the body is stored as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRecord {
    /// File name offset into the name table
    pub name_offset: u64,
    /// Directory name offset into the name table
    pub dir_name_offset: u64,
    /// Body offset relative to the data section
    pub data_offset: u64,
    /// Size after decompression
    pub uncompressed_size: u64,
    /// Compressed size or the uncompressed sentinel
    pub stored_size: u64,
    /// Entry flags; bit 0 marks a compressed body
    pub flags: u16,
    /// Alignment class (informational, never used for padding)
    pub alignment: u16,
    /// Opaque trailing bytes
    pub reserved: [u8; 4],
}

impl EntryRecord {
    /// Build a record for writing. `compressed_size` is `None` for bodies
    /// stored as-is.
    #[must_use]
    pub fn new(
        name_offset: u64,
        dir_name_offset: u64,
        data_offset: u64,
        uncompressed_size: u64,
        compressed_size: Option<u64>,
        alignment: u16,
    ) -> Self {
        let (stored_size, flags) = match compressed_size {
            Some(size) => (size, FLAG_COMPRESSED),
            None => (UNCOMPRESSED_SENTINEL, 0),
        };
        Self {
            name_offset,
            dir_name_offset,
            data_offset,
            uncompressed_size,
            stored_size,
            flags,
            alignment,
            reserved: [0; 4],
        }
    }

    /// Whether the body must be decompressed. Decided by the stored-size
    /// sentinel, not by the flags field.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.stored_size != UNCOMPRESSED_SENTINEL
    }

    /// Number of body bytes in the data section.
    #[must_use]
    pub fn effective_size(&self) -> u64 {
        if self.is_compressed() {
            self.stored_size
        } else {
            self.uncompressed_size
        }
    }

    /// Decode one record.
    ///
    /// # Errors
    /// Returns [`FormatError::Truncated`](crate::error::FormatError::Truncated)
    /// if the record is cut short.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let eof = truncated("entry table");
        let name_offset = reader.read_u64::<LittleEndian>().map_err(&eof)?;
        let dir_name_offset = reader.read_u64::<LittleEndian>().map_err(&eof)?;
        let data_offset = reader.read_u64::<LittleEndian>().map_err(&eof)?;
        let uncompressed_size = reader.read_u64::<LittleEndian>().map_err(&eof)?;
        let stored_size = reader.read_u64::<LittleEndian>().map_err(&eof)?;
        let flags = reader.read_u16::<LittleEndian>().map_err(&eof)?;
        let alignment = reader.read_u16::<LittleEndian>().map_err(&eof)?;
        let mut reserved = [0u8; 4];
        reader.read_exact(&mut reserved).map_err(&eof)?;

        Ok(Self {
            name_offset,
            dir_name_offset,
            data_offset,
            uncompressed_size,
            stored_size,
            flags,
            alignment,
            reserved,
        })
    }

    /// Encode one record.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<LittleEndian>(self.name_offset)?;
        writer.write_u64::<LittleEndian>(self.dir_name_offset)?;
        writer.write_u64::<LittleEndian>(self.data_offset)?;
        writer.write_u64::<LittleEndian>(self.uncompressed_size)?;
        writer.write_u64::<LittleEndian>(self.stored_size)?;
        writer.write_u16::<LittleEndian>(self.flags)?;
        writer.write_u16::<LittleEndian>(self.alignment)?;
        writer.write_all(&self.reserved)?;
        Ok(())
    }
}

/// Decode `count` consecutive records.
///
/// # Errors
/// Returns [`FormatError::Truncated`](crate::error::FormatError::Truncated)
/// if the table is cut short.
pub fn read_entry_table<R: Read>(reader: &mut R, count: u32) -> Result<Vec<EntryRecord>> {
    (0..count).map(|_| EntryRecord::read(reader)).collect()
}

/// Encode records in table order.
///
/// # Errors
/// Returns an error if writing fails.
pub fn write_entry_table<'a, W, I>(writer: &mut W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a EntryRecord>,
{
    for record in records {
        record.write(writer)?;
    }
    Ok(())
}

/// Decode the per-directory name offsets that follow the entry table.
///
/// # Errors
/// Returns [`FormatError::Truncated`](crate::error::FormatError::Truncated)
/// if the array is cut short.
pub fn read_directory_offsets<R: Read>(reader: &mut R, count: u32) -> Result<Vec<u64>> {
    let eof = truncated("directory table");
    (0..count)
        .map(|_| reader.read_u64::<LittleEndian>().map_err(&eof))
        .collect()
}

/// Encode the per-directory name offsets.
///
/// # Errors
/// Returns an error if writing fails.
pub fn write_directory_offsets<W: Write>(writer: &mut W, offsets: &[u64]) -> Result<()> {
    for &offset in offsets {
        writer.write_u64::<LittleEndian>(offset)?;
    }
    Ok(())
}
