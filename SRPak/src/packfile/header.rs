//! Fixed 0x78-byte packfile header

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{DEFAULT_FLAGS, HEADER_SIZE, MAGIC, VERSION, truncated};
use crate::error::{FormatError, Result};

/// Size of the trailing reserved block
const RESERVED_SIZE: usize = 48;

const HEADER_LEN: usize = HEADER_SIZE as usize;

// Field offsets patched after the header is first written
const NAMES_OFFSET_POS: u64 = 24;
const NAMES_SIZE_POS: u64 = 28;
const PACK_SIZE_POS: u64 = 32;
const DATA_BASE_POS: u64 = 64;

/// Decoded packfile header.
///
/// `checksum`, `flags`, `timestamp` and `reserved` are carried verbatim and
/// never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Container version (always [`VERSION`] once validated)
    pub version: u32,
    /// Opaque checksum field
    pub checksum: u32,
    /// Opaque header flags
    pub flags: u32,
    /// Number of entry records (one per file)
    pub file_count: u32,
    /// Number of directories
    pub dir_count: u32,
    /// Name table offset, relative to the end of the header
    pub names_offset: u32,
    /// Name table length in bytes
    pub names_size: u32,
    /// Total archive length
    pub pack_size: u64,
    /// Sum of stored body sizes
    pub data_size: u64,
    /// Sum of stored body sizes, as written by the packer
    pub compressed_data_size: u64,
    /// Opaque timestamp
    pub timestamp: u64,
    /// Absolute offset of the data section
    pub data_base: u64,
    /// Opaque trailing bytes
    pub reserved: [u8; RESERVED_SIZE],
}

/// Absolute positions of header fields that are only known after the
/// rest of the archive has been laid down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchPositions {
    pub names_offset: u64,
    pub names_size: u64,
    pub pack_size: u64,
    pub data_base: u64,
}

impl Header {
    /// Header for a new archive. Positional fields start as zero
    /// placeholders and are filled in through [`PatchPositions`].
    #[must_use]
    pub fn for_write(file_count: u32, dir_count: u32, data_size: u64) -> Self {
        Self {
            version: VERSION,
            checksum: 0,
            flags: DEFAULT_FLAGS,
            file_count,
            dir_count,
            names_offset: 0,
            names_size: 0,
            pack_size: 0,
            data_size,
            compressed_data_size: data_size,
            timestamp: 0,
            data_base: 0,
            reserved: [0; RESERVED_SIZE],
        }
    }

    /// Read and validate a header from the current position.
    ///
    /// # Errors
    /// Returns [`FormatError::Truncated`] if fewer than 0x78 bytes are available,
    /// [`FormatError::BadMagic`] or [`FormatError::UnsupportedVersion`] if the
    /// header is not a version 17 packfile header.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; HEADER_LEN];
        reader.read_exact(&mut buf).map_err(truncated("header"))?;

        let mut cursor = &buf[..];
        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic { found: magic }.into());
        }

        let version = cursor.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                expected: VERSION,
            }
            .into());
        }

        let checksum = cursor.read_u32::<LittleEndian>()?;
        let flags = cursor.read_u32::<LittleEndian>()?;
        let file_count = cursor.read_u32::<LittleEndian>()?;
        let dir_count = cursor.read_u32::<LittleEndian>()?;
        let names_offset = cursor.read_u32::<LittleEndian>()?;
        let names_size = cursor.read_u32::<LittleEndian>()?;
        let pack_size = cursor.read_u64::<LittleEndian>()?;
        let data_size = cursor.read_u64::<LittleEndian>()?;
        let compressed_data_size = cursor.read_u64::<LittleEndian>()?;
        let timestamp = cursor.read_u64::<LittleEndian>()?;
        let data_base = cursor.read_u64::<LittleEndian>()?;
        let mut reserved = [0u8; RESERVED_SIZE];
        cursor.read_exact(&mut reserved)?;

        Ok(Self {
            version,
            checksum,
            flags,
            file_count,
            dir_count,
            names_offset,
            names_size,
            pack_size,
            data_size,
            compressed_data_size,
            timestamp,
            data_base,
            reserved,
        })
    }

    /// Absolute position of the name table.
    #[must_use]
    pub fn names_start(&self) -> u64 {
        HEADER_SIZE + u64::from(self.names_offset)
    }

    /// Write every field at the current position.
    ///
    /// Returns where the late-bound fields landed so the caller can patch them.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<PatchPositions> {
        let start = writer.stream_position()?;

        writer.write_all(&MAGIC)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.checksum)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.file_count)?;
        writer.write_u32::<LittleEndian>(self.dir_count)?;
        writer.write_u32::<LittleEndian>(self.names_offset)?;
        writer.write_u32::<LittleEndian>(self.names_size)?;
        writer.write_u64::<LittleEndian>(self.pack_size)?;
        writer.write_u64::<LittleEndian>(self.data_size)?;
        writer.write_u64::<LittleEndian>(self.compressed_data_size)?;
        writer.write_u64::<LittleEndian>(self.timestamp)?;
        writer.write_u64::<LittleEndian>(self.data_base)?;
        writer.write_all(&self.reserved)?;

        Ok(PatchPositions {
            names_offset: start + NAMES_OFFSET_POS,
            names_size: start + NAMES_SIZE_POS,
            pack_size: start + PACK_SIZE_POS,
            data_base: start + DATA_BASE_POS,
        })
    }
}

impl PatchPositions {
    /// Patch the name table offset (relative to the header end) and size.
    ///
    /// # Errors
    /// Returns an error if seeking or writing fails.
    pub fn patch_names<W: Write + Seek>(
        &self,
        writer: &mut W,
        names_offset: u32,
        names_size: u32,
    ) -> Result<()> {
        patch_at(writer, self.names_offset, &names_offset.to_le_bytes())?;
        patch_at(writer, self.names_size, &names_size.to_le_bytes())
    }

    /// Patch the absolute data section offset.
    ///
    /// # Errors
    /// Returns an error if seeking or writing fails.
    pub fn patch_data_base<W: Write + Seek>(&self, writer: &mut W, data_base: u64) -> Result<()> {
        patch_at(writer, self.data_base, &data_base.to_le_bytes())
    }

    /// Patch the total archive length.
    ///
    /// # Errors
    /// Returns an error if seeking or writing fails.
    pub fn patch_pack_size<W: Write + Seek>(&self, writer: &mut W, pack_size: u64) -> Result<()> {
        patch_at(writer, self.pack_size, &pack_size.to_le_bytes())
    }
}

/// Overwrite `bytes` at `pos`, then return to where the stream was.
fn patch_at<W: Write + Seek>(writer: &mut W, pos: u64, bytes: &[u8]) -> Result<()> {
    let resume = writer.stream_position()?;
    writer.seek(SeekFrom::Start(pos))?;
    writer.write_all(bytes)?;
    writer.seek(SeekFrom::Start(resume))?;
    Ok(())
}
