//! Packfile writer
//!
//! Packing goes through two types: a [`PackPlan`] collects classified files
//! per directory, and [`PackPlan::layout`] turns it into a [`LaidOutPack`]
//! with every name and data offset fixed. Only a laid-out pack can be
//! serialized.

use std::fs::File;
use std::io::{self, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tempfile::NamedTempFile;

use super::{
    EntryRecord, HEADER_SIZE, Header, NameTable, NameTableBuilder, PackPhase, PackProgress,
    ProgressCallback, write_directory_offsets, write_entry_table,
};
use crate::compression::StagedFile;
use crate::error::{Error, Result};

/// A source file classified for packing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    /// File name stored in the name table
    pub name: String,
    /// Original file on disk
    pub source: PathBuf,
    /// Size of the original file
    pub size: u64,
    /// Compressed copy, if the file is stored compressed
    pub staged: Option<StagedFile>,
    /// Alignment class recorded in the entry
    pub alignment: u16,
}

impl PlannedFile {
    /// Path of the bytes that go into the data section.
    #[must_use]
    pub fn stored_path(&self) -> &Path {
        self.staged.as_ref().map_or(&self.source, |s| &s.path)
    }

    /// Number of bytes that go into the data section.
    #[must_use]
    pub fn stored_size(&self) -> u64 {
        self.staged.as_ref().map_or(self.size, |s| s.size)
    }
}

/// Files grouped by directory, in first-seen order, before layout.
#[derive(Debug, Default)]
pub struct PackPlan {
    directories: IndexMap<String, Vec<PlannedFile>>,
}

impl PackPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file to `directory`, creating the directory on first use.
    pub fn push(&mut self, directory: &str, file: PlannedFile) {
        if let Some(files) = self.directories.get_mut(directory) {
            files.push(file);
        } else {
            self.directories.insert(directory.to_string(), vec![file]);
        }
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.directories.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn dir_count(&self) -> usize {
        self.directories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    /// First-seen position of `directory`, if it has been added.
    #[must_use]
    pub fn directory_index(&self, directory: &str) -> Option<usize> {
        self.directories.get_index_of(directory)
    }

    /// Directories and their files, in first-seen order.
    pub fn directories(&self) -> impl Iterator<Item = (&str, &[PlannedFile])> {
        self.directories
            .iter()
            .map(|(name, files)| (name.as_str(), files.as_slice()))
    }

    /// Assign name offsets and data offsets.
    ///
    /// Names go in directory order, each directory name followed by its
    /// files' names. Data offsets are the running sum of stored sizes.
    ///
    /// # Errors
    /// Returns [`Error::LayoutOverflow`] if a count or size does not fit its field.
    pub fn layout(self) -> Result<LaidOutPack> {
        tracing::info!("Building name and directory string table...");
        let file_count = to_u32("file count", self.file_count() as u64)?;
        let dir_count = to_u32("directory count", self.dir_count() as u64)?;

        let mut names = NameTableBuilder::new();
        let mut data_size = 0u64;
        let mut directories = Vec::with_capacity(self.directories.len());

        for (name, planned) in self.directories {
            let name_offset = names.insert(&name);
            let mut files = Vec::with_capacity(planned.len());
            for file in planned {
                let record = EntryRecord::new(
                    names.insert(&file.name),
                    name_offset,
                    data_size,
                    file.size,
                    file.staged.as_ref().map(|s| s.size),
                    file.alignment,
                );
                data_size = data_size
                    .checked_add(file.stored_size())
                    .ok_or(Error::LayoutOverflow {
                        field: "data size",
                        value: u64::MAX,
                    })?;
                files.push(LaidOutFile { file, record });
            }
            directories.push(LaidOutDirectory {
                name,
                name_offset,
                files,
            });
        }

        let names = names.finish();
        to_u32("name table size", names.len() as u64)?;

        Ok(LaidOutPack {
            directories,
            names,
            data_size,
            file_count,
            dir_count,
        })
    }
}

/// A file with its entry record fixed.
#[derive(Debug, Clone)]
pub struct LaidOutFile {
    pub file: PlannedFile,
    pub record: EntryRecord,
}

/// A directory with its name offset fixed.
#[derive(Debug, Clone)]
pub struct LaidOutDirectory {
    pub name: String,
    pub name_offset: u64,
    pub files: Vec<LaidOutFile>,
}

/// A fully laid-out archive, ready to serialize.
#[derive(Debug, Clone)]
pub struct LaidOutPack {
    pub directories: Vec<LaidOutDirectory>,
    pub names: NameTable,
    /// Sum of stored sizes
    pub data_size: u64,
    pub file_count: u32,
    pub dir_count: u32,
}

impl LaidOutPack {
    /// Files in table order.
    pub fn files(&self) -> impl Iterator<Item = &LaidOutFile> {
        self.directories.iter().flat_map(|d| d.files.iter())
    }
}

/// Serializes a [`LaidOutPack`].
pub struct PackfileWriter {
    pack: LaidOutPack,
}

impl PackfileWriter {
    #[must_use]
    pub fn new(pack: LaidOutPack) -> Self {
        Self { pack }
    }

    #[must_use]
    pub fn pack(&self) -> &LaidOutPack {
        &self.pack
    }

    /// Write the archive to `output`.
    ///
    /// The archive is assembled in a temporary file beside `output` and only
    /// renamed into place once every header field has been patched. Returns
    /// the archive length.
    ///
    /// # Errors
    /// Returns an error if any file cannot be read or written, or if a
    /// source file changed size since it was scanned.
    pub fn write(&self, output: &Path, progress: ProgressCallback) -> Result<u64> {
        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(Error::io_at(parent))?;

        let mut temp = NamedTempFile::new_in(parent).map_err(Error::io_at(parent))?;
        let pack_size = {
            let mut writer = BufWriter::new(temp.as_file_mut());
            let pack_size = self.write_to(&mut writer, progress)?;
            writer.flush()?;
            pack_size
        };
        temp.as_file().sync_all()?;
        temp.persist(output)
            .map_err(|e| Error::io_at(output)(e.error))?;

        Ok(pack_size)
    }

    /// Serialize into any seekable writer positioned at the archive start.
    ///
    /// Staged compressed files are deleted as they are consumed.
    ///
    /// # Errors
    /// Returns an error if reading a body or writing fails.
    pub fn write_to<W: Write + Seek>(&self, writer: &mut W, progress: ProgressCallback) -> Result<u64> {
        let pack = &self.pack;
        let total = pack.files().count();

        progress(&PackProgress::new(PackPhase::WritingTable, 0, total));
        tracing::info!("Writing header...");
        let positions =
            Header::for_write(pack.file_count, pack.dir_count, pack.data_size).write(writer)?;

        tracing::info!("Writing file entries...");
        write_entry_table(writer, pack.files().map(|f| &f.record))?;

        tracing::info!("Writing directory name offsets...");
        let dir_offsets: Vec<u64> = pack.directories.iter().map(|d| d.name_offset).collect();
        write_directory_offsets(writer, &dir_offsets)?;

        let names_pos = writer.stream_position()?;
        positions.patch_names(
            writer,
            to_u32("name table offset", names_pos - HEADER_SIZE)?,
            to_u32("name table size", pack.names.len() as u64)?,
        )?;
        writer.write_all(pack.names.as_bytes())?;

        let data_base = writer.stream_position()?;
        positions.patch_data_base(writer, data_base)?;

        tracing::info!("Writing files...");
        for (i, laid) in pack.files().enumerate() {
            progress(&PackProgress::with_file(
                PackPhase::WritingFiles,
                i + 1,
                total,
                laid.file.name.as_str(),
            ));
            copy_body(writer, &laid.file)?;
        }

        let pack_size = writer.stream_position()?;
        positions.patch_pack_size(writer, pack_size)?;
        progress(&PackProgress::new(PackPhase::Complete, total, total));

        Ok(pack_size)
    }
}

/// Stream one stored body and drop its staged copy.
fn copy_body<W: Write>(writer: &mut W, file: &PlannedFile) -> Result<()> {
    let path = file.stored_path();
    let copied = {
        let mut body = File::open(path).map_err(Error::io_at(path))?;
        io::copy(&mut body, writer).map_err(Error::io_at(path))?
    };
    if copied != file.stored_size() {
        return Err(Error::SourceChanged {
            path: path.to_path_buf(),
            expected: file.stored_size(),
            actual: copied,
        });
    }

    if file.staged.is_some()
        && let Err(e) = std::fs::remove_file(path)
    {
        tracing::warn!("Failed to delete compressed file {}: {e}", path.display());
    }
    Ok(())
}

fn to_u32(field: &'static str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::LayoutOverflow { field, value })
}
