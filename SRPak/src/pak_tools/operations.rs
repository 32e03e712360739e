//! Core packfile operations

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::classify::scan_tree;
use super::helpers::{normalize_inputs, resolve_output_path, validate_archive_path};
use super::options::{PackOptions, UnpackOptions};
use crate::compression::Compressor;
use crate::error::{Error, FormatError, Result, ValidationError};
use crate::packfile::{
    EntryInfo, Header, PackPhase, PackProgress, PackfileEntry, PackfileIndex, PackfileReader,
    PackfileWriter, ProgressCallback,
};
use crate::scheduler::Scheduler;

/// Summary of a successful unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpackSummary {
    /// Archives extracted (after duplicate inputs were dropped)
    pub archives: usize,
    /// Entries written across all archives
    pub files: usize,
}

/// Summary of a successful pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackSummary {
    pub files: usize,
    pub directories: usize,
    /// Entries stored compressed
    pub compressed: usize,
    /// Final archive length
    pub pack_size: u64,
}

/// An archive that has been fully indexed and whose output paths are known.
struct PreparedArchive {
    path: PathBuf,
    reader: PackfileReader<File>,
    header: Header,
    jobs: Vec<ExtractJob>,
}

/// One entry and where it goes.
struct ExtractJob {
    entry: PackfileEntry,
    destination: PathBuf,
}

/// High-level packfile operations.
pub struct PackfileOperations;

impl PackfileOperations {
    /// Decode an archive's header, entry table and names.
    ///
    /// # Errors
    /// Returns [`Error::IoAt`] if the archive cannot be opened, or
    /// [`Error::Format`] if it is malformed.
    pub fn index<P: AsRef<Path>>(archive: P) -> Result<PackfileIndex> {
        PackfileReader::open(archive)?.index()
    }

    /// List an archive's entries in table order.
    ///
    /// # Errors
    /// Returns [`Error::IoAt`] if the archive cannot be opened, or
    /// [`Error::Format`] if it is malformed.
    pub fn list<P: AsRef<Path>>(archive: P) -> Result<Vec<EntryInfo>> {
        let index = Self::index(archive)?;
        Ok(index.entries.iter().map(EntryInfo::from).collect())
    }

    /// Extract archives into `output_dir`.
    ///
    /// # Errors
    /// See [`unpack_with_progress`](Self::unpack_with_progress).
    pub fn unpack<P: AsRef<Path>>(
        inputs: &[PathBuf],
        output_dir: P,
        options: &UnpackOptions,
    ) -> Result<UnpackSummary> {
        Self::unpack_with_progress(inputs, output_dir, options, &|_| {})
    }

    /// Extract archives into `output_dir` with progress callback
    ///
    /// Entries land under `output_dir/sr5/<directory>/<name>`; directories
    /// stored with a `..\ctg\` prefix land under `output_dir/ctg/`. Every
    /// archive is validated and indexed before anything is written, then
    /// archives are extracted one after another with up to
    /// `options.threads` entries in flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a bad thread count, an input without a
    /// `.vpp_pc`/`.str2_pc` extension, or a missing input.
    /// Returns [`Error::Format`] if any archive is malformed, has an entry
    /// that would be written outside `output_dir`, or has two entries that
    /// resolve to the same file.
    /// Returns [`Error::ExtractionAborted`] if an entry fails to extract.
    ///
    /// [`Error::Validation`]: crate::Error::Validation
    /// [`Error::Format`]: crate::Error::Format
    /// [`Error::ExtractionAborted`]: crate::Error::ExtractionAborted
    pub fn unpack_with_progress<P: AsRef<Path>>(
        inputs: &[PathBuf],
        output_dir: P,
        options: &UnpackOptions,
        progress: ProgressCallback,
    ) -> Result<UnpackSummary> {
        let output_dir = output_dir.as_ref();

        options.validate()?;
        let inputs = normalize_inputs(inputs)?;
        for input in &inputs {
            validate_archive_path(input)?;
        }
        for input in &inputs {
            if !input.is_file() {
                return Err(ValidationError::MissingInput {
                    path: input.clone(),
                }
                .into());
            }
        }

        let archives = inputs
            .iter()
            .map(|input| Self::prepare(input, output_dir, options, progress))
            .collect::<Result<Vec<_>>>()?;

        let root = output_dir.join(options.layout.primary_group);
        std::fs::create_dir_all(&root).map_err(Error::io_at(&root))?;
        let scheduler = Scheduler::new(options.threads)?;

        let mut files = 0;
        for archive in &archives {
            tracing::info!(
                "Extracting {} ({} files)",
                archive.path.display(),
                archive.jobs.len()
            );
            files += Self::extract_archive(
                &scheduler,
                archive,
                options.compressor.as_ref(),
                progress,
            )?;
        }

        progress(&PackProgress::new(PackPhase::Complete, files, files));
        Ok(UnpackSummary {
            archives: archives.len(),
            files,
        })
    }

    /// Index one archive and compute every destination path.
    fn prepare(
        input: &Path,
        output_dir: &Path,
        options: &UnpackOptions,
        progress: ProgressCallback,
    ) -> Result<PreparedArchive> {
        progress(&PackProgress::with_file(
            PackPhase::ReadingHeader,
            1,
            1,
            input.display().to_string(),
        ));
        let reader = PackfileReader::open(input)?;
        let index = reader.index()?;
        progress(&PackProgress::new(
            PackPhase::ReadingTable,
            index.entries.len(),
            index.entries.len(),
        ));

        let jobs = index
            .entries
            .into_iter()
            .map(|entry| {
                let destination = resolve_output_path(
                    output_dir,
                    &options.layout,
                    &entry.directory_bytes,
                    &entry.name_bytes,
                )?;
                Ok(ExtractJob { entry, destination })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::with_capacity(jobs.len());
        if let Some(job) = jobs.iter().find(|job| !seen.insert(job.destination.as_path())) {
            return Err(FormatError::DuplicatePath {
                path: job.entry.display_path(),
            }
            .into());
        }

        Ok(PreparedArchive {
            path: input.to_path_buf(),
            reader,
            header: index.header,
            jobs,
        })
    }

    fn extract_archive(
        scheduler: &Scheduler,
        archive: &PreparedArchive,
        compressor: &dyn Compressor,
        progress: ProgressCallback,
    ) -> Result<usize> {
        let total = archive.jobs.len();
        let processed = AtomicUsize::new(0);

        let summary = scheduler.run(&archive.jobs, |job| {
            let data = archive.reader.read_entry_data(&archive.header, &job.entry)?;
            if let Some(parent) = job.destination.parent() {
                std::fs::create_dir_all(parent).map_err(Error::io_at(parent))?;
            }
            std::fs::write(&job.destination, &data).map_err(Error::io_at(&job.destination))?;
            if job.entry.is_compressed() {
                compressor.decompress(&job.destination)?;
            }

            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(&PackProgress::with_file(
                PackPhase::ExtractingFiles,
                current,
                total,
                job.entry.display_path(),
            ));
            Ok(())
        })?;

        Ok(summary.completed)
    }

    /// Build an archive from a source tree.
    ///
    /// # Errors
    /// See [`pack_with_progress`](Self::pack_with_progress).
    pub fn pack<P: AsRef<Path>, Q: AsRef<Path>>(
        source_dir: P,
        output: Q,
        options: &PackOptions,
    ) -> Result<PackSummary> {
        Self::pack_with_progress(source_dir, output, options, &|_| {})
    }

    /// Build an archive from a source tree with progress callback
    ///
    /// Only files below a `data` directory are packed. Files are compressed
    /// into a private temporary directory while the tree is scanned; the
    /// archive itself is written to a temporary file beside `output` and
    /// moved into place when complete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `output` is not a `.vpp_pc`/`.str2_pc`
    /// path or `source_dir` does not exist.
    /// Returns [`Error::WalkDir`] if directory traversal fails.
    /// Returns [`Error::Compression`] or [`Error::CompressorUnavailable`] if
    /// the compressor fails.
    /// Returns [`Error::Io`] or [`Error::IoAt`] if a file cannot be read or written.
    ///
    /// [`Error::Validation`]: crate::Error::Validation
    /// [`Error::WalkDir`]: crate::Error::WalkDir
    /// [`Error::Compression`]: crate::Error::Compression
    /// [`Error::CompressorUnavailable`]: crate::Error::CompressorUnavailable
    /// [`Error::Io`]: crate::Error::Io
    /// [`Error::IoAt`]: crate::Error::IoAt
    pub fn pack_with_progress<P: AsRef<Path>, Q: AsRef<Path>>(
        source_dir: P,
        output: Q,
        options: &PackOptions,
        progress: ProgressCallback,
    ) -> Result<PackSummary> {
        let source_dir = source_dir.as_ref();
        let output = output.as_ref();

        validate_archive_path(output)?;
        if !source_dir.is_dir() {
            return Err(ValidationError::MissingInput {
                path: source_dir.to_path_buf(),
            }
            .into());
        }

        let policy = options.policy_for(output);
        tracing::info!("Populating paths...");
        tracing::debug!("Compression policy: {policy:?}");

        let work_dir = tempfile::Builder::new()
            .prefix("srpak-")
            .tempdir()
            .map_err(Error::io_at(std::env::temp_dir()))?;
        let plan = scan_tree(
            source_dir,
            &options.layout,
            policy,
            options.compressor.as_ref(),
            work_dir.path(),
            progress,
        )?;
        if plan.is_empty() {
            tracing::warn!(
                "No files found under a `{}` directory in {}",
                options.layout.anchor,
                source_dir.display()
            );
        }

        let pack = plan.layout()?;
        let files = pack.files().count();
        let compressed = pack.files().filter(|f| f.record.is_compressed()).count();
        let directories = pack.directories.len();

        let pack_size = PackfileWriter::new(pack).write(output, progress)?;
        tracing::info!(
            "Packed {files} files in {directories} directories into {} ({pack_size} bytes)",
            output.display()
        );

        Ok(PackSummary {
            files,
            directories,
            compressed,
            pack_size,
        })
    }
}
