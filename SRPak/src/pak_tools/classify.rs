//! Source tree classification for packing
//!
//! Decides, per source file, which archive directory it belongs to, whether
//! it is stored compressed, and its alignment class.

use std::path::{Component, Path};

use walkdir::WalkDir;

use crate::compression::Compressor;
use crate::error::Result;
use crate::packfile::{DIR_SEPARATOR, PackPhase, PackPlan, PackProgress, PlannedFile, ProgressCallback};

/// Directory layout conventions of the game's asset tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Component that roots every archive directory
    pub anchor: &'static str,
    /// Top-level group unpacked directories land in
    pub primary_group: &'static str,
    /// Alternate top-level group
    pub remapped_group: &'static str,
    /// Directory prefix (from the anchor) that belongs to the alternate group
    pub remapped_subtree: &'static [&'static str],
}

impl Layout {
    pub const DEFAULT: Layout = Layout {
        anchor: "data",
        primary_group: "sr5",
        remapped_group: "ctg",
        remapped_subtree: &["data", "engine"],
    };

    /// Stored directory name for a source directory.
    ///
    /// `relative_dir` is relative to the pack root. Returns `None` when no
    /// component equals the anchor. Directories in the remapped subtree get
    /// a `..\<group>\` prefix so they unpack beside the primary group.
    #[must_use]
    pub fn archive_directory(&self, relative_dir: &Path) -> Option<String> {
        let components: Vec<String> = relative_dir
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        let start = components.iter().position(|c| c == self.anchor)?;
        let tail = &components[start..];
        let joined = tail.join(DIR_SEPARATOR.to_string().as_str());

        let remapped = tail.len() >= self.remapped_subtree.len()
            && tail
                .iter()
                .zip(self.remapped_subtree)
                .all(|(c, expected)| c == expected);

        if remapped {
            Some(format!(
                "..{DIR_SEPARATOR}{}{DIR_SEPARATOR}{joined}",
                self.remapped_group
            ))
        } else {
            Some(joined)
        }
    }
}

/// Extensions stored as-is under [`CompressionPolicy::Selective`]
pub const STORE_RAW_EXTENSIONS: &[&str] = &[
    ".bk2",
    ".bik",
    ".str2_pc",
    ".strh_pc",
    ".cvbm_pc",
    ".gvbm_pc",
    ".vpp_pc",
    ".vpkg",
    ".ttf",
    ".xml",
    ".ridv_pc",
    ".lua",
    ".wem_pad",
    ".hkcmp_64m",
    ".refl_xbox3_gdk",
    ".refl_pc",
    ".sr2_h",
    ".bin",
    ".txt",
    ".vint_proj",
];

/// Extensions with alignment class 16
pub const ALIGN_16_EXTENSIONS: &[&str] = &[".fxo_dx11_pc", ".fxo_dx12_pc", ".fxo_vk_pc"];

/// Extensions with alignment class 2048
pub const ALIGN_2048_EXTENSIONS: &[&str] = &[".bk2"];

/// Output extension that forces every entry to be compressed
pub const COMPRESS_ALL_EXTENSION: &str = ".str2_pc";

/// ASCII case-insensitive suffix match against an extension list.
#[must_use]
pub fn has_extension(file_name: &str, extensions: &[&str]) -> bool {
    let lower = file_name.to_ascii_lowercase();
    extensions.iter().any(|ext| lower.ends_with(ext))
}

/// Alignment class recorded in an entry.
#[must_use]
pub fn alignment_for(file_name: &str) -> u16 {
    if has_extension(file_name, ALIGN_16_EXTENSIONS) {
        16
    } else if has_extension(file_name, ALIGN_2048_EXTENSIONS) {
        2048
    } else {
        1
    }
}

/// Which entries get compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionPolicy {
    /// Store everything as-is
    Never,
    /// Compress everything
    Always,
    /// Compress unless the extension is in [`STORE_RAW_EXTENSIONS`]
    Selective,
}

impl CompressionPolicy {
    /// Policy for an output archive. The no-compression toggle wins over the
    /// `.str2_pc` compress-all rule.
    #[must_use]
    pub fn for_output(output: &Path, no_compression: bool) -> Self {
        if no_compression {
            CompressionPolicy::Never
        } else if has_extension(&output.to_string_lossy(), &[COMPRESS_ALL_EXTENSION]) {
            CompressionPolicy::Always
        } else {
            CompressionPolicy::Selective
        }
    }

    #[must_use]
    pub fn should_compress(&self, file_name: &str) -> bool {
        match self {
            CompressionPolicy::Never => false,
            CompressionPolicy::Always => true,
            CompressionPolicy::Selective => !has_extension(file_name, STORE_RAW_EXTENSIONS),
        }
    }
}

/// Walk `root` and build a [`PackPlan`], compressing marked files into
/// `work_dir` as they are found.
///
/// Files are visited sorted by name so directory and file order is
/// reproducible. Files outside any anchor directory are skipped. Each
/// directory bucket gets its own staging sub-directory so equal file names
/// in different directories never collide.
///
/// # Errors
/// Returns an error if the walk fails, a file cannot be inspected, or the
/// compressor fails.
pub fn scan_tree(
    root: &Path,
    layout: &Layout,
    policy: CompressionPolicy,
    compressor: &dyn Compressor,
    work_dir: &Path,
    progress: ProgressCallback,
) -> Result<PackPlan> {
    let mut plan = PackPlan::new();
    let mut scanned = 0usize;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative_dir = path
            .strip_prefix(root)
            .ok()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new(""));
        let Some(directory) = layout.archive_directory(relative_dir) else {
            tracing::debug!("Skipping {} (not under a `{}` directory)", path.display(), layout.anchor);
            continue;
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        let size = entry.metadata()?.len();
        scanned += 1;

        let staged = if policy.should_compress(&name) {
            progress(&PackProgress::with_file(
                PackPhase::CompressingFiles,
                scanned,
                0,
                name.as_str(),
            ));
            let bucket = plan.directory_index(&directory).unwrap_or(plan.dir_count());
            let staging = work_dir.join(bucket.to_string());
            Some(compressor.compress(path, &staging)?)
        } else {
            progress(&PackProgress::with_file(
                PackPhase::ScanningFiles,
                scanned,
                0,
                name.as_str(),
            ));
            None
        };

        let alignment = alignment_for(&name);
        plan.push(
            &directory,
            PlannedFile {
                name,
                source: path.to_path_buf(),
                size,
                staged,
                alignment,
            },
        );
    }

    Ok(plan)
}
