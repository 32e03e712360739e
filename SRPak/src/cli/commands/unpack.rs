//! CLI command for extracting packfiles

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;

use crate::cli::progress::{LOOKING_GLASS, PACKAGE, print_done, print_step, simple_bar};
use crate::compression::Lz4Cli;
use crate::packfile::PackPhase;
use crate::pak_tools::{PackfileOperations, UnpackOptions};

/// Extract `inputs` under `output`.
///
/// # Errors
/// Returns an error if validation, indexing or any entry fails.
pub fn execute(
    inputs: &[PathBuf],
    output: &Path,
    threads: usize,
    compressor: Option<&Path>,
    progress: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();

    let mut options = UnpackOptions::new().with_threads(threads);
    if let Some(program) = compressor {
        options = options.with_compressor(Lz4Cli::new().with_program(program));
    }

    let summary = if progress {
        print_step(1, 2, LOOKING_GLASS, &format!("Reading {} packfile(s)...", inputs.len()));
        let pb = simple_bar(0, "Extracting");
        let announce = std::sync::Once::new();

        let result = PackfileOperations::unpack_with_progress(inputs, output, &options, &|p| {
            match p.phase {
                PackPhase::ReadingTable => pb.inc_length(p.total as u64),
                PackPhase::ExtractingFiles => {
                    announce.call_once(|| {
                        pb.suspend(|| print_step(2, 2, PACKAGE, "Extracting files..."));
                    });
                    pb.inc(1);
                }
                _ => {}
            }
        });
        if announce.is_completed() {
            pb.finish_with_message("done");
        } else {
            pb.finish_and_clear();
        }
        result
    } else {
        PackfileOperations::unpack(inputs, output, &options)
    }
    .context("Unpacking failed")?;

    tracing::info!(
        "Extracted {} files from {} packfile(s) into {}",
        summary.files,
        summary.archives,
        output.display()
    );
    print_done(started.elapsed());
    Ok(())
}
