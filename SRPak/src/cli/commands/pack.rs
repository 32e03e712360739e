//! CLI command for building packfiles

use std::path::Path;
use std::time::Instant;

use anyhow::Context;

use crate::cli::progress::{
    DISK, PACKAGE, print_done, print_size, print_step, simple_spinner, update_pack_bar,
};
use crate::compression::Lz4Cli;
use crate::pak_tools::{PackOptions, PackfileOperations};

/// Build `output` from the tree at `source`.
///
/// # Errors
/// Returns an error if the tree cannot be scanned, compressed or written.
pub fn execute(
    source: &Path,
    output: &Path,
    no_compression: bool,
    compressor: Option<&Path>,
    progress: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();

    let mut options = PackOptions::new().with_no_compression(no_compression);
    if let Some(program) = compressor {
        options = options.with_compressor(Lz4Cli::new().with_program(program));
    }

    let summary = if progress {
        print_step(1, 2, PACKAGE, &format!("Packing {}...", source.display()));
        let pb = simple_spinner("Populating paths");
        let result =
            PackfileOperations::pack_with_progress(source, output, &options, &|p| {
                update_pack_bar(&pb, p);
            });
        pb.finish_and_clear();
        result
    } else {
        PackfileOperations::pack(source, output, &options)
    }
    .context("Packing failed")?;

    if progress {
        print_step(
            2,
            2,
            DISK,
            &format!(
                "Wrote {} files ({} compressed) in {} directories",
                summary.files, summary.compressed, summary.directories
            ),
        );
    }
    print_size(&output.display().to_string(), summary.pack_size);
    print_done(started.elapsed());
    Ok(())
}
