//! CLI command for listing packfile contents

use std::path::Path;

use anyhow::Context;
use indicatif::HumanBytes;

use crate::pak_tools::PackfileOperations;

/// Print the entry table of `source`.
///
/// # Errors
/// Returns an error if the archive cannot be read.
pub fn execute(source: &Path, json: bool) -> anyhow::Result<()> {
    let entries = PackfileOperations::list(source)
        .with_context(|| format!("Failed to read {}", source.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        let marker = if entry.compressed { "lz4" } else { "raw" };
        println!(
            "{:>10}  {:>10}  {marker}  {}",
            HumanBytes(entry.uncompressed_size).to_string(),
            HumanBytes(entry.stored_size).to_string(),
            entry.path
        );
    }

    let total: u64 = entries.iter().map(|e| e.uncompressed_size).sum();
    println!("{} files, {}", entries.len(), HumanBytes(total));
    Ok(())
}
