//! Command execution

use super::Commands;
use super::{list, pack, unpack};

impl Commands {
    /// Whether the command asked for quiet output.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        match self {
            Commands::Unpack { quiet, .. } | Commands::Pack { quiet, .. } => *quiet,
            Commands::List { json, .. } => *json,
        }
    }

    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Unpack {
                input,
                output,
                threads,
                compressor,
                quiet,
            } => unpack::execute(input, output, *threads, compressor.as_deref(), !*quiet),
            Commands::Pack {
                input,
                output,
                no_compression,
                compressor,
                quiet,
            } => pack::execute(
                input,
                output,
                *no_compression,
                compressor.as_deref(),
                !*quiet,
            ),
            Commands::List { input, json } => list::execute(input, *json),
        }
    }
}
