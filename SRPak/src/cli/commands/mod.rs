use clap::Subcommand;
use std::path::PathBuf;

use crate::pak_tools::{DEFAULT_PACK_OUTPUT, DEFAULT_UNPACK_DIR};
use crate::scheduler::DEFAULT_THREADS;

mod execute;
pub mod list;
pub mod pack;
pub mod unpack;

#[derive(Subcommand)]
pub enum Commands {
    /// Extract one or more packfiles
    #[command(visible_alias = "extract")]
    Unpack {
        /// Source packfiles (.vpp_pc / .str2_pc)
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = DEFAULT_UNPACK_DIR)]
        output: PathBuf,

        /// Number of files extracted at once (1-50)
        #[arg(short, long, default_value_t = DEFAULT_THREADS)]
        threads: usize,

        /// lz4 executable to use instead of the one on PATH
        #[arg(long)]
        compressor: Option<PathBuf>,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Build a packfile from a directory tree
    Pack {
        /// Directory containing a `data` folder
        #[arg(short, long)]
        input: PathBuf,

        /// Output packfile (.vpp_pc / .str2_pc)
        #[arg(short, long, default_value = DEFAULT_PACK_OUTPUT)]
        output: PathBuf,

        /// Store every file uncompressed
        #[arg(short, long)]
        no_compression: bool,

        /// lz4 executable to use instead of the one on PATH
        #[arg(long)]
        compressor: Option<PathBuf>,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// List the contents of a packfile
    List {
        /// Source packfile
        #[arg(short, long)]
        input: PathBuf,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
}
