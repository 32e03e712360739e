//! CLI progress display utilities
//!
//! Step indicators, emojis and progress bars for the `srpak` commands.

use std::time::Duration;

use console::{Emoji, style};
use indicatif::{HumanBytes, HumanDuration, ProgressBar, ProgressStyle};

use crate::packfile::{PackPhase, PackProgress};

/// Magnifying glass - for reading/scanning operations
pub static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
/// Package - for extraction/compression operations
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "");
/// Floppy disk - for writing/saving operations
pub static DISK: Emoji<'_, '_> = Emoji("💾 ", "");
/// Sparkles - for completion
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

/// Print a step indicator: `[1/3] 📦 Message...`
pub fn print_step(current: usize, total: usize, emoji: Emoji, msg: &str) {
    println!(
        "{} {}{}",
        style(format!("[{current}/{total}]")).bold().dim(),
        emoji,
        msg
    );
}

/// Print completion message: `✨ Finished in 2s`
pub fn print_done(elapsed: Duration) {
    println!("{} Finished in {}", SPARKLE, HumanDuration(elapsed));
}

/// Print an archive size line: `misc.vpp_pc: 12.40 MiB`
pub fn print_size(label: &str, bytes: u64) {
    println!("{}: {}", style(label).bold(), HumanBytes(bytes));
}

/// Spinner style for work of unknown length
///
/// # Panics
/// Panics if the template string is invalid (this is a compile-time constant).
#[must_use]
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg} ({pos})").expect("valid template")
}

/// Progress bar style for determinate progress
///
/// Format: `Extracting [████████░░░░░░░░] 50/100`
///
/// # Panics
/// Panics if the template string is invalid (this is a compile-time constant).
#[must_use]
pub fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
        .expect("valid template")
}

/// Create a progress bar with the determinate style
#[must_use]
pub fn simple_bar(total: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(bar_style());
    pb.set_message(msg.to_string());
    pb
}

/// Create a spinner for scanning phases
#[must_use]
pub fn simple_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Feed a pack progress update into a bar that starts as a spinner.
///
/// Scanning and compression have no known total; once the writer reports
/// one the bar switches to the determinate style.
pub fn update_pack_bar(pb: &ProgressBar, progress: &PackProgress) {
    match progress.phase {
        PackPhase::ScanningFiles | PackPhase::CompressingFiles => {
            pb.set_message(progress.phase.as_str());
            pb.set_position(progress.current as u64);
        }
        PackPhase::WritingTable => {
            pb.disable_steady_tick();
            pb.set_style(bar_style());
            pb.set_length(progress.total as u64);
            pb.set_position(0);
            pb.set_message(progress.phase.as_str());
        }
        PackPhase::WritingFiles => {
            pb.set_message(progress.phase.as_str());
            pb.set_position(progress.current as u64);
        }
        _ => {}
    }
}
