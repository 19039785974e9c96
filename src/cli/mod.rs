//! CLI subcommand implementations.
//!
//! Each subcommand has an `Options` struct and a
//! `pub fn execute(opts, writer) -> Result<(), UsageError>` entry point.
//! The `writer: &mut dyn Write` parameter allows output to be captured
//! in tests or redirected as needed.

pub mod app;
pub mod usage;

/// Write a line to the given writer, converting io::Error to UsageError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err($crate::UsageError::Io)
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err($crate::UsageError::Io)
    };
}

pub(crate) use wprintln;

use indicatif::{ProgressBar, ProgressStyle};

/// Create a styled progress bar for iterating over data files.
pub(crate) fn create_progress_bar(count: u64, unit: &str) -> ProgressBar {
    let pb = ProgressBar::new(count);
    if let Ok(style) = ProgressStyle::default_bar().template(&format!(
        "{{spinner:.green}} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{eta}})",
        unit
    )) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
