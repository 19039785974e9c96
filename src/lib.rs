#[cfg(feature = "cli")]
pub mod cli;
pub mod engine;
pub mod innodb;
pub mod monitor;
pub mod myisam;
pub mod util;

pub use engine::{parse, TableParser, TableUsage};

use thiserror::Error;

/// Errors surfaced by the analyzers and the I/O governor.
#[derive(Error, Debug)]
pub enum UsageError {
    #[error("Cannot open {path}: {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Short read on page {page}: expected {expected} bytes, got {got}")]
    ShortRead {
        page: u32,
        expected: usize,
        got: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O wait stayed at {0:.2}% past the back-off deadline, giving up")]
    IoPressureTimeout(f64),

    #[error("Invalid tablespace format: {0}")]
    InvalidFormat(String),

    #[error("Invalid argument: {0}")]
    Argument(String),
}
