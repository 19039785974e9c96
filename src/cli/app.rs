use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI definition for the `ibd-usage` binary.
#[derive(Parser)]
#[command(name = "ibd-usage")]
#[command(about = "Offline InnoDB/MyISAM table usage analyzer")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Number of parallel workers for directory scans
    #[arg(long, default_value_t = 1, global = true)]
    pub parallel: usize,

    #[command(subcommand)]
    pub command: Commands,
}

/// Controls when colored output is emitted.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

/// Available subcommands for the `ibd-usage` CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Report data, index and free sizes for tables on disk
    ///
    /// Accepts a single data file or a data directory. Directories are walked
    /// recursively and every `.ibd` / `.MYD` file is analyzed. For InnoDB the
    /// tool parses the tablespace's segment metadata offline and reports the
    /// same DATA_LENGTH / INDEX_LENGTH / DATA_FREE a live server would; for
    /// MyISAM the `.MYD` and `.MYI` file sizes are reported directly. All
    /// reads are rate limited and pause automatically while the host's CPU
    /// I/O wait is above the configured threshold, so the tool is safe to run
    /// against a busy production data directory. Results are emitted as a
    /// JSON array on stdout.
    Usage {
        /// Data file (.ibd / .MYD) or data directory to analyze
        path: String,

        /// CPU I/O wait percentage above which reads pause
        #[arg(long = "io-wait-threshold", default_value_t = 50.0)]
        io_wait_threshold: f64,

        /// Maximum page reads per second, per file
        #[arg(long = "io-ops-limit", default_value_t = 200.0)]
        io_ops_limit: f64,

        /// Regex of file names to skip (can be repeated)
        #[arg(long = "exclude")]
        exclude: Vec<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
