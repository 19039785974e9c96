use std::io::Write;
use std::path::{Path, PathBuf};

use colored::Colorize;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;

use crate::cli::{create_progress_bar, wprintln};
use crate::engine::TableParser;
use crate::util::fs::find_data_files;
use crate::UsageError;

/// Options for the usage subcommand.
pub struct UsageOptions {
    pub path: String,
    pub io_wait_threshold: f64,
    pub io_ops_limit: f64,
    pub exclude: Vec<String>,
    pub parallel: usize,
}

/// One entry of the JSON report.
#[derive(Serialize)]
struct FileReport {
    data_length: u64,
    index_length: u64,
    data_free: u64,
    engine: &'static str,
    filename: String,
}

/// Execute the usage subcommand.
pub fn execute(opts: &UsageOptions, writer: &mut dyn Write) -> Result<(), UsageError> {
    let excludes = compile_excludes(&opts.exclude)?;
    let path = Path::new(&opts.path);

    let meta = std::fs::metadata(path).map_err(|e| UsageError::FileOpen {
        path: opts.path.clone(),
        source: e,
    })?;

    let mut reports = if meta.is_dir() {
        scan_directory(path, &excludes, opts)?
    } else if is_excluded(path, &excludes) {
        Vec::new()
    } else {
        vec![analyze_file(path, opts)?]
    };

    reports.sort_by(|a, b| a.filename.cmp(&b.filename));

    let json = serde_json::to_string_pretty(&reports)
        .map_err(|e| UsageError::InvalidFormat(format!("cannot encode report: {}", e)))?;
    wprintln!(writer, "{}", json)
}

/// Analyze every data file under a directory on a bounded worker pool.
///
/// Files that fail to parse are reported on stderr and skipped, so one
/// truncated tablespace does not sink a whole data-directory scan.
fn scan_directory(
    dir: &Path,
    excludes: &[Regex],
    opts: &UsageOptions,
) -> Result<Vec<FileReport>, UsageError> {
    let files: Vec<PathBuf> = find_data_files(dir, &[".ibd", ".MYD"])?
        .into_iter()
        .filter(|p| !is_excluded(p, excludes))
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.parallel.max(1))
        .build()
        .map_err(|e| UsageError::Argument(format!("cannot build worker pool: {}", e)))?;

    let pb = create_progress_bar(files.len() as u64, "files");
    let reports = pool.install(|| {
        files
            .par_iter()
            .filter_map(|path| {
                let report = analyze_file(path, opts);
                pb.inc(1);
                match report {
                    Ok(report) => Some(report),
                    Err(e) => {
                        eprintln!("{}: skipping {}: {}", "warning".yellow(), path.display(), e);
                        None
                    }
                }
            })
            .collect::<Vec<_>>()
    });
    pb.finish_and_clear();

    Ok(reports)
}

fn analyze_file(path: &Path, opts: &UsageOptions) -> Result<FileReport, UsageError> {
    let mut parser = TableParser::open(path, opts.io_wait_threshold, opts.io_ops_limit)?;
    parser.run()?;
    let usage = parser.stats();

    Ok(FileReport {
        data_length: usage.data_length,
        index_length: usage.index_length,
        data_free: usage.data_free,
        engine: parser.engine().name(),
        filename: path.display().to_string(),
    })
}

fn compile_excludes(patterns: &[String]) -> Result<Vec<Regex>, UsageError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| {
                UsageError::Argument(format!("invalid regex pattern '{}': {}", pattern, e))
            })
        })
        .collect()
}

/// Exclude patterns match against the file name, not the whole path.
fn is_excluded(path: &Path, excludes: &[Regex]) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    excludes.iter().any(|re| re.is_match(name))
}
