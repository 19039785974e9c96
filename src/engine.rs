//! Storage-engine dispatch and the crate's top-level entry point.
//!
//! The tool handles two engines whose on-disk layouts have nothing in
//! common, so [`TableParser`] is a tagged sum type rather than a trait
//! object: dispatch stays explicit and the InnoDB decode paths inline.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::innodb::parser::InnoDbParser;
use crate::monitor::{DEFAULT_IO_OPS_LIMIT, DEFAULT_IO_WAIT_THRESHOLD};
use crate::myisam::MyIsamParser;
use crate::UsageError;

/// Sizes for one table, mirroring the server's information-schema columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableUsage {
    /// Bytes reserved by the clustered-index segments (PK + row data).
    pub data_length: u64,
    /// Bytes reserved by secondary-index segments.
    pub index_length: u64,
    /// Bytes reserved but not yet allocated to any segment.
    pub data_free: u64,
}

/// Storage engine a data file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Engine {
    #[serde(rename = "InnoDB")]
    InnoDb,
    #[serde(rename = "MyISAM")]
    MyIsam,
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Engine::InnoDb => "InnoDB",
            Engine::MyIsam => "MyISAM",
        }
    }
}

/// Per-file analyzer, one variant per supported engine.
pub enum TableParser {
    InnoDb(InnoDbParser),
    MyIsam(MyIsamParser),
}

impl TableParser {
    /// Open the right analyzer for `path`.
    ///
    /// `.ibd` and `.MYD` files select their engines directly. A bare table
    /// path without either suffix is probed as `<path>.ibd` first, then
    /// `<path>.MYD`, matching how the tool is pointed at `db/table` names.
    pub fn open(
        path: &Path,
        io_wait_threshold: f64,
        max_io_ops_per_sec: f64,
    ) -> Result<Self, UsageError> {
        if has_suffix(path, ".ibd") {
            let parser = InnoDbParser::open(path, io_wait_threshold, max_io_ops_per_sec)?;
            return Ok(TableParser::InnoDb(parser));
        }
        if has_suffix(path, ".MYD") {
            return Ok(TableParser::MyIsam(MyIsamParser::new(
                path,
                &sibling_with_suffix(path, ".MYD", ".MYI"),
            )));
        }

        let ibd = PathBuf::from(format!("{}.ibd", path.display()));
        if ibd.is_file() {
            let parser = InnoDbParser::open(&ibd, io_wait_threshold, max_io_ops_per_sec)?;
            return Ok(TableParser::InnoDb(parser));
        }

        let myd = PathBuf::from(format!("{}.MYD", path.display()));
        if myd.is_file() {
            let myi = PathBuf::from(format!("{}.MYI", path.display()));
            return Ok(TableParser::MyIsam(MyIsamParser::new(&myd, &myi)));
        }

        Err(UsageError::Argument(format!(
            "unsupported file type or file not found: {}",
            path.display()
        )))
    }

    pub fn engine(&self) -> Engine {
        match self {
            TableParser::InnoDb(_) => Engine::InnoDb,
            TableParser::MyIsam(_) => Engine::MyIsam,
        }
    }

    /// Run the analysis to completion.
    pub fn run(&mut self) -> Result<(), UsageError> {
        match self {
            TableParser::InnoDb(parser) => parser.run(),
            TableParser::MyIsam(parser) => parser.run(),
        }
    }

    /// The computed sizes; only meaningful after [`TableParser::run`].
    pub fn stats(&self) -> TableUsage {
        let (data_length, index_length, data_free) = match self {
            TableParser::InnoDb(parser) => parser.stats(),
            TableParser::MyIsam(parser) => parser.stats(),
        };
        TableUsage {
            data_length,
            index_length,
            data_free,
        }
    }
}

/// Analyze one data file with explicit governor settings.
pub fn parse(
    path: &Path,
    io_wait_threshold_pct: f64,
    max_io_ops_per_sec: f64,
) -> Result<TableUsage, UsageError> {
    let mut parser = TableParser::open(path, io_wait_threshold_pct, max_io_ops_per_sec)?;
    parser.run()?;
    Ok(parser.stats())
}

/// Analyze one data file with the default governor settings
/// (50% iowait threshold, 200 reads per second).
pub fn parse_with_defaults(path: &Path) -> Result<TableUsage, UsageError> {
    parse(path, DEFAULT_IO_WAIT_THRESHOLD, DEFAULT_IO_OPS_LIMIT)
}

/// Suffix check on the file name, case-sensitive like the server's own
/// file naming (`.ibd` lower, `.MYD`/`.MYI` upper).
fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(suffix))
}

fn sibling_with_suffix(path: &Path, from: &str, to: &str) -> PathBuf {
    let s = path.display().to_string();
    match s.strip_suffix(from) {
        Some(stem) => PathBuf::from(format!("{}{}", stem, to)),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_suffix() {
        assert!(has_suffix(Path::new("/data/db/t1.ibd"), ".ibd"));
        assert!(!has_suffix(Path::new("/data/db/t1.IBD"), ".ibd"));
        assert!(has_suffix(Path::new("t1.MYD"), ".MYD"));
        assert!(!has_suffix(Path::new("t1.myd"), ".MYD"));
    }

    #[test]
    fn test_sibling_with_suffix() {
        assert_eq!(
            sibling_with_suffix(Path::new("/data/db/t1.MYD"), ".MYD", ".MYI"),
            PathBuf::from("/data/db/t1.MYI")
        );
    }

    #[test]
    fn test_open_unknown_path() {
        let result = TableParser::open(Path::new("/nonexistent/table"), 50.0, 200.0);
        assert!(matches!(result, Err(UsageError::Argument(_))));
    }

    #[test]
    fn test_engine_names() {
        assert_eq!(Engine::InnoDb.name(), "InnoDB");
        assert_eq!(Engine::MyIsam.name(), "MyISAM");
    }
}
