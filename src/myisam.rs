//! MyISAM table sizing.
//!
//! MyISAM keeps row data and index data in separate files, so no format
//! parsing is needed: data length is the size of the `.MYD` file and index
//! length the size of the companion `.MYI` file. MyISAM reports no
//! server-side free-space figure for this tool to reproduce.

use std::fs;
use std::path::{Path, PathBuf};

use crate::UsageError;

/// Per-table MyISAM usage analyzer.
pub struct MyIsamParser {
    data_path: PathBuf,
    index_path: PathBuf,

    data_length: u64,
    index_length: u64,
}

impl MyIsamParser {
    pub fn new(data_path: &Path, index_path: &Path) -> Self {
        MyIsamParser {
            data_path: data_path.to_path_buf(),
            index_path: index_path.to_path_buf(),
            data_length: 0,
            index_length: 0,
        }
    }

    /// Stat both files. The `.MYD` file is required; a missing `.MYI`
    /// (index-less table, or a partial copy) counts as zero index bytes.
    pub fn run(&mut self) -> Result<(), UsageError> {
        self.data_length = fs::metadata(&self.data_path)
            .map_err(|e| UsageError::FileOpen {
                path: self.data_path.display().to_string(),
                source: e,
            })?
            .len();

        self.index_length = fs::metadata(&self.index_path)
            .map(|meta| meta.len())
            .unwrap_or(0);

        Ok(())
    }

    /// The (data_length, index_length, data_free) triple, in bytes.
    pub fn stats(&self) -> (u64, u64, u64) {
        (self.data_length, self.index_length, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_myisam_sizes() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let myd = dir.path().join("t1.MYD");
        let myi = dir.path().join("t1.MYI");
        std::fs::File::create(&myd)
            .and_then(|mut f| f.write_all(&[0u8; 300]))
            .expect("write MYD");
        std::fs::File::create(&myi)
            .and_then(|mut f| f.write_all(&[0u8; 120]))
            .expect("write MYI");

        let mut parser = MyIsamParser::new(&myd, &myi);
        parser.run().expect("run");
        assert_eq!(parser.stats(), (300, 120, 0));
    }

    #[test]
    fn test_myisam_missing_index_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let myd = dir.path().join("t2.MYD");
        std::fs::File::create(&myd)
            .and_then(|mut f| f.write_all(&[0u8; 50]))
            .expect("write MYD");

        let mut parser = MyIsamParser::new(&myd, &dir.path().join("t2.MYI"));
        parser.run().expect("run");
        assert_eq!(parser.stats(), (50, 0, 0));
    }

    #[test]
    fn test_myisam_missing_data_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut parser = MyIsamParser::new(
            &dir.path().join("gone.MYD"),
            &dir.path().join("gone.MYI"),
        );
        assert!(matches!(parser.run(), Err(UsageError::FileOpen { .. })));
    }
}
