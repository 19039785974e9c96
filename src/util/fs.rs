use std::path::{Path, PathBuf};

use crate::UsageError;

/// Recursively find engine data files under a data directory.
///
/// Walks `dir` and every subdirectory, collecting files whose names match
/// any of the provided suffixes (e.g., `[".ibd", ".MYD"]`). Results are
/// sorted by path so reports are stable across runs.
pub fn find_data_files(dir: &Path, suffixes: &[&str]) -> Result<Vec<PathBuf>, UsageError> {
    let mut files = Vec::new();
    walk(dir, suffixes, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, suffixes: &[&str], out: &mut Vec<PathBuf>) -> Result<(), UsageError> {
    let entries = std::fs::read_dir(dir).map_err(|e| UsageError::FileOpen {
        path: dir.display().to_string(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(UsageError::Io)?;
        let path = entry.path();

        if path.is_dir() {
            walk(&path, suffixes, out)?;
        } else if has_matching_suffix(&path, suffixes) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_matching_suffix(path: &Path, suffixes: &[&str]) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| suffixes.iter().any(|s| name.ends_with(s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_find_data_files_recurses_and_sorts() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db1 = dir.path().join("db1");
        let db2 = dir.path().join("db2");
        std::fs::create_dir_all(&db1).expect("mkdir db1");
        std::fs::create_dir_all(db2.join("nested")).expect("mkdir db2/nested");

        File::create(db1.join("b.ibd")).expect("create");
        File::create(db1.join("a.ibd")).expect("create");
        File::create(db1.join("a.frm")).expect("create"); // ignored
        File::create(db2.join("nested").join("c.MYD")).expect("create");
        File::create(db2.join("c.MYI")).expect("create"); // not a data file

        let files = find_data_files(dir.path(), &[".ibd", ".MYD"]).expect("walk");
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.ibd", "b.ibd", "c.MYD"]);
    }

    #[test]
    fn test_find_data_files_missing_dir() {
        let result = find_data_files(Path::new("/nonexistent/datadir"), &[".ibd"]);
        assert!(matches!(result, Err(UsageError::FileOpen { .. })));
    }
}
