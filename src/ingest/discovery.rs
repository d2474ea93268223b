use glob::{glob_with, MatchOptions, Pattern};
use std::path::{Path, PathBuf};

use super::types::IngestError;
use crate::excel::{is_lock_file, SPREADSHEET_EXTENSION};

/// List spreadsheet files directly inside `source_dir`.
///
/// Directories and Office lock files are skipped. Results are sorted by name
/// so logs are reproducible; ingestion does not depend on the order.
pub fn discover(source_dir: &Path, case_insensitive: bool) -> Result<Vec<PathBuf>, IngestError> {
    if !source_dir.is_dir() {
        return Err(IngestError::SourceDirMissing(source_dir.to_path_buf()));
    }

    let escaped = Pattern::escape(&source_dir.to_string_lossy());
    let pattern = format!("{}/*.{}", escaped.trim_end_matches('/'), SPREADSHEET_EXTENSION);

    let options = MatchOptions {
        case_sensitive: !case_insensitive,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut files = Vec::new();
    for entry in glob_with(&pattern, options)? {
        match entry {
            Ok(path) => {
                if path.is_file() && !is_lock_file(&path) {
                    files.push(path);
                }
            }
            Err(e) => {
                tracing::warn!(path = %e.path().display(), error = %e.error(), "Skipping unreadable entry");
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn test_selects_only_spreadsheets() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.xlsx");
        touch(dir.path(), "a.xlsx");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "old.xls");
        touch(dir.path(), "~$a.xlsx");
        fs::create_dir(dir.path().join("folder.xlsx")).unwrap();
        fs::create_dir(dir.path().join("problem_files")).unwrap();
        touch(&dir.path().join("problem_files"), "bad.xlsx");

        let found = discover(dir.path(), false).unwrap();
        assert_eq!(names(&found), vec!["a.xlsx", "b.xlsx"]);
    }

    #[test]
    fn test_extension_case_sensitive_by_default() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "upper.XLSX");
        touch(dir.path(), "lower.xlsx");

        assert_eq!(names(&discover(dir.path(), false).unwrap()), vec!["lower.xlsx"]);
        assert_eq!(
            names(&discover(dir.path(), true).unwrap()),
            vec!["lower.xlsx", "upper.XLSX"]
        );
    }

    #[test]
    fn test_directory_with_glob_characters() {
        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join("reports [2024]");
        fs::create_dir(&odd).unwrap();
        touch(&odd, "jan.xlsx");

        assert_eq!(names(&discover(&odd, false).unwrap()), vec!["jan.xlsx"]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(&dir.path().join("absent"), false).unwrap_err();
        assert!(matches!(err, IngestError::SourceDirMissing(_)));
    }
}
