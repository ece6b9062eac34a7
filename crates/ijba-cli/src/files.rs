//! Path materialization and on-disk checks for query results.

use anyhow::Result;
use ijba_db::{Database, FileRecord};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `{directory}/{path}[-{sighting}]{extension}` for every file, in query order.
pub fn materialize(
    files: &[Arc<FileRecord>],
    directory: &Path,
    extension: Option<&str>,
    add_sighting_id: bool,
) -> Vec<PathBuf> {
    files
        .iter()
        .map(|f| f.make_path(directory, extension.unwrap_or(&f.extension), add_sighting_id))
        .collect()
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub checked: usize,
    /// Missing originals, sorted.
    pub missing: Vec<PathBuf>,
}

/// Check the original file of every record. Several sightings share one
/// original, so each distinct path is checked once.
pub fn check_originals(db: &Database, files: &[Arc<FileRecord>]) -> Result<CheckReport> {
    let mut paths = files
        .iter()
        .map(|f| db.original_file_name(f, false))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    paths.dedup();

    let mut missing: Vec<PathBuf> = paths.par_iter().filter(|p| !p.exists()).cloned().collect();
    missing.sort();
    tracing::info!(checked = paths.len(), missing = missing.len(), "checked original files");
    Ok(CheckReport {
        checked: paths.len(),
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ijba_db::DatabaseConfig;

    fn record(path: &str, sighting_id: Option<u32>) -> Arc<FileRecord> {
        Arc::new(FileRecord {
            path: path.to_string(),
            extension: ".jpg".to_string(),
            client_id: 1,
            media_id: 1,
            sighting_id,
            frame: None,
            annotation: None,
        })
    }

    #[test]
    fn materialize_appends_sighting_when_asked() {
        let files = vec![record("img/1", Some(3)), record("img/2", None)];
        assert_eq!(
            materialize(&files, Path::new("/out"), Some(".png"), true),
            vec![PathBuf::from("/out/img/1-3.png"), PathBuf::from("/out/img/2.png")]
        );
        assert_eq!(
            materialize(&files, Path::new("/out"), None, false),
            vec![PathBuf::from("/out/img/1.jpg"), PathBuf::from("/out/img/2.jpg")]
        );
    }

    #[test]
    fn check_originals_reports_missing_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("img")).unwrap();
        std::fs::write(dir.path().join("img/1.jpg"), b"").unwrap();

        let db = Database::new(DatabaseConfig::new(dir.path()).with_original_directory(dir.path(), None));
        let files = vec![
            record("img/1", Some(0)),
            record("img/2", Some(0)),
            record("img/2", Some(1)),
        ];
        let report = check_originals(&db, &files).unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.missing, vec![dir.path().join("img/2.jpg")]);
    }

    #[test]
    fn check_originals_needs_original_directory() {
        let db = Database::new(DatabaseConfig::new("/nowhere"));
        assert!(check_originals(&db, &[record("img/1", None)]).is_err());
    }
}
