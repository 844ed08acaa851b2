use crate::file::csv::error::FileError;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Outcome of one archive run.
#[derive(Debug, Clone, Default)]
pub struct ArchiveReport {
    /// Timestamped directory the files were copied into.
    pub destination: PathBuf,
    pub archived: Vec<PathBuf>,
    /// Files that matched but could not be copied.
    pub failed: Vec<PathBuf>,
}

impl ArchiveReport {
    pub fn archived_count(&self) -> usize {
        self.archived.len()
    }
}

/// Copies input files that match a wildcard pattern into a timestamped
/// backup directory (`<backup_dir>/archive_YYYYMMDD_HHMMSS`).
#[derive(Debug, Clone)]
pub struct FileArchiver {
    source_dir: PathBuf,
    backup_dir: PathBuf,
    file_pattern: String,
}

impl FileArchiver {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
        file_pattern: impl Into<String>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            backup_dir: backup_dir.into(),
            file_pattern: file_pattern.into(),
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Copies every matching regular file. A failure on a single file is
    /// logged and does not stop the others; a missing source directory or an
    /// uncreatable backup directory is an error.
    pub async fn archive(&self) -> Result<ArchiveReport, FileError> {
        info!(
            source = %self.source_dir.display(),
            backup = %self.backup_dir.display(),
            pattern = %self.file_pattern,
            "Starting file archive"
        );

        if !tokio::fs::try_exists(&self.source_dir).await? {
            return Err(FileError::NotFound(self.source_dir.display().to_string()));
        }

        let destination = self.create_backup_dir().await?;
        let mut report = ArchiveReport {
            destination: destination.clone(),
            ..Default::default()
        };

        let mut entries = tokio::fs::read_dir(&self.source_dir)
            .await
            .map_err(|e| FileError::from_io(&self.source_dir, e))?;
        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| matches_pattern(name, &self.file_pattern));
            if is_file && matches {
                candidates.push(path);
            }
        }
        candidates.sort();

        for path in candidates {
            let Some(name) = path.file_name() else {
                continue;
            };
            let target = destination.join(name);
            match tokio::fs::copy(&path, &target).await {
                Ok(_) => {
                    debug!(from = %path.display(), to = %target.display(), "Archived file");
                    report.archived.push(path);
                }
                Err(e) => {
                    error!(file = %path.display(), error = %e, "Failed to archive file");
                    report.failed.push(path);
                }
            }
        }

        if report.archived.is_empty() {
            warn!(source = %self.source_dir.display(), "No files matched the archive pattern");
        }

        info!(
            archived = report.archived_count(),
            failed = report.failed.len(),
            destination = %destination.display(),
            "File archive completed"
        );
        Ok(report)
    }

    async fn create_backup_dir(&self) -> Result<PathBuf, FileError> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self.backup_dir.join(format!("archive_{stamp}"));
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| FileError::from_io(&path, e))?;
        info!(path = %path.display(), "Created backup directory");
        Ok(path)
    }
}

/// Glob-style match supporting `*` (any run) and `?` (any single char).
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    let name: Vec<char> = name.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut n, mut p) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            n += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            mark = n;
            p += 1;
        } else if let Some(s) = star {
            p = s + 1;
            mark += 1;
            n = mark;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matching() {
        assert!(matches_pattern("roaming-data.csv", "*.csv"));
        assert!(matches_pattern("a.csv", "?.csv"));
        assert!(!matches_pattern("ab.csv", "?.csv"));
        assert!(!matches_pattern("data.csv.bak", "*.csv"));
        assert!(matches_pattern("anything", "*"));
        assert!(matches_pattern("roaming-2024.csv", "roaming-*.csv"));
    }

    #[tokio::test]
    async fn archives_matching_files_only() {
        let src = tempfile::tempdir().unwrap();
        let backup = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.csv"), "h\n1").unwrap();
        std::fs::write(src.path().join("b.csv"), "h\n2").unwrap();
        std::fs::write(src.path().join("notes.txt"), "x").unwrap();

        let archiver = FileArchiver::new(src.path(), backup.path(), "*.csv");
        let report = archiver.archive().await.unwrap();

        assert_eq!(report.archived_count(), 2);
        assert!(report.destination.starts_with(backup.path()));
        assert!(report.destination.join("a.csv").exists());
        assert!(!report.destination.join("notes.txt").exists());
    }

    #[tokio::test]
    async fn missing_source_dir_is_an_error() {
        let backup = tempfile::tempdir().unwrap();
        let archiver = FileArchiver::new("/no/such/source", backup.path(), "*.csv");
        assert!(matches!(archiver.archive().await, Err(FileError::NotFound(_))));
    }
}
