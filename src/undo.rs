/// Undo support: reversing a recorded sorting run.
///
/// Reads the operation history from the destination root and moves every
/// file back to its original location, newest move first. A file already
/// present at the original location is backed up with a timestamp suffix
/// rather than overwritten.
use crate::sorter::{Operation, OperationLog, SortError, SortResult};
use std::fs;
use std::path::{Path, PathBuf};

/// What an undo run accomplished.
#[derive(Debug)]
pub struct UndoReport {
    /// Number of files moved back to their original location.
    pub restored_files: usize,
    /// Files that could not be restored, with reasons.
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Files skipped because they were no longer where the history says.
    pub skipped_files: Vec<(PathBuf, String)>,
}

impl UndoReport {
    fn new() -> Self {
        Self {
            restored_files: 0,
            failed_restores: Vec::new(),
            skipped_files: Vec::new(),
        }
    }

    /// True when every recorded operation was reversed.
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

/// Reverses recorded sorting runs.
pub struct UndoManager;

impl UndoManager {
    /// Undoes the run recorded for `dest_root`.
    ///
    /// Operations are reversed in LIFO order. The history file is only
    /// deleted when every restore succeeded, so a partial undo can be
    /// retried.
    ///
    /// Per-operation edge cases:
    /// * file missing at the recorded location: skipped
    /// * file already back at the original location: the conflicting
    ///   file is backed up with a timestamp suffix first
    /// * permission or I/O error: recorded as a failure
    pub fn undo(dest_root: &Path) -> SortResult<UndoReport> {
        if !dest_root.is_dir() {
            return Err(SortError::InvalidSourcePath {
                path: dest_root.to_path_buf(),
            });
        }

        let log = OperationLog::load(dest_root)?.ok_or_else(|| SortError::InvalidHistoryFormat {
            reason: "No previous sorting run found to undo".to_string(),
        })?;

        let mut report = UndoReport::new();
        for operation in log.operations.iter().rev() {
            match Self::restore_file(operation) {
                Ok(()) => report.restored_files += 1,
                Err((path, reason)) => {
                    if reason.contains("not found") {
                        report.skipped_files.push((path, reason));
                    } else {
                        report.failed_restores.push((path, reason));
                    }
                }
            }
        }

        if report.is_complete_success() {
            if let Err(e) = OperationLog::delete(dest_root) {
                eprintln!("Warning: Could not delete history file: {}", e);
            }
            Self::prune_empty_buckets(&log);
        }

        Ok(report)
    }

    /// Removes bucket directories the restore emptied out. Directories
    /// that still hold unrelated files survive: `remove_dir` only
    /// succeeds on empty directories, so failures are ignored.
    fn prune_empty_buckets(log: &OperationLog) {
        let bucket_dirs: std::collections::BTreeSet<PathBuf> = log
            .operations
            .iter()
            .filter_map(|op| op.new_path.parent().map(Path::to_path_buf))
            .collect();

        for dir in bucket_dirs {
            let _ = fs::remove_dir(&dir);
        }
    }

    /// Moves a single file back to its original location.
    fn restore_file(operation: &Operation) -> Result<(), (PathBuf, String)> {
        if !operation.new_path.exists() {
            return Err((
                operation.new_path.clone(),
                "File not found at recorded location".to_string(),
            ));
        }

        if operation.original_path.exists() {
            let backup_path = Self::generate_backup_path(&operation.original_path);
            fs::rename(&operation.original_path, &backup_path).map_err(|e| {
                (
                    operation.original_path.clone(),
                    format!("Could not back up conflicting file: {}", e),
                )
            })?;
        }

        if let Some(parent) = operation.original_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                (
                    operation.original_path.clone(),
                    format!("Could not recreate original directory: {}", e),
                )
            })?;
        }

        fs::rename(&operation.new_path, &operation.original_path).map_err(|e| {
            (
                operation.new_path.clone(),
                format!("Failed to restore file: {}", e),
            )
        })?;

        Ok(())
    }

    /// `file.txt` becomes `file.txt.bak.20260825-143052`.
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file");

        let backup_name = format!("{}.bak.{}", filename, timestamp);

        match original_path.parent() {
            Some(parent) => parent.join(backup_name),
            None => PathBuf::from(backup_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;
    use crate::sorter::{MoveOutcome, Sorter};
    use std::fs;
    use tempfile::TempDir;

    fn sort_one(base: &Path, name: &str, content: &str) -> Operation {
        let file = base.join(name);
        fs::write(&file, content).expect("failed to write test file");
        let rules = RuleSet::from_pairs([("txt", "Text"), ("png", "Images")]).unwrap();
        let sorter = Sorter::new(base, base, rules).unwrap();
        match sorter.move_file(&file).unwrap() {
            MoveOutcome::Moved(op) => op,
            MoveOutcome::AlreadyInPlace => panic!("expected a move"),
        }
    }

    #[test]
    fn test_undo_without_history_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(UndoManager::undo(temp.path()).is_err());
    }

    #[test]
    fn test_undo_invalid_dest_root() {
        assert!(UndoManager::undo(Path::new("/no/such/path")).is_err());
    }

    #[test]
    fn test_undo_restores_single_file() {
        let temp = TempDir::new().unwrap();
        let op = sort_one(temp.path(), "note.txt", "content");

        let mut log = OperationLog::new(temp.path().to_path_buf());
        log.add_operation(op);
        log.save().unwrap();

        let moved = temp.path().join("Text").join("note.txt");
        assert!(moved.exists());

        let report = UndoManager::undo(temp.path()).unwrap();
        assert_eq!(report.restored_files, 1);
        assert!(report.is_complete_success());
        assert!(temp.path().join("note.txt").exists());
        assert!(!moved.exists());
        // History removed after a clean undo.
        assert!(OperationLog::load(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_undo_restores_multiple_files() {
        let temp = TempDir::new().unwrap();
        let op1 = sort_one(temp.path(), "a.txt", "a");
        let op2 = sort_one(temp.path(), "b.png", "b");

        let mut log = OperationLog::new(temp.path().to_path_buf());
        log.add_operation(op1);
        log.add_operation(op2);
        log.save().unwrap();

        let report = UndoManager::undo(temp.path()).unwrap();
        assert_eq!(report.restored_files, 2);
        assert!(temp.path().join("a.txt").exists());
        assert!(temp.path().join("b.png").exists());
    }

    #[test]
    fn test_undo_backs_up_conflicting_file() {
        let temp = TempDir::new().unwrap();
        let op = sort_one(temp.path(), "note.txt", "original");

        let mut log = OperationLog::new(temp.path().to_path_buf());
        log.add_operation(op);
        log.save().unwrap();

        // Something new appeared at the original location in the meantime.
        fs::write(temp.path().join("note.txt"), "newcomer").unwrap();

        let report = UndoManager::undo(temp.path()).unwrap();
        assert_eq!(report.restored_files, 1);
        assert!(report.failed_restores.is_empty());

        let restored = fs::read_to_string(temp.path().join("note.txt")).unwrap();
        assert_eq!(restored, "original");

        let backups: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| {
                let path = e.ok()?.path();
                path.file_name()?
                    .to_string_lossy()
                    .contains(".bak.")
                    .then_some(path)
            })
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "newcomer");
    }

    #[test]
    fn test_undo_removes_emptied_bucket_dirs() {
        let temp = TempDir::new().unwrap();
        let op1 = sort_one(temp.path(), "a.txt", "a");
        let op2 = sort_one(temp.path(), "b.png", "b");

        let mut log = OperationLog::new(temp.path().to_path_buf());
        log.add_operation(op1);
        log.add_operation(op2);
        log.save().unwrap();

        let report = UndoManager::undo(temp.path()).unwrap();
        assert!(report.is_complete_success());
        assert!(!temp.path().join("Text").exists());
        assert!(!temp.path().join("Images").exists());
    }

    #[test]
    fn test_undo_keeps_bucket_dir_with_unrelated_files() {
        let temp = TempDir::new().unwrap();
        let op = sort_one(temp.path(), "note.txt", "content");

        let mut log = OperationLog::new(temp.path().to_path_buf());
        log.add_operation(op);
        log.save().unwrap();

        // A file placed into the bucket outside the recorded run.
        fs::write(temp.path().join("Text").join("keep.txt"), "x").unwrap();

        let report = UndoManager::undo(temp.path()).unwrap();
        assert!(report.is_complete_success());
        assert!(temp.path().join("Text").join("keep.txt").exists());
    }

    #[test]
    fn test_undo_skips_missing_file_and_keeps_history() {
        let temp = TempDir::new().unwrap();

        let mut log = OperationLog::new(temp.path().to_path_buf());
        log.add_operation(Operation {
            original_path: temp.path().join("gone.txt"),
            new_path: temp.path().join("Text").join("gone.txt"),
            bucket: "Text".to_string(),
        });
        log.save().unwrap();

        let report = UndoManager::undo(temp.path()).unwrap();
        assert_eq!(report.restored_files, 0);
        assert_eq!(report.skipped_files.len(), 1);
        assert!(!report.is_complete_success());
        // Partial undo keeps the history for a retry.
        assert!(OperationLog::load(temp.path()).unwrap().is_some());
    }
}
