/// Rule-based file sorting.
///
/// The [`Sorter`] enumerates regular files in a source directory,
/// classifies each one through a [`RuleSet`], and moves it into the
/// matching bucket folder under the destination root. Bucket folders are
/// created lazily; creating one that already exists is a no-op.
///
/// Destination name collisions are resolved deterministically: `file.txt`
/// retries as `file-1.txt`, `file-2.txt`, … up to 99 before the move is
/// reported as a failure. Nothing is ever silently overwritten.
use crate::config::CompiledFilters;
use crate::rules::RuleSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the history file written into the destination root.
pub const HISTORY_FILE_NAME: &str = ".sortbox_history.json";

/// Collision suffix counter cap. Beyond this the move fails.
const MAX_COLLISION_SUFFIX: u32 = 99;

/// Errors raised during a sorting run.
#[derive(Debug)]
pub enum SortError {
    /// The source path is missing or not a directory. Fatal, raised
    /// before any mutation.
    InvalidSourcePath { path: PathBuf },
    /// The destination root could not be resolved to an absolute path.
    InvalidDestRoot {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to create a bucket directory.
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to move a file into its bucket.
    MoveFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: std::io::Error,
    },
    /// The collision counter was exhausted for a destination name.
    TooManyCollisions { destination: PathBuf },
    /// Failed to read the source directory listing.
    ScanFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write the history file.
    HistoryWriteFailed { source: std::io::Error },
    /// Failed to read the history file.
    HistoryReadFailed { source: std::io::Error },
    /// The history file is malformed or absent when required.
    InvalidHistoryFormat { reason: String },
}

impl std::fmt::Display for SortError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSourcePath { path } => {
                write!(
                    f,
                    "Invalid source path {}: not an existing directory",
                    path.display()
                )
            }
            Self::InvalidDestRoot { path, source } => {
                write!(
                    f,
                    "Invalid destination root {}: {}",
                    path.display(),
                    source
                )
            }
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::MoveFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::TooManyCollisions { destination } => {
                write!(
                    f,
                    "Too many name collisions at {}",
                    destination.display()
                )
            }
            Self::ScanFailed { path, source } => {
                write!(f, "Failed to read directory {}: {}", path.display(), source)
            }
            Self::HistoryWriteFailed { source } => {
                write!(f, "Failed to write history file: {}", source)
            }
            Self::HistoryReadFailed { source } => {
                write!(f, "Failed to read history file: {}", source)
            }
            Self::InvalidHistoryFormat { reason } => {
                write!(f, "Invalid history file: {}", reason)
            }
        }
    }
}

impl std::error::Error for SortError {}

/// Result type for sorting operations.
pub type SortResult<T> = Result<T, SortError>;

/// A single recorded file move, the unit of the undo history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Where the file was before the move.
    pub original_path: PathBuf,
    /// Where the file ended up.
    pub new_path: PathBuf,
    /// The bucket folder the file was routed to.
    pub bucket: String,
}

/// The persisted record of one sorting run, written to the destination
/// root so a later `--undo` can reverse it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLog {
    /// RFC 3339 timestamp of the run.
    pub timestamp: String,
    /// The destination root the run targeted.
    pub dest_root: PathBuf,
    /// All moves performed, in execution order.
    pub operations: Vec<Operation>,
}

impl OperationLog {
    /// Creates an empty log for a destination root.
    pub fn new(dest_root: PathBuf) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            dest_root,
            operations: Vec::new(),
        }
    }

    /// Records a completed move.
    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    fn history_file_path(dest_root: &Path) -> PathBuf {
        dest_root.join(HISTORY_FILE_NAME)
    }

    /// Saves this log as pretty-printed JSON in the destination root.
    ///
    /// An empty log is not written: a run that moved nothing leaves no
    /// history behind and never creates the destination root.
    pub fn save(&self) -> SortResult<()> {
        if self.operations.is_empty() {
            return Ok(());
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| SortError::HistoryWriteFailed {
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        fs::write(Self::history_file_path(&self.dest_root), json)
            .map_err(|e| SortError::HistoryWriteFailed { source: e })
    }

    /// Loads the history for a destination root, or `None` if there is
    /// no history file.
    pub fn load(dest_root: &Path) -> SortResult<Option<Self>> {
        let history_path = Self::history_file_path(dest_root);
        if !history_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&history_path)
            .map_err(|e| SortError::HistoryReadFailed { source: e })?;

        let log = serde_json::from_str(&content).map_err(|e| SortError::InvalidHistoryFormat {
            reason: e.to_string(),
        })?;

        Ok(Some(log))
    }

    /// Deletes the history file for a destination root, if present.
    pub fn delete(dest_root: &Path) -> SortResult<()> {
        let history_path = Self::history_file_path(dest_root);
        if history_path.exists() {
            fs::remove_file(&history_path)
                .map_err(|e| SortError::HistoryWriteFailed { source: e })?;
        }
        Ok(())
    }
}

/// The outcome of asking the sorter to place one file.
#[derive(Debug)]
pub enum MoveOutcome {
    /// The file was moved; the operation records old and new paths.
    Moved(Operation),
    /// The file already sits at its computed destination. Happens on
    /// repeated in-place recursive runs.
    AlreadyInPlace,
}

/// Aggregate result of a run: counts, per-bucket totals, and the
/// failures collected along the way.
#[derive(Debug, Default)]
pub struct SortReport {
    /// Number of files moved.
    pub moved: usize,
    /// Number of files skipped because they were already in place.
    pub skipped: usize,
    /// Files that could not be moved, with the reason.
    pub failures: Vec<(PathBuf, String)>,
    /// Files moved per bucket.
    pub bucket_counts: HashMap<String, usize>,
}

impl SortReport {
    /// Records a successful move into the totals.
    pub fn record_move(&mut self, operation: &Operation) {
        self.moved += 1;
        *self
            .bucket_counts
            .entry(operation.bucket.clone())
            .or_insert(0) += 1;
    }

    /// Records a per-file failure.
    pub fn record_failure(&mut self, path: PathBuf, reason: String) {
        self.failures.push((path, reason));
    }

    /// True when every file was placed without error.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Moves files from a source directory into bucket folders under a
/// destination root, one file at a time.
pub struct Sorter {
    source: PathBuf,
    dest_root: PathBuf,
    rules: RuleSet,
}

impl Sorter {
    /// Creates a sorter after validating the source path.
    ///
    /// Fails with [`SortError::InvalidSourcePath`] when the source is
    /// missing or not a directory. Both paths are normalized up front:
    /// the source is canonicalized and the destination root resolved to
    /// an absolute form, so the path identity checks (destination
    /// subtree skip, already-in-place detection) hold no matter how the
    /// caller spelled the paths. The destination root is not created
    /// here; it appears lazily on the first move, so a dry run or a
    /// failed validation leaves the filesystem untouched.
    pub fn new(source: &Path, dest_root: &Path, rules: RuleSet) -> SortResult<Self> {
        if !source.is_dir() {
            return Err(SortError::InvalidSourcePath {
                path: source.to_path_buf(),
            });
        }
        let source = fs::canonicalize(source).map_err(|_| SortError::InvalidSourcePath {
            path: source.to_path_buf(),
        })?;
        let dest_root = Self::normalize_dest_root(dest_root)?;
        Ok(Self {
            source,
            dest_root,
            rules,
        })
    }

    /// Resolves the destination root to a canonical form when it
    /// exists, or an absolute lexical form when it does not yet.
    fn normalize_dest_root(dest_root: &Path) -> SortResult<PathBuf> {
        if dest_root.exists() {
            return fs::canonicalize(dest_root).map_err(|e| SortError::InvalidDestRoot {
                path: dest_root.to_path_buf(),
                source: e,
            });
        }
        if dest_root.is_absolute() {
            return Ok(dest_root.to_path_buf());
        }
        std::env::current_dir()
            .map(|cwd| cwd.join(dest_root))
            .map_err(|e| SortError::InvalidDestRoot {
                path: dest_root.to_path_buf(),
                source: e,
            })
    }

    /// The destination root this sorter targets.
    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    /// Collects the files to sort, in deterministic (sorted) order.
    ///
    /// Only regular files pass; subdirectories are never descended into
    /// unless `recursive` is set. The destination root subtree and the
    /// history file are always skipped, as are files rejected by the
    /// filter rules.
    pub fn scan(&self, filters: &CompiledFilters, recursive: bool) -> SortResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        self.scan_dir(&self.source, filters, recursive, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn scan_dir(
        &self,
        dir: &Path,
        filters: &CompiledFilters,
        recursive: bool,
        files: &mut Vec<PathBuf>,
    ) -> SortResult<()> {
        let entries = fs::read_dir(dir).map_err(|e| SortError::ScanFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_file() {
                if entry.file_name() == HISTORY_FILE_NAME {
                    continue;
                }
                if filters.should_include(&path) {
                    files.push(path);
                }
            } else if file_type.is_dir() && recursive {
                // Never descend into the destination tree of another
                // root; in-place sorting (dest == source) still walks
                // its own buckets so re-runs can detect placed files.
                if self.dest_root != self.source && path == self.dest_root {
                    continue;
                }
                self.scan_dir(&path, filters, recursive, files)?;
            }
        }

        Ok(())
    }

    /// Returns the bucket folder name a file classifies to.
    pub fn bucket_for(&self, path: &Path) -> &str {
        self.rules.classify(path)
    }

    /// Computes where a file would land, before collision resolution.
    pub fn planned_destination(&self, path: &Path) -> SortResult<PathBuf> {
        self.planned_destination_for(path, self.rules.classify(path))
    }

    /// Computes where a file would land in an explicit bucket, before
    /// collision resolution.
    pub fn planned_destination_for(&self, path: &Path, bucket: &str) -> SortResult<PathBuf> {
        let file_name = path.file_name().ok_or_else(|| SortError::MoveFailure {
            source: path.to_path_buf(),
            destination: self.dest_root.join(bucket),
            source_error: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "file has no name component",
            ),
        })?;
        Ok(self.dest_root.join(bucket).join(file_name))
    }

    /// Moves one file into the bucket its rules classify it to.
    pub fn move_file(&self, path: &Path) -> SortResult<MoveOutcome> {
        self.move_file_to(path, self.rules.classify(path))
    }

    /// Moves one file into an explicit bucket, creating the bucket
    /// directory as needed and resolving destination collisions.
    pub fn move_file_to(&self, path: &Path, bucket: &str) -> SortResult<MoveOutcome> {
        let destination = self.planned_destination_for(path, bucket)?;

        if destination == path {
            return Ok(MoveOutcome::AlreadyInPlace);
        }

        let bucket_dir = destination
            .parent()
            .expect("planned destination always has a parent");
        fs::create_dir_all(bucket_dir).map_err(|e| SortError::DirectoryCreationFailed {
            path: bucket_dir.to_path_buf(),
            source: e,
        })?;

        let final_destination =
            Self::resolve_collision(&destination).ok_or(SortError::TooManyCollisions {
                destination: destination.clone(),
            })?;

        fs::rename(path, &final_destination).map_err(|e| SortError::MoveFailure {
            source: path.to_path_buf(),
            destination: final_destination.clone(),
            source_error: e,
        })?;

        Ok(MoveOutcome::Moved(Operation {
            original_path: path.to_path_buf(),
            new_path: final_destination,
            bucket: bucket.to_string(),
        }))
    }

    /// Picks a free destination path. `file.txt` falls back to
    /// `file-1.txt`, `file-2.txt`, … `None` when the counter runs out.
    fn resolve_collision(destination: &Path) -> Option<PathBuf> {
        if !destination.exists() {
            return Some(destination.to_path_buf());
        }

        let parent = destination.parent()?;
        let stem = destination.file_stem()?.to_string_lossy();
        let extension = destination.extension().map(|e| e.to_string_lossy());

        for n in 1..=MAX_COLLISION_SUFFIX {
            let candidate_name = match &extension {
                Some(ext) => format!("{}-{}.{}", stem, n, ext),
                None => format!("{}-{}", stem, n),
            };
            let candidate = parent.join(candidate_name);
            if !candidate.exists() {
                return Some(candidate);
            }
        }

        None
    }
}
