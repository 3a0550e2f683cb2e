//! Command-line interface for sortbox.
//!
//! Parses arguments with clap, wires configuration into the sorter, and
//! drives the move loop, the dry-run preview, and the undo path. Exit
//! status is decided here: a run is only clean when every file moved.

use crate::config::Config;
use crate::grouping;
use crate::output::OutputFormatter;
use crate::sorter::{MoveOutcome, OperationLog, SortReport, Sorter};
use crate::undo::UndoManager;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Sort files into destination folders by extension rules.
#[derive(Parser, Debug, Clone)]
#[command(name = "sortbox", version, about)]
pub struct Cli {
    /// Directory to sort. With --undo: the destination root whose last
    /// run should be reverted.
    pub path: PathBuf,

    /// Destination root for the bucket folders. Defaults to the source
    /// directory itself (in-place sorting).
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show what would be moved without touching anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Also sort files found in subdirectories of the source.
    #[arg(short, long)]
    pub recursive: bool,

    /// Group files into folders named after shared name fragments
    /// instead of applying extension rules.
    #[arg(short, long)]
    pub group: bool,

    /// Revert the previous run recorded for this directory.
    #[arg(long, conflicts_with_all = ["dest", "config", "dry_run", "recursive", "group"])]
    pub undo: bool,
}

/// Outcome of a CLI run, mapped to the process exit code by `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every file was handled without error.
    Success,
    /// At least one file failed; the rest of the batch still ran.
    PartialFailure,
}

/// Executes the parsed command. Fatal errors (bad source path, bad
/// configuration, unreadable history) come back as `Err`; per-file
/// failures are reported along the way and surface as
/// [`RunStatus::PartialFailure`].
pub fn run(cli: &Cli) -> Result<RunStatus, String> {
    if cli.undo {
        return undo_run(cli);
    }

    let config = Config::load(cli.config.as_deref()).map_err(|e| e.to_string())?;
    let rules = config.build_rules().map_err(|e| e.to_string())?;
    let filters = config.compile_filters().map_err(|e| e.to_string())?;

    let dest_root = cli.dest.clone().unwrap_or_else(|| cli.path.clone());
    let sorter = Sorter::new(&cli.path, &dest_root, rules).map_err(|e| e.to_string())?;

    let files = sorter
        .scan(&filters, cli.recursive)
        .map_err(|e| e.to_string())?;

    let assignments: Vec<(PathBuf, String)> = if cli.group {
        grouping::assign_groups(&files)
    } else {
        files
            .iter()
            .map(|f| (f.clone(), sorter.bucket_for(f).to_string()))
            .collect()
    };

    if cli.dry_run {
        dry_run(&sorter, &assignments);
        return Ok(RunStatus::Success);
    }

    sort_run(&sorter, &assignments)
}

/// The real move loop: progress bar, per-file reporting, history save,
/// and the final summary.
fn sort_run(sorter: &Sorter, assignments: &[(PathBuf, String)]) -> Result<RunStatus, String> {
    OutputFormatter::info(&format!(
        "Sorting {} into {}",
        plural(assignments.len()),
        sorter.dest_root().display()
    ));

    if assignments.is_empty() {
        OutputFormatter::success("Nothing to sort.");
        return Ok(RunStatus::Success);
    }

    let mut report = SortReport::default();
    let mut log = OperationLog::new(sorter.dest_root().to_path_buf());
    let pb = OutputFormatter::create_progress_bar(assignments.len() as u64);

    for (file, bucket) in assignments {
        match sorter.move_file_to(file, bucket) {
            Ok(MoveOutcome::Moved(operation)) => {
                pb.println(format!(
                    " - {} → {}/",
                    display_name(file),
                    operation.bucket
                ));
                report.record_move(&operation);
                log.add_operation(operation);
            }
            Ok(MoveOutcome::AlreadyInPlace) => {
                report.skipped += 1;
            }
            Err(e) => {
                pb.println(format!(" ✗ {}", e));
                report.record_failure(file.clone(), e.to_string());
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if let Err(e) = log.save() {
        OutputFormatter::warning(&format!(
            "Could not save history, undo will not be available: {}",
            e
        ));
    }

    OutputFormatter::summary_table(&report.bucket_counts, report.moved);
    if report.skipped > 0 {
        OutputFormatter::plain(&format!("Skipped (already in place): {}", report.skipped));
    }

    if report.is_clean() {
        OutputFormatter::success(&format!("Moved {}.", plural(report.moved)));
        Ok(RunStatus::Success)
    } else {
        OutputFormatter::error(&format!(
            "Moved {}, failed {}:",
            plural(report.moved),
            report.failures.len()
        ));
        for (path, reason) in &report.failures {
            OutputFormatter::error(&format!("  {}: {}", path.display(), reason));
        }
        Ok(RunStatus::PartialFailure)
    }
}

/// Prints where every file would go, without mutating anything. Files
/// already at their computed destination are reported as in place, the
/// same way the real run skips them.
fn dry_run(sorter: &Sorter, assignments: &[(PathBuf, String)]) {
    OutputFormatter::dry_run_notice(&format!(
        "Analyzing {} for {}",
        plural(assignments.len()),
        sorter.dest_root().display()
    ));

    if assignments.is_empty() {
        OutputFormatter::plain("No files found to sort.");
        return;
    }

    let report = preview_report(sorter, assignments);
    for (file, bucket) in assignments {
        if sorter
            .planned_destination_for(file, bucket)
            .is_ok_and(|dest| dest == *file)
        {
            continue;
        }
        OutputFormatter::plain(&format!(" - {} → {}/", display_name(file), bucket));
    }

    OutputFormatter::summary_table(&report.bucket_counts, assignments.len() - report.skipped);
    if report.skipped > 0 {
        OutputFormatter::plain(&format!("Already in place: {}", report.skipped));
    }
    OutputFormatter::dry_run_notice("No files were modified.");
}

/// Tallies what a run over these assignments would do, applying the
/// same already-in-place skip as the move loop.
fn preview_report(sorter: &Sorter, assignments: &[(PathBuf, String)]) -> SortReport {
    let mut report = SortReport::default();
    for (file, bucket) in assignments {
        if sorter
            .planned_destination_for(file, bucket)
            .is_ok_and(|dest| dest == *file)
        {
            report.skipped += 1;
        } else {
            *report.bucket_counts.entry(bucket.clone()).or_insert(0) += 1;
        }
    }
    report
}

/// The undo path: reverse the recorded run and report on it.
fn undo_run(cli: &Cli) -> Result<RunStatus, String> {
    OutputFormatter::info("Undoing previous sorting run...");

    let report = UndoManager::undo(&cli.path).map_err(|e| e.to_string())?;

    OutputFormatter::success(&format!("Restored: {}", report.restored_files));

    for (path, reason) in &report.skipped_files {
        OutputFormatter::warning(&format!("Skipped {}: {}", path.display(), reason));
    }
    for (path, reason) in &report.failed_restores {
        OutputFormatter::error(&format!("Failed {}: {}", path.display(), reason));
    }

    if report.is_complete_success() {
        Ok(RunStatus::Success)
    } else {
        if !report.failed_restores.is_empty() {
            OutputFormatter::warning("History file was kept; fix the issues and retry.");
        }
        Ok(RunStatus::PartialFailure)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(count: usize) -> String {
    if count == 1 {
        "1 file".to_string()
    } else {
        format!("{} files", count)
    }
}
