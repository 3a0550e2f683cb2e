//! sortbox - move files into destination folders by extension rules
//!
//! This library sorts the regular files of a source directory into bucket
//! subfolders chosen by an extension-to-folder rule set, with dry-run
//! previews, TOML-configured rules and filters, deterministic collision
//! handling, an optional name-similarity grouping mode, and undo of the
//! previous run.

pub mod cli;
pub mod config;
pub mod grouping;
pub mod output;
pub mod rules;
pub mod sorter;
pub mod undo;

pub use config::{CompiledFilters, Config, ConfigError};
pub use grouping::{MISC_BUCKET, assign_groups};
pub use rules::{NO_EXTENSION_BUCKET, OTHER_BUCKET, RuleError, RuleSet};
pub use sorter::{MoveOutcome, Operation, OperationLog, SortError, SortReport, Sorter};
pub use undo::{UndoManager, UndoReport};

pub use cli::{Cli, RunStatus, run};
