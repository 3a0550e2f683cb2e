//! TOML configuration: sorting rules and file filtering.
//!
//! Configuration drives two things: the extension-to-folder rule set and
//! the filtering rules deciding which files the sorter considers at all.
//!
//! # Configuration File Format
//!
//! ```toml
//! [rules]
//! txt = "Text"
//! jpg = "Images"
//!
//! [filters]
//! include_hidden = false
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db"]
//! patterns = ["*.tmp"]
//! extensions = ["bak"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```
//!
//! Omitting `[rules]` selects the built-in default rule set. An explicit
//! empty `[rules]` table routes every file to the fallback buckets.

use crate::rules::{RuleError, RuleSet};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors raised while loading or compiling configuration. All of these
/// are fatal at startup: no files are touched when configuration is bad.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    ConfigInvalid(String),
    /// A rule is malformed (duplicate key or bad folder name).
    RuleInvalid(RuleError),
    /// Invalid glob pattern in the filter rules.
    InvalidGlobPattern(String),
    /// Invalid regex pattern in the filter rules.
    InvalidRegexPattern { pattern: String, reason: String },
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::RuleInvalid(err) => write!(f, "Invalid rule: {}", err),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(f, "Invalid glob pattern '{}'", pattern)
            }
            ConfigError::InvalidRegexPattern { pattern, reason } => {
                write!(f, "Invalid regex pattern '{}': {}", pattern, reason)
            }
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<RuleError> for ConfigError {
    fn from(err: RuleError) -> Self {
        ConfigError::RuleInvalid(err)
    }
}

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Extension-to-folder rules as ordered pairs. `None` means "use the
    /// built-in set".
    pub rules: Option<Vec<(String, String)>>,

    /// File filtering rules.
    pub filters: FilterRules,
}

/// File filtering rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to sort hidden files (names starting with "."). Defaults
    /// to false.
    #[serde(default)]
    pub include_hidden: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Whitelist rules that override exclusions.
    #[serde(default)]
    pub include: IncludeRules,
}

/// Rules for excluding files from sorting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns to exclude (e.g., "*.tmp").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude (e.g., "bak", "tmp").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the filename.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Whitelist rules, overriding exclude rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Config {
    /// Loads configuration, with fallback to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, when provided (missing file is an error here)
    /// 2. `.sortboxrc.toml` in the current directory
    /// 3. `~/.config/sortbox/config.toml`
    /// 4. Built-in defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".sortboxrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("sortbox")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Loads configuration from a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        // [rules] is deserialized as a TOML table first, then flattened
        // into pairs so duplicate keys (after lowercasing) surface as a
        // rule error rather than a silent overwrite.
        #[derive(Deserialize)]
        struct RawConfig {
            #[serde(default)]
            rules: Option<toml::Table>,
            #[serde(default)]
            filters: Option<FilterRules>,
        }

        let raw: RawConfig =
            toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;

        let rules = match raw.rules {
            None => None,
            Some(table) => {
                let mut pairs = Vec::with_capacity(table.len());
                for (key, value) in table {
                    let folder = value.as_str().ok_or_else(|| {
                        ConfigError::ConfigInvalid(format!(
                            "rule '{}' must map to a folder name string",
                            key
                        ))
                    })?;
                    pairs.push((key, folder.to_string()));
                }
                Some(pairs)
            }
        };

        Ok(Self {
            rules,
            filters: raw.filters.unwrap_or_default(),
        })
    }

    /// Builds the rule set described by this configuration, validating
    /// key uniqueness and folder names.
    pub fn build_rules(&self) -> Result<RuleSet, ConfigError> {
        match &self.rules {
            None => Ok(RuleSet::default()),
            Some(pairs) => {
                let mut rules = RuleSet::empty();
                for (key, folder) in pairs {
                    rules.insert(key, folder)?;
                }
                Ok(rules)
            }
        }
    }

    /// Compiles the filter rules into matchers.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Pre-compiled filter matchers, built once per run.
pub struct CompiledFilters {
    include_hidden: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let compile_globs = |patterns: &[String]| -> Result<Vec<Pattern>, ConfigError> {
            patterns
                .iter()
                .map(|pattern| {
                    Pattern::new(pattern)
                        .map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
                })
                .collect()
        };

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_hidden: rules.include_hidden,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
        })
    }

    /// Decides whether a file takes part in sorting.
    ///
    /// Checks run in order with early termination:
    /// 1. Include patterns (whitelist) always win
    /// 2. Hidden files are skipped unless enabled
    /// 3. Exact filename exclusions
    /// 4. Extension exclusions (case-insensitive)
    /// 5. Exclude glob patterns
    /// 6. Exclude regex patterns against the filename
    /// 7. Included by default
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self
            .include_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
        {
            return true;
        }

        if !self.include_hidden && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
        {
            return false;
        }

        if self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
        {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::OTHER_BUCKET;

    #[test]
    fn test_default_config_uses_builtin_rules() {
        let config = Config::default();
        let rules = config.build_rules().unwrap();
        assert!(!rules.is_empty());
        assert_eq!(rules.classify(Path::new("a.png")), "Images");
    }

    #[test]
    fn test_parse_rules_table() {
        let config = Config::parse(
            r#"
            [rules]
            txt = "Text"
            jpg = "Images"
            "#,
        )
        .unwrap();
        let rules = config.build_rules().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.classify(Path::new("a.txt")), "Text");
        assert_eq!(rules.classify(Path::new("a.pdf")), OTHER_BUCKET);
    }

    #[test]
    fn test_parse_empty_rules_table_means_no_rules() {
        let config = Config::parse("[rules]\n").unwrap();
        let rules = config.build_rules().unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_missing_rules_table_means_defaults() {
        let config = Config::parse("").unwrap();
        let rules = config.build_rules().unwrap();
        assert!(!rules.is_empty());
    }

    #[test]
    fn test_duplicate_rule_keys_rejected() {
        let config = Config::parse(
            r#"
            [rules]
            txt = "Text"
            TXT = "Docs"
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.build_rules(),
            Err(ConfigError::RuleInvalid(_))
        ));
    }

    #[test]
    fn test_non_string_rule_value_rejected() {
        let result = Config::parse("[rules]\ntxt = 3\n");
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let result = Config::parse("[rules\ntxt = ");
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_hidden_files_excluded_by_default() {
        let filters = Config::default().compile_filters().unwrap();
        assert!(!filters.should_include(Path::new(".DS_Store")));
        assert!(filters.should_include(Path::new("image.jpg")));
    }

    #[test]
    fn test_hidden_files_included_when_enabled() {
        let config = Config::parse("[filters]\ninclude_hidden = true\n").unwrap();
        let filters = config.compile_filters().unwrap();
        assert!(filters.should_include(Path::new(".DS_Store")));
    }

    #[test]
    fn test_exclude_exact_filename() {
        let config = Config::parse(
            r#"
            [filters.exclude]
            filenames = ["Thumbs.db"]
            "#,
        )
        .unwrap();
        let filters = config.compile_filters().unwrap();
        assert!(!filters.should_include(Path::new("Thumbs.db")));
        assert!(filters.should_include(Path::new("photo.jpg")));
    }

    #[test]
    fn test_exclude_extensions_case_insensitive() {
        let config = Config::parse(
            r#"
            [filters.exclude]
            extensions = ["bak", "tmp"]
            "#,
        )
        .unwrap();
        let filters = config.compile_filters().unwrap();
        assert!(!filters.should_include(Path::new("file.bak")));
        assert!(!filters.should_include(Path::new("file.BAK")));
        assert!(filters.should_include(Path::new("file.txt")));
    }

    #[test]
    fn test_exclude_glob_patterns() {
        let config = Config::parse(
            r#"
            [filters.exclude]
            patterns = ["*.cache"]
            "#,
        )
        .unwrap();
        let filters = config.compile_filters().unwrap();
        assert!(!filters.should_include(Path::new("data.cache")));
        assert!(filters.should_include(Path::new("data.txt")));
    }

    #[test]
    fn test_exclude_regex() {
        let config = Config::parse(
            r#"
            [filters.exclude]
            regex = ["^draft_.*"]
            "#,
        )
        .unwrap();
        let filters = config.compile_filters().unwrap();
        assert!(!filters.should_include(Path::new("draft_report.txt")));
        assert!(filters.should_include(Path::new("report.txt")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let config = Config::parse(
            r#"
            [filters.include]
            patterns = [".keepme"]
            "#,
        )
        .unwrap();
        let filters = config.compile_filters().unwrap();
        // Hidden files are skipped by default, but the whitelist wins.
        assert!(filters.should_include(Path::new(".keepme")));
        assert!(!filters.should_include(Path::new(".other")));
    }

    #[test]
    fn test_invalid_glob_pattern_is_fatal() {
        let config = Config::parse(
            r#"
            [filters.exclude]
            patterns = ["[invalid"]
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.compile_filters(),
            Err(ConfigError::InvalidGlobPattern(_))
        ));
    }

    #[test]
    fn test_invalid_regex_pattern_is_fatal() {
        let config = Config::parse(
            r#"
            [filters.exclude]
            regex = ["[invalid("]
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.compile_filters(),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));
    }

    #[test]
    fn test_load_missing_explicit_config_is_error() {
        let result = Config::load(Some(Path::new("/no/such/sortbox-config.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }
}
