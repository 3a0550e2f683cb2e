//! Extension-to-folder rule sets.
//!
//! A [`RuleSet`] maps a classification key (the lowercase file extension,
//! without the leading dot) to a destination folder name. Files with no
//! extension route to [`NO_EXTENSION_BUCKET`]; files whose key matches no
//! rule route to [`OTHER_BUCKET`].
//!
//! # Examples
//!
//! ```
//! use sortbox::rules::RuleSet;
//! use std::path::Path;
//!
//! let mut rules = RuleSet::empty();
//! rules.insert("txt", "Text").unwrap();
//! assert_eq!(rules.classify(Path::new("notes.txt")), "Text");
//! assert_eq!(rules.classify(Path::new("notes.TXT")), "Text");
//! assert_eq!(rules.classify(Path::new("blob.bin")), "Other");
//! assert_eq!(rules.classify(Path::new("Makefile")), "NoExtension");
//! ```

use std::collections::HashMap;
use std::path::Path;

/// Destination folder for files whose key matches no rule.
pub const OTHER_BUCKET: &str = "Other";

/// Destination folder for files without an extension.
pub const NO_EXTENSION_BUCKET: &str = "NoExtension";

/// Errors raised while building a rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// Two rules share the same key after lowercasing.
    DuplicateKey(String),
    /// A destination folder name is empty or contains a path separator.
    InvalidFolderName(String),
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleError::DuplicateKey(key) => {
                write!(f, "Duplicate rule for extension '{}'", key)
            }
            RuleError::InvalidFolderName(name) => {
                write!(f, "Invalid destination folder name '{}'", name)
            }
        }
    }
}

impl std::error::Error for RuleError {}

/// An immutable-after-construction mapping from extension key to folder name.
///
/// Keys are stored lowercase, so matching is case-insensitive. Keys are
/// unique: inserting a second rule for the same key is an error rather
/// than a silent overwrite.
#[derive(Debug, Clone)]
pub struct RuleSet {
    map: HashMap<String, String>,
}

impl RuleSet {
    /// Creates a rule set with no rules. Every file with an extension
    /// classifies to [`OTHER_BUCKET`].
    pub fn empty() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Builds a rule set from `(extension, folder)` pairs, validating
    /// uniqueness and folder names.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut rules = Self::empty();
        for (key, folder) in pairs {
            rules.insert(key.as_ref(), folder.as_ref())?;
        }
        Ok(rules)
    }

    /// Adds a single rule. The key is lowercased; a leading dot is
    /// stripped so both `"txt"` and `".txt"` are accepted.
    pub fn insert(&mut self, extension: &str, folder: &str) -> Result<(), RuleError> {
        if folder.is_empty() || folder.contains('/') || folder.contains('\\') {
            return Err(RuleError::InvalidFolderName(folder.to_string()));
        }
        let key = extension.trim_start_matches('.').to_lowercase();
        if self.map.contains_key(&key) {
            return Err(RuleError::DuplicateKey(key));
        }
        self.map.insert(key, folder.to_string());
        Ok(())
    }

    /// Returns the number of rules in the set.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the set contains no rules.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Computes the classification key for a path: the lowercase
    /// extension, or `None` for files without one.
    pub fn classification_key(path: &Path) -> Option<String> {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Looks up the folder for an already-computed key, falling back to
    /// [`OTHER_BUCKET`].
    pub fn folder_for_key(&self, key: &str) -> &str {
        self.map
            .get(&key.to_lowercase())
            .map(String::as_str)
            .unwrap_or(OTHER_BUCKET)
    }

    /// Returns the destination folder name for a file path.
    ///
    /// Files without an extension always classify to
    /// [`NO_EXTENSION_BUCKET`], regardless of the rule set contents.
    pub fn classify(&self, path: &Path) -> &str {
        match Self::classification_key(path) {
            None => NO_EXTENSION_BUCKET,
            Some(key) => self.folder_for_key(&key),
        }
    }
}

impl Default for RuleSet {
    /// The built-in rule set, covering common media, document, archive,
    /// and source-file extensions.
    fn default() -> Self {
        let mut rules = Self::empty();
        let defaults: &[(&str, &[&str])] = &[
            (
                "Images",
                &[
                    "png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "tiff", "ico", "heic",
                ],
            ),
            (
                "Videos",
                &[
                    "mp4", "mkv", "avi", "mov", "flv", "wmv", "webm", "m4v", "mpg", "mpeg", "3gp",
                ],
            ),
            ("Audio", &["mp3", "wav", "ogg", "flac", "aac", "m4a", "wma"]),
            (
                "Documents",
                &["pdf", "txt", "doc", "docx", "md", "rtf", "odt", "html", "htm"],
            ),
            ("Archives", &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"]),
            (
                "Code",
                &[
                    "py", "rs", "js", "ts", "c", "cpp", "h", "java", "go", "sh", "json", "xml",
                    "yaml", "yml", "toml",
                ],
            ),
            ("Spreadsheets", &["csv", "xls", "xlsx", "ods"]),
            ("Presentations", &["ppt", "pptx", "odp"]),
            ("Fonts", &["ttf", "otf", "woff", "woff2"]),
        ];

        for (folder, extensions) in defaults {
            for ext in *extensions {
                // Static table, keys are distinct by construction.
                rules
                    .insert(ext, folder)
                    .expect("built-in rule table contains a duplicate key");
            }
        }
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        let rules = RuleSet::from_pairs([("txt", "Text"), ("jpg", "Images")]).unwrap();
        assert_eq!(rules.classify(Path::new("a.txt")), "Text");
        assert_eq!(rules.classify(Path::new("b.jpg")), "Images");
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let rules = RuleSet::from_pairs([("txt", "Text")]).unwrap();
        assert_eq!(rules.classify(Path::new("a.TXT")), "Text");
        assert_eq!(rules.classify(Path::new("a.Txt")), "Text");
    }

    #[test]
    fn test_unmatched_extension_goes_to_other() {
        let rules = RuleSet::from_pairs([("txt", "Text")]).unwrap();
        assert_eq!(rules.classify(Path::new("a.xyz")), OTHER_BUCKET);
    }

    #[test]
    fn test_no_extension_goes_to_no_extension_bucket() {
        let rules = RuleSet::from_pairs([("txt", "Text")]).unwrap();
        assert_eq!(rules.classify(Path::new("README")), NO_EXTENSION_BUCKET);
    }

    #[test]
    fn test_no_extension_wins_over_empty_rule_set() {
        let rules = RuleSet::empty();
        assert_eq!(rules.classify(Path::new("README")), NO_EXTENSION_BUCKET);
        assert_eq!(rules.classify(Path::new("a.txt")), OTHER_BUCKET);
    }

    #[test]
    fn test_insert_strips_leading_dot() {
        let mut rules = RuleSet::empty();
        rules.insert(".txt", "Text").unwrap();
        assert_eq!(rules.classify(Path::new("a.txt")), "Text");
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut rules = RuleSet::empty();
        rules.insert("txt", "Text").unwrap();
        let err = rules.insert("TXT", "Docs").unwrap_err();
        assert_eq!(err, RuleError::DuplicateKey("txt".to_string()));
    }

    #[test]
    fn test_invalid_folder_name_rejected() {
        let mut rules = RuleSet::empty();
        assert!(matches!(
            rules.insert("txt", ""),
            Err(RuleError::InvalidFolderName(_))
        ));
        assert!(matches!(
            rules.insert("txt", "a/b"),
            Err(RuleError::InvalidFolderName(_))
        ));
    }

    #[test]
    fn test_default_rule_set_covers_common_types() {
        let rules = RuleSet::default();
        assert_eq!(rules.classify(Path::new("photo.png")), "Images");
        assert_eq!(rules.classify(Path::new("clip.mkv")), "Videos");
        assert_eq!(rules.classify(Path::new("song.mp3")), "Audio");
        assert_eq!(rules.classify(Path::new("paper.pdf")), "Documents");
        assert_eq!(rules.classify(Path::new("backup.zip")), "Archives");
        assert_eq!(rules.classify(Path::new("main.rs")), "Code");
    }

    #[test]
    fn test_dotfile_has_no_extension() {
        // Path::extension treats ".bashrc" as extensionless.
        let rules = RuleSet::default();
        assert_eq!(rules.classify(Path::new(".bashrc")), NO_EXTENSION_BUCKET);
    }
}
