//! Name-similarity grouping, the alternative to rule-based buckets.
//!
//! Instead of routing files by extension, `--group` derives bucket
//! folders from the file names themselves: files whose stems share a
//! sufficiently long common fragment land together in a folder named
//! after that fragment. Files with no partner fall back to
//! [`MISC_BUCKET`].

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Bucket for files that share no name fragment with any other file.
pub const MISC_BUCKET: &str = "Miscellaneous";

/// Minimum length of a shared fragment for two names to group.
const MIN_COMMON_LEN: usize = 4;

/// A fragment only counts when it carries a run of at least four
/// alphanumeric characters, so separator runs like `----` do not form
/// groups.
static MEANINGFUL_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("[a-zA-Z0-9]{4,}").expect("static fragment pattern is valid")
});

/// Assigns every file a bucket derived from shared name fragments.
///
/// Repeatedly finds the shared fragment covering the most files (ties
/// broken by longer, then lexicographically later fragments), peels
/// that group off, and continues with the remainder. Leftover files go
/// to [`MISC_BUCKET`]. The assignment is deterministic for a given
/// input order.
pub fn assign_groups(files: &[PathBuf]) -> Vec<(PathBuf, String)> {
    let stems: Vec<String> = files.iter().map(|p| stem_lower(p)).collect();

    let mut remaining: Vec<usize> = (0..files.len()).collect();
    let mut assignments = Vec::with_capacity(files.len());

    while !remaining.is_empty() {
        let groups = build_groups(&stems, &remaining);
        let Some((fragment, members)) = pick_largest(groups) else {
            for &i in &remaining {
                assignments.push((files[i].clone(), MISC_BUCKET.to_string()));
            }
            break;
        };

        let folder = sanitize_folder_name(&fragment);
        for &i in &members {
            assignments.push((files[i].clone(), folder.clone()));
        }
        remaining.retain(|i| !members.contains(i));
    }

    assignments
}

/// Collects every qualifying shared fragment over the remaining files,
/// mapped to the set of files exhibiting it.
fn build_groups(stems: &[String], remaining: &[usize]) -> BTreeMap<String, BTreeSet<usize>> {
    let mut groups: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();

    for (pos, &i) in remaining.iter().enumerate() {
        for &j in &remaining[pos + 1..] {
            if let Some(fragment) = common_name_fragment(&stems[i], &stems[j]) {
                let members = groups.entry(fragment).or_default();
                members.insert(i);
                members.insert(j);
            }
        }
    }

    groups
}

/// Picks the group covering the most files. Ties go to the longer
/// fragment; remaining ties resolve through the sorted map order.
fn pick_largest(
    groups: BTreeMap<String, BTreeSet<usize>>,
) -> Option<(String, BTreeSet<usize>)> {
    groups
        .into_iter()
        .max_by_key(|(fragment, members)| (members.len(), fragment.len()))
}

/// The longest fragment two stems share, when it is long enough and
/// meaningful.
fn common_name_fragment(a: &str, b: &str) -> Option<String> {
    let fragment = longest_common_fragment(a, b);
    let long_enough = fragment.chars().count() >= MIN_COMMON_LEN;
    (long_enough && MEANINGFUL_FRAGMENT.is_match(&fragment)).then_some(fragment)
}

/// Longest common substring of two strings, by characters. Returns the
/// earliest occurrence in `a` when several have the same length.
fn longest_common_fragment(a: &str, b: &str) -> String {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut best_len = 0;
    let mut best_end = 0;
    let mut prev = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        let mut current = vec![0usize; b.len() + 1];
        for j in 1..=b.len() {
            if a[i - 1] == b[j - 1] {
                current[j] = prev[j - 1] + 1;
                if current[j] > best_len {
                    best_len = current[j];
                    best_end = i;
                }
            }
        }
        prev = current;
    }

    a[best_end - best_len..best_end].iter().collect()
}

/// Turns a fragment into a usable folder name: trims whitespace and
/// replaces characters that are invalid in folder names.
fn sanitize_folder_name(fragment: &str) -> String {
    fragment
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | '"' | '/' | '\\' | '|' | '?' | '*' | ':' => '_',
            other => other,
        })
        .collect()
}

fn stem_lower(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
