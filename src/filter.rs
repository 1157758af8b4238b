//! Include/exclude glob filtering for directory walks.
//!
//! A [`FileFilter`] accepts a file when at least one include pattern matches it
//! (or there are no include patterns) and no exclude pattern does. Each pattern
//! is tried against the bare file name and against the full path, ignoring
//! case, and `*` also crosses `/`, so `*/build/*` excludes every build tree.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::{FilePath, FsError};

/// Glob-based file selection.
///
/// ```rust
/// use devpath::{FileFilter, FilePath};
///
/// let filter = FileFilter::new(&["*.rs", "Cargo.toml"], &["*/target/*"]).unwrap();
/// assert!(filter.matches(&FilePath::from_string("/src/lib.rs")));
/// assert!(filter.matches(&FilePath::from_string("/CARGO.TOML")));
/// assert!(!filter.matches(&FilePath::from_string("/target/debug/build.rs")));
/// assert!(!filter.matches(&FilePath::from_string("/README.md")));
/// ```
#[derive(Debug, Clone)]
pub struct FileFilter {
    includes: Vec<String>,
    excludes: Vec<String>,
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
    hidden: bool,
}

fn build_set(patterns: &[String]) -> Result<Option<GlobSet>, FsError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(false)
            .backslash_escape(false)
            .build()
            .map_err(|e| FsError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map(Some).map_err(|e| FsError::InvalidPattern {
        pattern: patterns.join(","),
        reason: e.to_string(),
    })
}

/// Split comma-separated filter text as typed by a user, e.g. `"*.h, *.cpp"`.
pub fn split_filter_text(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl FileFilter {
    /// Accept everything, hidden files included.
    pub fn all() -> Self {
        Self {
            includes: Vec::new(),
            excludes: Vec::new(),
            include_set: None,
            exclude_set: None,
            hidden: true,
        }
    }

    /// Compile include and exclude patterns.
    ///
    /// # Errors
    ///
    /// [`FsError::InvalidPattern`] for a malformed glob.
    pub fn new<S: AsRef<str>>(includes: &[S], excludes: &[S]) -> Result<Self, FsError> {
        let includes: Vec<String> = includes.iter().map(|s| s.as_ref().to_string()).collect();
        let excludes: Vec<String> = excludes.iter().map(|s| s.as_ref().to_string()).collect();
        Ok(Self {
            include_set: build_set(&includes)?,
            exclude_set: build_set(&excludes)?,
            includes,
            excludes,
            hidden: true,
        })
    }

    /// Compile comma-separated include and exclude lists.
    pub fn from_text(includes: &str, excludes: &str) -> Result<Self, FsError> {
        Self::new(&split_filter_text(includes), &split_filter_text(excludes))
    }

    /// Whether hidden files and directories are walked. Defaults to `true`.
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Returns `true` if hidden entries are included.
    pub fn includes_hidden(&self) -> bool {
        self.hidden
    }

    /// The include patterns.
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// The exclude patterns.
    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    /// Decide whether `path` is part of the result.
    pub fn matches(&self, path: &FilePath) -> bool {
        let name = path.file_name();
        let full = path.path();
        let hit = |set: &GlobSet| set.is_match(name) || set.is_match(full);
        self.include_set.as_ref().is_none_or(hit) && !self.exclude_set.as_ref().is_some_and(hit)
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> FilePath {
        FilePath::from_string(s)
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = FileFilter::all();
        assert!(filter.matches(&p("/a/b.txt")));
        assert!(filter.includes_hidden());
    }

    #[test]
    fn include_matches_name_case_insensitively() {
        let filter = FileFilter::new(&["*.CPP"], &[]).unwrap();
        assert!(filter.matches(&p("/x/main.cpp")));
        assert!(!filter.matches(&p("/x/main.c")));
    }

    #[test]
    fn exclude_wins_over_include() {
        let filter = FileFilter::new(&["*.rs"], &["*_test.rs"]).unwrap();
        assert!(filter.matches(&p("/src/lib.rs")));
        assert!(!filter.matches(&p("/src/lib_test.rs")));
    }

    #[test]
    fn patterns_also_match_full_path() {
        let filter = FileFilter::new(&["/src/*"], &["*/generated/*"]).unwrap();
        assert!(filter.matches(&p("/src/deep/file.rs")));
        assert!(!filter.matches(&p("/src/generated/file.rs")));
        assert!(!filter.matches(&p("/docs/file.rs")));
    }

    #[test]
    fn text_lists_are_split_and_trimmed() {
        assert_eq!(split_filter_text(" *.h, *.cpp ,,"), ["*.h", "*.cpp"]);
        let filter = FileFilter::from_text("*.h, *.cpp", "").unwrap();
        assert_eq!(filter.includes().len(), 2);
        assert!(filter.excludes().is_empty());
    }

    #[test]
    fn bad_pattern_is_reported() {
        let err = FileFilter::new(&["a[b"], &[]).unwrap_err();
        assert!(matches!(err, FsError::InvalidPattern { .. }));
    }
}
