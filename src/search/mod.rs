//! # Content Search
//!
//! Parallel literal or regular-expression search over file contents.
//!
//! ## Overview
//!
//! [`FileSearch`] pulls files from a [`FileIterator`](crate::FileIterator),
//! hands them to a pool of worker threads and reports [`SearchEvent`]s:
//! batches of [`SearchResultItem`]s, skipped files, and progress. Files that
//! cannot be read are skipped and reported; they never abort the search.
//!
//! ## Flags
//!
//! | Flag | Effect |
//! |------|--------|
//! | [`FindFlags::CASE_SENSITIVE`] | exact case |
//! | [`FindFlags::WHOLE_WORDS`] | neighbors of a match must not be word characters |
//! | [`FindFlags::REGULAR_EXPRESSION`] | the term is a regex; capture groups are recorded |
//! | [`FindFlags::PRESERVE_CASE`] | replacements copy the capitalization of the match |
//!
//! ## Results
//!
//! Matches never overlap: scanning resumes after the end of each match. Line
//! numbers start at 1, columns at 0, and both columns and lengths count chars.
//!
//! ```rust
//! use devpath::{FileSearch, FilePath, FindFlags, SearchParameters};
//!
//! let search = FileSearch::new(SearchParameters::new("foo", FindFlags::empty())).unwrap();
//! let hits = search.search_text(&FilePath::from_string("/doc.txt"), "Foo bar foofoo");
//! let columns: Vec<usize> = hits.iter().map(|h| h.column).collect();
//! assert_eq!(columns, [0, 8, 11]);
//! ```

mod codec;
mod engine;
mod matcher;
mod replace;

pub use codec::{codec_for_name, Latin1Codec, TextCodec, Utf16Codec, Utf8Codec};
pub use engine::{FileSearch, SearchHandle};
pub use replace::{expand_replacement_template, match_case_replacement};

use crate::{FilePath, FsError};

/// Search options as a bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FindFlags(u32);

impl FindFlags {
    /// Match case exactly.
    pub const CASE_SENSITIVE: Self = Self(1 << 0);
    /// Only match whole words.
    pub const WHOLE_WORDS: Self = Self(1 << 1);
    /// Treat the term as a regular expression.
    pub const REGULAR_EXPRESSION: Self = Self(1 << 2);
    /// Make replacements follow the capitalization of the matched text.
    pub const PRESERVE_CASE: Self = Self(1 << 3);

    /// No flags.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bits.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns `true` if every flag in `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for FindFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for FindFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Display lines longer than this many chars are clipped.
pub const MAX_LINE_LENGTH: usize = 400;

/// What to search for and how to run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchParameters {
    /// The literal text or pattern.
    pub term: String,
    /// Matching options.
    pub flags: FindFlags,
    /// Worker threads; defaults to the available parallelism.
    pub threads: usize,
    /// Results are delivered in batches of at most this many items.
    pub batch_size: usize,
    /// Display copies of lines are clipped to this many chars.
    pub max_line_length: usize,
}

impl SearchParameters {
    /// Parameters with default threading and batching.
    pub fn new(term: impl Into<String>, flags: FindFlags) -> Self {
        Self {
            term: term.into(),
            flags,
            threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            batch_size: 200,
            max_line_length: MAX_LINE_LENGTH,
        }
    }

    /// Use `threads` workers (at least one).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Deliver results in batches of `batch_size` (at least one).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// One match.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchResultItem {
    /// File containing the match.
    pub path: FilePath,
    /// Line number, starting at 1.
    pub line: usize,
    /// Offset of the match in chars, starting at 0.
    pub column: usize,
    /// Length of the match in chars.
    pub length: usize,
    /// The line for display: clipped, with control characters replaced by `?`.
    pub line_text: String,
    /// The matched text followed by the regex capture groups.
    pub captures: Vec<String>,
    /// Flags the search ran with.
    pub flags: FindFlags,
}

impl SearchResultItem {
    /// The exact text that matched.
    pub fn matched_text(&self) -> &str {
        self.captures.first().map_or("", String::as_str)
    }

    /// Text to substitute for this match.
    ///
    /// Regex searches expand back-references in `template`; with
    /// [`FindFlags::PRESERVE_CASE`] the capitalization of the match carries over.
    pub fn replacement_text(&self, template: &str) -> String {
        let text = if self.flags.contains(FindFlags::REGULAR_EXPRESSION) {
            expand_replacement_template(template, &self.captures)
        } else {
            template.to_string()
        };
        if self.flags.contains(FindFlags::PRESERVE_CASE) {
            return match_case_replacement(self.matched_text(), &text);
        }
        text
    }
}

/// Copy of `line` fit for display.
pub(crate) fn display_line(line: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(line.len().min(max_chars * 4));
    for (index, c) in line.chars().enumerate() {
        if index == max_chars {
            out.push('…');
            break;
        }
        out.push(if c.is_control() && !c.is_whitespace() { '?' } else { c });
    }
    out
}

/// Reported while a search runs.
#[derive(Debug)]
pub enum SearchEvent {
    /// A batch of matches.
    Results(Vec<SearchResultItem>),
    /// A file could not be searched.
    FileSkipped {
        /// The file.
        path: FilePath,
        /// Why it was skipped.
        error: FsError,
    },
    /// File discovery progressed.
    Progress {
        /// Current value.
        value: usize,
        /// Value at completion.
        max: usize,
    },
}

/// Totals of a finished search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchSummary {
    /// Files whose content was scanned.
    pub files_searched: usize,
    /// Files skipped because they could not be read.
    pub files_skipped: usize,
    /// Matches found.
    pub matches: usize,
    /// Whether the search stopped early.
    pub cancelled: bool,
}
