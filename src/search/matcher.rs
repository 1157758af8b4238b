//! Per-line literal and regular-expression matching.

use regex::{Regex, RegexBuilder};

use super::FindFlags;
use crate::{CancellationToken, FsError};

/// One match inside a line. Offsets count chars, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LineMatch {
    pub column: usize,
    pub length: usize,
    /// Whole match first, then each capture group (empty when it did not participate).
    pub captures: Vec<String>,
}

#[derive(Debug)]
enum Kind {
    Literal { needle: Vec<char>, case_sensitive: bool },
    Regex(Regex),
}

/// Compiled search term.
#[derive(Debug)]
pub(crate) struct Matcher {
    kind: Kind,
    whole_words: bool,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

impl Matcher {
    pub fn new(term: &str, flags: FindFlags) -> Result<Self, FsError> {
        let case_sensitive = flags.contains(FindFlags::CASE_SENSITIVE);
        let whole_words = flags.contains(FindFlags::WHOLE_WORDS);
        let kind = if flags.contains(FindFlags::REGULAR_EXPRESSION) {
            let pattern = if whole_words {
                format!(r"\b(?:{term})\b")
            } else {
                term.to_string()
            };
            let regex = RegexBuilder::new(&pattern)
                .case_insensitive(!case_sensitive)
                .build()
                .map_err(|e| FsError::InvalidPattern {
                    pattern: term.to_string(),
                    reason: e.to_string(),
                })?;
            Kind::Regex(regex)
        } else {
            let needle = if case_sensitive {
                term.chars().collect()
            } else {
                term.chars().map(fold).collect()
            };
            Kind::Literal { needle, case_sensitive }
        };
        Ok(Self { kind, whole_words })
    }

    /// Returns `true` if the term can never match anything.
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            Kind::Literal { needle, .. } => needle.is_empty(),
            Kind::Regex(_) => false,
        }
    }

    /// All non-overlapping matches in `line`, left to right.
    pub fn find_in_line(&self, line: &str) -> Vec<LineMatch> {
        match &self.kind {
            Kind::Literal { needle, case_sensitive } => {
                self.find_literal(line, needle, *case_sensitive)
            }
            Kind::Regex(regex) => Self::find_regex(line, regex),
        }
    }

    fn find_literal(&self, line: &str, needle: &[char], case_sensitive: bool) -> Vec<LineMatch> {
        let mut found = Vec::new();
        let (Some(&first), Some(&last)) = (needle.first(), needle.last()) else {
            return found;
        };
        let original: Vec<char> = line.chars().collect();
        let hay: Vec<char> = if case_sensitive {
            original.clone()
        } else {
            original.iter().copied().map(fold).collect()
        };
        let n = needle.len();
        if hay.len() < n {
            return found;
        }

        let mut i = 0;
        while i + n <= hay.len() {
            // Check both ends before comparing the window.
            let hit = hay[i] == first && hay[i + n - 1] == last && hay[i..i + n] == *needle;
            if hit && (!self.whole_words || Self::is_whole_word(&original, i, n)) {
                found.push(LineMatch {
                    column: i,
                    length: n,
                    captures: vec![original[i..i + n].iter().collect()],
                });
                i += n;
            } else {
                i += 1;
            }
        }
        found
    }

    fn is_whole_word(chars: &[char], start: usize, len: usize) -> bool {
        let before_ok = start == 0 || !is_word_char(chars[start - 1]);
        let after_ok = chars.get(start + len).is_none_or(|c| !is_word_char(*c));
        before_ok && after_ok
    }

    fn find_regex(line: &str, regex: &Regex) -> Vec<LineMatch> {
        let mut found = Vec::new();
        let mut pos = 0;
        // Char count of line[..counted_bytes], advanced incrementally.
        let mut counted_bytes = 0;
        let mut counted_chars = 0;
        while pos <= line.len() {
            let Some(caps) = regex.captures_at(line, pos) else {
                break;
            };
            let Some(whole) = caps.get(0) else {
                break;
            };
            counted_chars += line[counted_bytes..whole.start()].chars().count();
            counted_bytes = whole.start();
            found.push(LineMatch {
                column: counted_chars,
                length: whole.as_str().chars().count(),
                captures: caps
                    .iter()
                    .map(|g| g.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect(),
            });
            pos = if whole.end() > whole.start() {
                whole.end()
            } else {
                // Step over one char so an empty match cannot repeat.
                match line[whole.end()..].chars().next() {
                    Some(c) => whole.end() + c.len_utf8(),
                    None => break,
                }
            };
        }
        found
    }

    /// Matches for every line of `text`, as `(line number from 1, line, match)`.
    ///
    /// Blocks between lines while `cancel` is paused. When it fires mid-way the
    /// lines already scanned keep their matches and `complete` is unset.
    pub fn find_in_text<'t>(&self, text: &'t str, cancel: &CancellationToken) -> TextMatches<'t> {
        self.find_lines_while(text, || cancel.wait_while_paused())
    }

    fn find_lines_while<'t>(
        &self,
        text: &'t str,
        mut go_on: impl FnMut() -> bool,
    ) -> TextMatches<'t> {
        let mut hits = Vec::new();
        for (index, line) in text.split('\n').enumerate() {
            if !go_on() {
                return TextMatches { hits, complete: false };
            }
            let line = line.strip_suffix('\r').unwrap_or(line);
            for m in self.find_in_line(line) {
                hits.push((index + 1, line, m));
            }
        }
        TextMatches { hits, complete: true }
    }
}

/// Result of [`Matcher::find_in_text`].
#[derive(Debug)]
pub(crate) struct TextMatches<'t> {
    pub hits: Vec<(usize, &'t str, LineMatch)>,
    /// `false` when cancellation stopped the scan before the last line.
    pub complete: bool,
}
