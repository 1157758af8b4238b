//! The [`FilePath`] value type and its pure path algebra.
//!
//! A `FilePath` names a location either on the local machine (empty scheme) or on a
//! device reached through a registered back end (`scheme://host/path`). Everything
//! in this module is pure string manipulation; operations that touch a file system
//! live in [`crate::path_io`] and route through the [`BackendRegistry`](crate::BackendRegistry).

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::{CaseSensitivity, OsType};

/// A location on the local machine or on a device.
///
/// The `(scheme, host, path)` triple is stored packed in one buffer with the
/// scheme and host lengths recorded alongside, so a `FilePath` costs a single
/// allocation. The hash is computed on first use and memoized.
///
/// # Equality and ordering
///
/// Paths compare by `path` first, using the path's [`CaseSensitivity`], then by
/// `scheme`, then by `host` (both case-sensitive).
///
/// # Local and device paths
///
/// An empty scheme means a local path usable directly by OS calls. A non-empty
/// scheme routes all I/O through the [`BackendRegistry`](crate::BackendRegistry).
///
/// ```rust
/// use devpath::FilePath;
///
/// let p = FilePath::from_string("docker://builder/src/main.rs");
/// assert_eq!(p.scheme(), "docker");
/// assert_eq!(p.host(), "builder");
/// assert_eq!(p.path(), "/src/main.rs");
/// assert_eq!(p.file_name(), "main.rs");
/// assert_eq!(p.to_string(), "docker://builder/src/main.rs");
/// ```
#[derive(Clone, Default)]
pub struct FilePath {
    data: String,
    scheme_len: u16,
    host_len: u16,
    hash: OnceLock<u64>,
}

impl FilePath {
    /// The empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a path from its parts without any normalization.
    ///
    /// A host without a scheme is dropped: local paths have no host.
    /// Scheme and host longer than `u16::MAX` bytes yield the empty path.
    pub fn from_parts(scheme: &str, host: &str, path: &str) -> Self {
        let host = if scheme.is_empty() { "" } else { host };
        let (Ok(scheme_len), Ok(host_len)) =
            (u16::try_from(scheme.len()), u16::try_from(host.len()))
        else {
            return Self::default();
        };
        let mut data = String::with_capacity(scheme.len() + host.len() + path.len());
        data.push_str(scheme);
        data.push_str(host);
        data.push_str(path);
        Self {
            data,
            scheme_len,
            host_len,
            hash: OnceLock::new(),
        }
    }

    /// Parse a path from its canonical textual form.
    ///
    /// `scheme://host/path` produces a device path; anything else is taken as a
    /// local OS path. Parsing never fails: unusable input produces a path that is
    /// still a valid value, and empty input produces the empty path.
    ///
    /// `scheme://host/./rel` denotes the relative device path `rel`. Host names
    /// may percent-encode `/` as `%2f` and `%` as `%25`.
    pub fn from_string(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        if let Some((scheme, rest)) = split_scheme(text) {
            let (host, path) = match rest.find('/') {
                Some(pos) => rest.split_at(pos),
                None => (rest, ""),
            };
            let path = if path == "/." {
                "."
            } else {
                path.strip_prefix("/./").unwrap_or(path)
            };
            return Self::from_parts(scheme, &decode_host(host), path);
        }
        Self::from_local(text)
    }

    /// Parse user-typed input.
    ///
    /// Trims surrounding whitespace, expands a leading `~` to the home directory,
    /// converts `\` to `/` on Windows hosts, and cleans the result.
    pub fn from_user_input(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::default();
        }
        let expanded;
        let text = match text.strip_prefix('~') {
            Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => {
                match home_dir() {
                    Some(home) => {
                        expanded = format!("{home}{rest}");
                        expanded.as_str()
                    }
                    None => text,
                }
            }
            _ => text,
        };
        Self::from_string(text).clean_path()
    }

    /// Convert a standard library path into a local `FilePath`.
    pub fn from_std_path(path: &Path) -> Self {
        Self::from_local(&path.to_string_lossy())
    }

    fn from_local(text: &str) -> Self {
        if OsType::host().is_windows() && text.contains('\\') {
            Self::from_parts("", "", &text.replace('\\', "/"))
        } else {
            Self::from_parts("", "", text)
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The scheme, empty for local paths.
    #[inline]
    pub fn scheme(&self) -> &str {
        &self.data[..usize::from(self.scheme_len)]
    }

    /// The host, empty for local paths.
    #[inline]
    pub fn host(&self) -> &str {
        let start = usize::from(self.scheme_len);
        &self.data[start..start + usize::from(self.host_len)]
    }

    /// The file system path proper, `/`-separated.
    #[inline]
    pub fn path(&self) -> &str {
        &self.data[usize::from(self.scheme_len) + usize::from(self.host_len)..]
    }

    /// Returns `true` if scheme, host and path are all empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` for paths that OS calls can use directly.
    #[inline]
    pub fn is_local(&self) -> bool {
        self.scheme_len == 0
    }

    /// Path rules that apply to this path's string form.
    ///
    /// Local paths use the host rules. Device paths use Windows rules when the
    /// path starts with a drive letter and Unix rules otherwise. The OS a device
    /// reports for itself is available via [`FilePath::device_os_type`].
    pub fn os_type(&self) -> OsType {
        if self.is_local() {
            return OsType::host();
        }
        let bytes = self.path().as_bytes();
        if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
            OsType::Windows
        } else {
            OsType::Linux
        }
    }

    /// Case sensitivity used for comparing this path.
    ///
    /// Local paths follow the host OS; device paths are case-sensitive.
    pub fn case_sensitivity(&self) -> CaseSensitivity {
        if self.is_local() {
            OsType::host().case_sensitivity()
        } else {
            CaseSensitivity::Sensitive
        }
    }

    /// The path with native separators (`\` for Windows rules).
    pub fn native_path(&self) -> String {
        if self.os_type().is_windows() {
            self.path().replace('/', "\\")
        } else {
            self.path().to_string()
        }
    }

    /// The standard library form of a local path, `None` for device paths.
    pub fn to_std_path(&self) -> Option<PathBuf> {
        self.is_local().then(|| PathBuf::from(self.native_path()))
    }

    /// Text suitable for showing to a user.
    ///
    /// Local paths use native separators; device paths use the canonical form.
    pub fn display(&self) -> String {
        if self.is_local() {
            self.native_path()
        } else {
            self.to_string()
        }
    }

    /// Path segments, skipping the root and empty segments.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        let path = self.path();
        let root = self.os_type().root_length(path);
        path[root..].split('/').filter(|s| !s.is_empty())
    }

    // ------------------------------------------------------------------
    // Decomposition
    // ------------------------------------------------------------------

    /// Last path segment, empty for roots and paths ending in `/`.
    pub fn file_name(&self) -> &str {
        let path = self.path();
        let root = self.os_type().root_length(path);
        let tail = &path[root..];
        match tail.rfind('/') {
            Some(pos) => &tail[pos + 1..],
            None => tail,
        }
    }

    /// File name up to the first `.`.
    pub fn base_name(&self) -> &str {
        let name = self.file_name();
        match name.find('.') {
            Some(pos) => &name[..pos],
            None => name,
        }
    }

    /// File name up to the last `.`.
    pub fn complete_base_name(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(pos) => &name[..pos],
            None => name,
        }
    }

    /// Text after the last `.` of the file name.
    ///
    /// `.` and `..` have no suffix.
    pub fn suffix(&self) -> &str {
        let name = self.file_name();
        if name == "." || name == ".." {
            return "";
        }
        match name.rfind('.') {
            Some(pos) => &name[pos + 1..],
            None => "",
        }
    }

    /// Text after the first `.` of the file name.
    pub fn complete_suffix(&self) -> &str {
        let name = self.file_name();
        if name == "." || name == ".." {
            return "";
        }
        match name.find('.') {
            Some(pos) => &name[pos + 1..],
            None => "",
        }
    }

    /// The cleaned parent directory.
    ///
    /// Roots and the empty path have no parent and return the empty path.
    pub fn parent_dir(&self) -> FilePath {
        let path = self.path();
        if path.is_empty() || self.is_root_path() {
            return FilePath::new();
        }
        let os = self.os_type();
        let parent = os.clean_path(&format!("{path}/.."));
        if parent.is_empty() {
            return FilePath::new();
        }
        self.with_new_path(&parent)
    }

    // ------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------

    /// Same scheme and host, different path.
    pub fn with_new_path(&self, path: &str) -> FilePath {
        FilePath::from_parts(self.scheme(), self.host(), path)
    }

    /// Append `tail` as one or more path segments, joining with exactly one `/`.
    ///
    /// The result is not cleaned.
    pub fn path_appended(&self, tail: &str) -> FilePath {
        if tail.is_empty() {
            return self.clone();
        }
        let tail = tail.replace('\\', "/");
        if self.is_empty() {
            return FilePath::from_string(&tail);
        }
        let mut path = self.path().to_string();
        match (path.ends_with('/'), tail.starts_with('/')) {
            (true, true) => path.push_str(&tail[1..]),
            (false, false) if !path.is_empty() => {
                path.push('/');
                path.push_str(&tail);
            }
            _ => path.push_str(&tail),
        }
        self.with_new_path(&path)
    }

    /// Append raw text to the path.
    pub fn string_appended(&self, text: &str) -> FilePath {
        let mut path = self.path().to_string();
        path.push_str(text);
        self.with_new_path(&path)
    }

    /// Append `suffix` to the file name, e.g. `.bak` or `.tmp`.
    pub fn with_suffix(&self, suffix: &str) -> FilePath {
        self.string_appended(suffix)
    }

    /// Replace the last suffix of the file name, adding one if there is none.
    ///
    /// `suffix` is given without the leading dot.
    pub fn with_replaced_suffix(&self, suffix: &str) -> FilePath {
        let current = self.suffix();
        let path = self.path();
        let stem = if current.is_empty() {
            path
        } else {
            &path[..path.len() - current.len() - 1]
        };
        if suffix.is_empty() {
            return self.with_new_path(stem);
        }
        self.with_new_path(&format!("{stem}.{suffix}"))
    }

    /// Remove `tail` from the end of the path if present.
    pub fn tail_removed(&self, tail: &str) -> FilePath {
        let path = self.path();
        if !tail.is_empty() && self.case_sensitivity().ends_with(path, tail) {
            let keep = path.chars().count() - tail.chars().count();
            let cut: String = path.chars().take(keep).collect();
            return self.with_new_path(&cut);
        }
        self.clone()
    }

    /// Lexically clean the path according to its [`OsType`].
    pub fn clean_path(&self) -> FilePath {
        let cleaned = self.os_type().clean_path(self.path());
        self.with_new_path(&cleaned)
    }

    /// Resolve `tail` against this path.
    ///
    /// An absolute or device `tail` is returned unchanged; a relative `tail` is
    /// appended and the result cleaned. An empty `tail` yields this path cleaned.
    pub fn resolve_path(&self, tail: &FilePath) -> FilePath {
        if tail.is_empty() {
            return self.clean_path();
        }
        if !tail.is_local() || !tail.is_relative_path() {
            return tail.clone();
        }
        self.path_appended(tail.path()).clean_path()
    }

    /// Like [`FilePath::resolve_path`] for a plain string tail.
    pub fn resolve_path_str(&self, tail: &str) -> FilePath {
        self.resolve_path(&FilePath::from_string(tail))
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    /// Returns `true` if the path is absolute under its [`OsType`].
    pub fn is_absolute_path(&self) -> bool {
        self.os_type().is_absolute(self.path())
    }

    /// Returns `true` if the path is relative.
    pub fn is_relative_path(&self) -> bool {
        !self.is_absolute_path()
    }

    /// Returns `true` if the path consists of a root only (`/`, `C:/`, `//srv/`).
    pub fn is_root_path(&self) -> bool {
        let path = self.path();
        let os = self.os_type();
        !path.is_empty() && os.is_absolute(path) && os.root_length(path) == path.len()
    }

    /// Returns `true` if both paths share scheme and host.
    ///
    /// See [`FilePath::is_same_device`] for the hook-aware variant.
    pub fn is_same_location(&self, other: &FilePath) -> bool {
        self.scheme() == other.scheme() && self.host() == other.host()
    }

    /// Returns `true` if the path starts with `prefix` (case-aware).
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.case_sensitivity().starts_with(self.path(), prefix)
    }

    /// Returns `true` if the path ends with `suffix` (case-aware).
    pub fn ends_with(&self, suffix: &str) -> bool {
        self.case_sensitivity().ends_with(self.path(), suffix)
    }

    /// Returns `true` if this path lies strictly below `parent`.
    pub fn is_child_of(&self, parent: &FilePath) -> bool {
        if !self.is_same_location(parent) {
            return false;
        }
        let parent_path = parent.path();
        let path = self.path();
        if parent_path.is_empty() || path.len() <= parent_path.len() {
            return false;
        }
        if !self.case_sensitivity().starts_with(path, parent_path) {
            return false;
        }
        if parent_path.ends_with('/') {
            return true;
        }
        path[parent_path.len()..].starts_with('/')
    }

    /// The part of this path below `parent`, or the empty path if this is not a child.
    pub fn relative_child_path(&self, parent: &FilePath) -> FilePath {
        if !self.is_child_of(parent) {
            return FilePath::new();
        }
        let rest = self.path()[parent.path().len()..].trim_start_matches('/');
        FilePath::from_parts("", "", rest)
    }

    /// The shortest relative path leading from the directory `anchor` to this path.
    ///
    /// Both paths are cleaned first. Equal paths yield `.`. When the two paths do
    /// not share a common root (different device, one absolute and one relative,
    /// or different drive roots) this path is returned unchanged.
    ///
    /// ```rust
    /// use devpath::FilePath;
    ///
    /// let target = FilePath::from_string("/src/app/main.rs");
    /// let anchor = FilePath::from_string("/src/lib");
    /// assert_eq!(target.relative_path_from(&anchor).path(), "../app/main.rs");
    /// ```
    pub fn relative_path_from(&self, anchor: &FilePath) -> FilePath {
        if !self.is_same_location(anchor) {
            return self.clone();
        }
        let os = self.os_type();
        let cs = self.case_sensitivity();
        let path = os.clean_path(self.path());
        let base = os.clean_path(anchor.path());
        if os.is_absolute(&path) != os.is_absolute(&base) {
            return self.clone();
        }
        let path_root = os.root_length(&path);
        let base_root = os.root_length(&base);
        if !cs.equals(&path[..path_root], &base[..base_root]) {
            return self.clone();
        }

        let parts: Vec<&str> = path[path_root..]
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        let base_parts: Vec<&str> = base[base_root..]
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();

        let common = parts
            .iter()
            .zip(base_parts.iter())
            .take_while(|(a, b)| cs.equals(a, b))
            .count();
        if base_parts[common..].contains(&"..") {
            // The anchor climbs into a directory whose name is unknown.
            return self.clone();
        }

        let mut relative: Vec<&str> = Vec::new();
        relative.extend(std::iter::repeat_n("..", base_parts.len() - common));
        relative.extend(&parts[common..]);
        if relative.is_empty() {
            return FilePath::from_parts("", "", ".");
        }
        FilePath::from_parts("", "", &relative.join("/"))
    }

    /// The deepest directory containing all `paths`.
    ///
    /// Returns the empty path if `paths` is empty or spans several devices.
    pub fn common_path(paths: &[FilePath]) -> FilePath {
        let Some(first) = paths.first() else {
            return FilePath::new();
        };
        if paths.len() == 1 {
            return first.clone();
        }
        if paths.iter().any(|p| !p.is_same_location(first)) {
            return FilePath::new();
        }
        let cs = first.case_sensitivity();
        let os = first.os_type();
        let root_len = os.root_length(first.path());
        let root = &first.path()[..root_len];
        if paths
            .iter()
            .any(|p| !cs.equals(&p.path()[..os.root_length(p.path())], root))
        {
            return FilePath::new();
        }

        let mut common: Vec<&str> = first.components().collect();
        for other in &paths[1..] {
            let n = common
                .iter()
                .zip(other.components())
                .take_while(|(a, b)| cs.equals(a, b))
                .count();
            common.truncate(n);
        }
        let joined = format!("{root}{}", common.join("/"));
        if joined.is_empty() {
            return FilePath::new();
        }
        first.with_new_path(&joined)
    }

    fn memo_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut hasher = DefaultHasher::new();
            self.scheme().hash(&mut hasher);
            self.host().hash(&mut hasher);
            match self.case_sensitivity() {
                CaseSensitivity::Sensitive => self.path().hash(&mut hasher),
                CaseSensitivity::Insensitive => {
                    for c in self.path().chars().flat_map(char::to_lowercase) {
                        c.hash(&mut hasher);
                    }
                }
            }
            hasher.finish()
        })
    }
}

impl PartialEq for FilePath {
    fn eq(&self, other: &Self) -> bool {
        self.scheme() == other.scheme()
            && self.host() == other.host()
            && self.case_sensitivity().equals(self.path(), other.path())
    }
}

impl Eq for FilePath {}

impl Hash for FilePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.memo_hash());
    }
}

impl PartialOrd for FilePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FilePath {
    fn cmp(&self, other: &Self) -> Ordering {
        // Local and device paths fold case differently; local paths (empty scheme) sort first.
        if self.is_local() != other.is_local() {
            return self.scheme().cmp(other.scheme());
        }
        self.case_sensitivity()
            .compare(self.path(), other.path())
            .then_with(|| self.scheme().cmp(other.scheme()))
            .then_with(|| self.host().cmp(other.host()))
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            return f.write_str(self.path());
        }
        write!(f, "{}://{}", self.scheme(), encode_host(self.host()))?;
        let path = self.path();
        if path.is_empty() || path.starts_with('/') {
            f.write_str(path)
        } else if path == "." {
            f.write_str("/.")
        } else {
            write!(f, "/./{path}")
        }
    }
}

impl fmt::Debug for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FilePath({:?})", self.to_string())
    }
}

impl From<&str> for FilePath {
    fn from(text: &str) -> Self {
        FilePath::from_string(text)
    }
}

impl From<&Path> for FilePath {
    fn from(path: &Path) -> Self {
        FilePath::from_std_path(path)
    }
}

impl From<PathBuf> for FilePath {
    fn from(path: PathBuf) -> Self {
        FilePath::from_std_path(&path)
    }
}

/// Split `scheme://rest`, accepting only RFC 3986 scheme characters.
///
/// Single-letter schemes are rejected so that `C://dir` stays a Windows path.
fn split_scheme(text: &str) -> Option<(&str, &str)> {
    let pos = text.find("://")?;
    let scheme = &text[..pos];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if scheme.len() < 2 || !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some((scheme, &text[pos + 3..]))
}

fn encode_host(host: &str) -> String {
    host.replace('%', "%25").replace('/', "%2f")
}

fn decode_host(host: &str) -> String {
    if !host.contains('%') {
        return host.to_string();
    }
    let mut out = String::with_capacity(host.len());
    let mut rest = host;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = rest.get(pos + 1..pos + 3);
        match code.map(str::to_ascii_lowercase).as_deref() {
            Some("2f") => out.push('/'),
            Some("25") => out.push('%'),
            _ => {
                out.push('%');
                rest = &rest[pos + 1..];
                continue;
            }
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    out
}

fn home_dir() -> Option<String> {
    let var = if OsType::host().is_windows() {
        "USERPROFILE"
    } else {
        "HOME"
    };
    std::env::var(var)
        .ok()
        .filter(|h| !h.is_empty())
        .map(|h| h.replace('\\', "/"))
}

#[cfg(feature = "serde")]
mod settings {
    use super::FilePath;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    impl FilePath {
        /// Convert to a generic settings value (the canonical string form).
        pub fn to_settings(&self) -> serde_json::Value {
            serde_json::Value::String(self.to_string())
        }

        /// Read a path back from a settings value.
        ///
        /// Non-string values produce the empty path.
        pub fn from_settings(value: &serde_json::Value) -> FilePath {
            value
                .as_str()
                .map(FilePath::from_string)
                .unwrap_or_default()
        }
    }

    impl Serialize for FilePath {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_string())
        }
    }

    impl<'de> Deserialize<'de> for FilePath {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let text = String::deserialize(deserializer)?;
            Ok(FilePath::from_string(&text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn dev(path: &str) -> FilePath {
        FilePath::from_parts("dev", "box", path)
    }

    #[test]
    fn parse_device_path() {
        let p = FilePath::from_string("ssh://user@host:22/etc/hosts");
        assert_eq!(p.scheme(), "ssh");
        assert_eq!(p.host(), "user@host:22");
        assert_eq!(p.path(), "/etc/hosts");
        assert!(!p.is_local());
    }

    #[test]
    fn parse_local_path() {
        let p = FilePath::from_string("/usr/bin/env");
        assert!(p.is_local());
        assert_eq!(p.scheme(), "");
        assert_eq!(p.host(), "");
        assert_eq!(p.path(), "/usr/bin/env");
    }

    #[test]
    fn parse_empty_is_empty() {
        assert!(FilePath::from_string("").is_empty());
        assert!(FilePath::from_user_input("   ").is_empty());
    }

    #[test]
    fn single_letter_scheme_is_not_a_scheme() {
        let p = FilePath::from_string("C://dir");
        assert!(p.is_local());
        assert_eq!(p.path(), "C://dir");
    }

    #[test]
    fn device_without_path() {
        let p = FilePath::from_string("docker://abc");
        assert_eq!(p.host(), "abc");
        assert_eq!(p.path(), "");
        assert_eq!(p.to_string(), "docker://abc");
    }

    #[test]
    fn relative_device_path_round_trips() {
        let p = dev("src/lib.rs");
        assert_eq!(p.to_string(), "dev://box/./src/lib.rs");
        assert_eq!(FilePath::from_string(&p.to_string()), p);
        let dot = dev(".");
        assert_eq!(FilePath::from_string(&dot.to_string()), dot);
    }

    #[test]
    fn host_is_percent_encoded() {
        let p = FilePath::from_parts("wsl", "a/b%c", "/x");
        assert_eq!(p.to_string(), "wsl://a%2fb%25c/x");
        assert_eq!(FilePath::from_string(&p.to_string()), p);
    }

    #[test]
    fn canonical_form_round_trips() {
        for text in [
            "/a/b",
            "relative/x.txt",
            "dev://box/a/b",
            "dev://box",
            "dev://box/./rel",
            "s3://bucket/",
        ] {
            let p = FilePath::from_string(text);
            assert_eq!(FilePath::from_string(&p.to_string()), p, "{text}");
        }
    }

    #[test]
    fn redundant_forms_normalize_identically() {
        let a = FilePath::from_string("dev://box/a//b/./c").clean_path();
        let b = FilePath::from_string("dev://box/a/b/c").clean_path();
        assert_eq!(a, b);
    }

    #[test]
    fn clean_is_idempotent() {
        for text in ["/a/../b/./c/", "x/../../y", "dev://box/p/q/..", "."] {
            let once = FilePath::from_string(text).clean_path();
            assert_eq!(once.clean_path(), once, "{text}");
        }
    }

    #[test]
    fn user_input_expands_home() {
        let Some(home) = home_dir() else { return };
        let p = FilePath::from_user_input("~/projects/../code");
        let expected = FilePath::from_string(&format!("{home}/code")).clean_path();
        assert_eq!(p, expected);
    }

    #[test]
    fn decomposition() {
        let p = dev("/src/archive.tar.gz");
        assert_eq!(p.file_name(), "archive.tar.gz");
        assert_eq!(p.base_name(), "archive");
        assert_eq!(p.complete_base_name(), "archive.tar");
        assert_eq!(p.suffix(), "gz");
        assert_eq!(p.complete_suffix(), "tar.gz");

        let hidden = dev("/home/.bashrc");
        assert_eq!(hidden.suffix(), "bashrc");
        assert_eq!(hidden.base_name(), "");
        assert_eq!(dev("/a/..").suffix(), "");
        assert_eq!(dev("/").file_name(), "");
    }

    #[test]
    fn parent_dir() {
        assert_eq!(dev("/a/b/c").parent_dir(), dev("/a/b"));
        assert_eq!(dev("/a").parent_dir(), dev("/"));
        assert!(dev("/").parent_dir().is_empty());
        assert_eq!(dev("a").parent_dir(), dev("."));
        assert!(FilePath::new().parent_dir().is_empty());
        let windows = dev("C:/Users/me");
        assert_eq!(windows.parent_dir(), dev("C:/Users"));
        assert!(dev("C:/").parent_dir().is_empty());
    }

    #[test]
    fn path_appended_joins_with_one_separator() {
        assert_eq!(dev("/a").path_appended("b").path(), "/a/b");
        assert_eq!(dev("/a/").path_appended("/b").path(), "/a/b");
        assert_eq!(dev("/a/").path_appended("b").path(), "/a/b");
        assert_eq!(dev("/a").path_appended("/b").path(), "/a/b");
        assert_eq!(dev("/a").path_appended(""), dev("/a"));
        assert_eq!(FilePath::new().path_appended("x").path(), "x");
    }

    #[test]
    fn suffix_manipulation() {
        assert_eq!(dev("/f.txt").with_suffix(".bak").path(), "/f.txt.bak");
        assert_eq!(dev("/f.txt").with_replaced_suffix("md").path(), "/f.md");
        assert_eq!(dev("/f").with_replaced_suffix("md").path(), "/f.md");
        assert_eq!(dev("/f.txt").with_replaced_suffix("").path(), "/f");
        assert_eq!(dev("/a/b.txt").tail_removed("b.txt").path(), "/a/");
        assert_eq!(dev("/a/b.txt").tail_removed("zzz").path(), "/a/b.txt");
    }

    #[test]
    fn resolve_path() {
        let base = dev("/src");
        assert_eq!(base.resolve_path_str("lib/../main.rs"), dev("/src/main.rs"));
        assert_eq!(base.resolve_path_str("/etc"), FilePath::from_string("/etc"));
        assert_eq!(base.resolve_path(&FilePath::new()), dev("/src"));
    }

    #[test]
    fn relative_path_from() {
        let target = dev("/a/b/c/file.txt");
        assert_eq!(target.relative_path_from(&dev("/a/b")).path(), "c/file.txt");
        assert_eq!(
            target.relative_path_from(&dev("/a/x/y")).path(),
            "../../b/c/file.txt"
        );
        assert_eq!(dev("/a").relative_path_from(&dev("/a")).path(), ".");
        assert_eq!(dev("/a").relative_path_from(&dev("/a/b/c")).path(), "../..");
    }

    #[test]
    fn relative_path_without_common_root_is_unchanged() {
        let other_device = FilePath::from_parts("dev", "other", "/a");
        assert_eq!(dev("/a/b").relative_path_from(&other_device), dev("/a/b"));
        assert_eq!(dev("C:/a").relative_path_from(&dev("D:/a")), dev("C:/a"));
        assert_eq!(dev("/a").relative_path_from(&dev("rel")), dev("/a"));
    }

    #[test]
    fn relative_of_resolved_is_tail() {
        let anchors = [dev("/a"), dev("/a/b/"), dev("/"), dev("rel/dir")];
        let tails = ["x", "x/y/z.txt", "deep/er"];
        for anchor in &anchors {
            for tail in tails {
                let tail = FilePath::from_string(tail);
                let resolved = anchor.resolve_path(&tail);
                assert_eq!(resolved.relative_path_from(anchor), tail, "{anchor:?}");
            }
        }
    }

    #[test]
    fn child_relations() {
        let parent = dev("/a/b");
        assert!(dev("/a/b/c").is_child_of(&parent));
        assert!(!dev("/a/bc").is_child_of(&parent));
        assert!(!dev("/a/b").is_child_of(&parent));
        assert!(dev("/x").is_child_of(&dev("/")));
        assert!(!FilePath::from_string("/a/b/c").is_child_of(&parent));
        assert_eq!(dev("/a/b/c/d").relative_child_path(&parent).path(), "c/d");
        assert!(dev("/z").relative_child_path(&parent).is_empty());
    }

    #[test]
    fn root_and_absolute() {
        assert!(dev("/").is_root_path());
        assert!(dev("C:/").is_root_path());
        assert!(!dev("C:").is_root_path());
        assert!(!dev("/a").is_root_path());
        assert!(dev("/a").is_absolute_path());
        assert!(dev("a").is_relative_path());
    }

    #[test]
    fn ordering_is_path_then_scheme_then_host() {
        let a = FilePath::from_parts("b", "z", "/p");
        let b = FilePath::from_parts("a", "z", "/q");
        assert!(a < b, "path decides first");

        let x = FilePath::from_parts("a", "z", "/p");
        let y = FilePath::from_parts("b", "a", "/p");
        assert!(x < y, "scheme decides before host");

        let m = FilePath::from_parts("a", "a", "/p");
        let n = FilePath::from_parts("a", "b", "/p");
        assert!(m < n, "host breaks the final tie");

        let local = FilePath::from_string("/p");
        assert!(local < m, "empty scheme sorts first");
    }

    #[test]
    fn local_and_device_paths_order_consistently() {
        let paths = [
            FilePath::from_string("/a"),
            FilePath::from_string("/B"),
            FilePath::from_parts("dev", "box", "/a"),
            FilePath::from_parts("dev", "box", "/B"),
        ];
        for a in &paths {
            for b in &paths {
                assert_eq!(a.cmp(b), b.cmp(a).reverse(), "{a:?} vs {b:?}");
            }
        }
        // A device path never sorts before a local one, whatever the case of its path.
        assert!(FilePath::from_string("/a") < FilePath::from_parts("dev", "box", "/B"));
        assert!(FilePath::from_parts("dev", "box", "/B") > FilePath::from_string("/a"));

        let mut sorted = paths.to_vec();
        sorted.sort();
        assert!(sorted[..2].iter().all(FilePath::is_local));
        assert!(!sorted[2..].iter().any(FilePath::is_local));
    }

    #[test]
    fn equal_paths_hash_equal() {
        let mut set = HashSet::new();
        set.insert(dev("/a/b"));
        assert!(set.contains(&dev("/a/b")));
        assert!(!set.contains(&dev("/a/B")));
        let p = dev("/x");
        let q = p.clone();
        assert_eq!(p.memo_hash(), q.memo_hash());
    }

    #[test]
    fn device_paths_are_case_sensitive() {
        assert_ne!(dev("/A"), dev("/a"));
        assert_eq!(dev("/A").case_sensitivity(), CaseSensitivity::Sensitive);
    }

    #[cfg(any(target_os = "windows", target_os = "macos"))]
    #[test]
    fn local_paths_ignore_case_on_insensitive_hosts() {
        assert_eq!(FilePath::from_string("/A/b"), FilePath::from_string("/a/B"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn local_paths_respect_case_on_linux() {
        assert_ne!(FilePath::from_string("/A/b"), FilePath::from_string("/a/B"));
    }

    #[test]
    fn device_os_type_from_drive_letter() {
        assert_eq!(dev("C:/x").os_type(), OsType::Windows);
        assert_eq!(dev("/x").os_type(), OsType::Linux);
        assert_eq!(dev("C:/x").native_path(), "C:\\x");
    }

    #[test]
    fn common_path() {
        let paths = [dev("/a/b/c"), dev("/a/b/d/e"), dev("/a/b")];
        assert_eq!(FilePath::common_path(&paths), dev("/a/b"));
        assert_eq!(FilePath::common_path(&[dev("/x"), dev("/y")]), dev("/"));
        assert!(FilePath::common_path(&[dev("/x"), FilePath::from_string("/x")]).is_empty());
        assert!(FilePath::common_path(&[]).is_empty());
    }

    #[test]
    fn components_skip_root() {
        let path = dev("/a//b/c");
        let parts: Vec<_> = path.components().collect();
        assert_eq!(parts, ["a", "b", "c"]);
    }

    #[test]
    fn std_path_only_for_local() {
        assert!(dev("/a").to_std_path().is_none());
        assert_eq!(
            FilePath::from_string("/a").to_std_path(),
            Some(PathBuf::from("/a"))
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn settings_round_trip() {
        let p = dev("/cfg/settings.json");
        let value = p.to_settings();
        assert_eq!(value, serde_json::json!("dev://box/cfg/settings.json"));
        assert_eq!(FilePath::from_settings(&value), p);
        assert!(FilePath::from_settings(&serde_json::json!(42)).is_empty());
    }
}
