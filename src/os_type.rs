//! Per-OS path rules.
//!
//! [`OsType`] answers the questions the [`FilePath`](crate::FilePath) algebra has to ask
//! about a path string: where its root ends, which separator and list separator apply,
//! and whether names compare case-sensitively. All functions here are pure.
//!
//! Paths are always handled in their internal form, which uses `/` as the separator on
//! every OS. Windows rules additionally accept `\` on input to [`OsType::clean_path`].

use std::cmp::Ordering;

/// Whether path names are compared with or without regard to case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CaseSensitivity {
    /// `Foo` and `foo` are different names.
    Sensitive,
    /// `Foo` and `foo` name the same entry.
    Insensitive,
}

impl CaseSensitivity {
    /// Compare two strings under this sensitivity.
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            CaseSensitivity::Sensitive => a.cmp(b),
            CaseSensitivity::Insensitive => fold(a).cmp(fold(b)),
        }
    }

    /// Returns `true` if both strings are equal under this sensitivity.
    pub fn equals(self, a: &str, b: &str) -> bool {
        match self {
            CaseSensitivity::Sensitive => a == b,
            CaseSensitivity::Insensitive => fold(a).eq(fold(b)),
        }
    }

    /// Returns `true` if `text` starts with `prefix` under this sensitivity.
    pub fn starts_with(self, text: &str, prefix: &str) -> bool {
        match self {
            CaseSensitivity::Sensitive => text.starts_with(prefix),
            CaseSensitivity::Insensitive => {
                let mut chars = text.chars();
                for p in prefix.chars() {
                    match chars.next() {
                        Some(c) if chars_equal(c, p) => {}
                        _ => return false,
                    }
                }
                true
            }
        }
    }

    /// Returns `true` if `text` ends with `suffix` under this sensitivity.
    pub fn ends_with(self, text: &str, suffix: &str) -> bool {
        match self {
            CaseSensitivity::Sensitive => text.ends_with(suffix),
            CaseSensitivity::Insensitive => {
                let mut chars = text.chars().rev();
                for s in suffix.chars().rev() {
                    match chars.next() {
                        Some(c) if chars_equal(c, s) => {}
                        _ => return false,
                    }
                }
                true
            }
        }
    }
}

fn fold(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

fn chars_equal(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Operating system family whose path conventions apply to a path.
///
/// Device back ends report their own `OsType` (see
/// [`FileDevice::os_type`](crate::FileDevice::os_type)), so a Linux host can
/// correctly handle paths that live on a Windows device and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OsType {
    /// Linux and other Unix-likes that are not macOS.
    Linux,
    /// macOS.
    Mac,
    /// Windows.
    Windows,
    /// Any other Unix-like system.
    OtherUnix,
}

impl OsType {
    /// The OS this process runs on.
    pub const fn host() -> OsType {
        if cfg!(target_os = "windows") {
            OsType::Windows
        } else if cfg!(target_os = "macos") {
            OsType::Mac
        } else if cfg!(target_os = "linux") {
            OsType::Linux
        } else {
            OsType::OtherUnix
        }
    }

    /// Parse a device-reported OS name (`uname`-style or a plain name).
    ///
    /// Unknown names map to [`OsType::OtherUnix`].
    pub fn from_name(name: &str) -> OsType {
        match name.trim().to_ascii_lowercase().as_str() {
            "linux" => OsType::Linux,
            "darwin" | "mac" | "macos" | "osx" => OsType::Mac,
            "windows" | "win32" | "win64" | "windows_nt" => OsType::Windows,
            _ => OsType::OtherUnix,
        }
    }

    /// Short lowercase name, the inverse of [`OsType::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            OsType::Linux => "linux",
            OsType::Mac => "mac",
            OsType::Windows => "windows",
            OsType::OtherUnix => "unix",
        }
    }

    /// Returns `true` for Windows.
    #[inline]
    pub fn is_windows(self) -> bool {
        self == OsType::Windows
    }

    /// Default case sensitivity of file names.
    ///
    /// macOS and Windows file systems are case-insensitive by default; stored
    /// paths still keep their original case.
    pub fn case_sensitivity(self) -> CaseSensitivity {
        match self {
            OsType::Windows | OsType::Mac => CaseSensitivity::Insensitive,
            OsType::Linux | OsType::OtherUnix => CaseSensitivity::Sensitive,
        }
    }

    /// Native path separator.
    pub fn separator(self) -> char {
        if self.is_windows() { '\\' } else { '/' }
    }

    /// Separator between entries of `PATH`-style lists.
    pub fn path_list_separator(self) -> char {
        if self.is_windows() { ';' } else { ':' }
    }

    /// Suffix appended to executable names.
    pub fn executable_suffix(self) -> &'static str {
        if self.is_windows() { ".exe" } else { "" }
    }

    /// Number of leading characters of `path` that form its root.
    ///
    /// | OS | input | root |
    /// |----|-------|------|
    /// | Unix | `/usr/bin` | `/` |
    /// | Windows | `C:/Users` | `C:/` |
    /// | Windows | `C:foo` | `C:` |
    /// | Windows | `//server/share/x` | `//server/` |
    /// | Windows | `/x` | `/` |
    ///
    /// Relative paths have a root length of zero. The result is a byte length.
    pub fn root_length(self, path: &str) -> usize {
        if !self.is_windows() {
            return usize::from(path.starts_with('/'));
        }
        let bytes = path.as_bytes();
        if bytes.len() >= 2 && is_separator(bytes[0]) && is_separator(bytes[1]) {
            return match bytes[2..].iter().position(|b| is_separator(*b)) {
                Some(pos) => pos + 3,
                None => bytes.len(),
            };
        }
        if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
            if bytes.len() >= 3 && is_separator(bytes[2]) {
                return 3;
            }
            return 2;
        }
        usize::from(bytes.first().is_some_and(|b| is_separator(*b)))
    }

    /// Returns `true` if `path` is absolute under these rules.
    ///
    /// A bare Windows drive (`C:` or `C:foo`) is drive-relative and therefore
    /// not absolute.
    pub fn is_absolute(self, path: &str) -> bool {
        let root = self.root_length(path);
        if root == 0 {
            return false;
        }
        !(self.is_windows() && root == 2 && path.as_bytes()[1] == b':')
    }

    /// Lexically normalize a path.
    ///
    /// Removes redundant separators and `.` segments, collapses `name/..`,
    /// and drops a trailing separator. `..` never climbs above a root; leading
    /// `..` segments of relative paths are kept. A relative path that cleans
    /// down to nothing becomes `.`; the empty string stays empty.
    ///
    /// Cleaning is idempotent: `clean_path(clean_path(p)) == clean_path(p)`.
    pub fn clean_path(self, path: &str) -> String {
        if path.is_empty() {
            return String::new();
        }
        let normalized;
        let path = if self.is_windows() && path.contains('\\') {
            normalized = path.replace('\\', "/");
            normalized.as_str()
        } else {
            path
        };

        let root_len = self.root_length(path);
        let (root, rest) = path.split_at(root_len);

        let mut segments: Vec<&str> = Vec::new();
        for segment in rest.split('/') {
            match segment {
                "" | "." => {}
                ".." => match segments.last() {
                    Some(last) if *last != ".." => {
                        segments.pop();
                    }
                    _ if !root.is_empty() => {}
                    _ => segments.push(".."),
                },
                name => segments.push(name),
            }
        }

        let mut result = String::with_capacity(path.len());
        result.push_str(root);
        result.push_str(&segments.join("/"));
        if result.is_empty() {
            result.push('.');
        }
        result
    }
}

impl Default for OsType {
    fn default() -> Self {
        OsType::host()
    }
}

#[inline]
fn is_separator(b: u8) -> bool {
    b == b'/' || b == b'\\'
}
