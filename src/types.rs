//! Core value types shared by back ends, caches and walkers.

use std::time::SystemTime;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::{FilePath, FsError};

/// Type of a file system entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// A directory presented as a single file (macOS application bundles).
    Bundle,
}

/// Unix-style permissions stored as a mode bitmask.
///
/// Uses the standard Unix permission bits (rwxrwxrwx) plus setuid/setgid/sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permissions(u32);

impl Permissions {
    /// Create permissions from a Unix mode (e.g., 0o755).
    #[inline]
    pub const fn from_mode(mode: u32) -> Self {
        Self(mode & 0o7777)
    }

    /// Get the raw mode value.
    #[inline]
    pub const fn mode(&self) -> u32 {
        self.0
    }

    /// Returns `true` if these permissions deny writing.
    #[inline]
    pub const fn readonly(&self) -> bool {
        (self.0 & 0o222) == 0
    }

    /// Returns `true` if any execute bit is set.
    #[inline]
    pub const fn executable(&self) -> bool {
        (self.0 & 0o111) != 0
    }

    /// Clear the bits set in `umask`.
    #[inline]
    pub const fn masked(&self, umask: u32) -> Self {
        Self(self.0 & !umask & 0o7777)
    }

    /// Default permissions for a new file (0o644 = rw-r--r--).
    #[inline]
    pub const fn default_file() -> Self {
        Self(0o644)
    }

    /// Default permissions for a new directory (0o755 = rwxr-xr-x).
    #[inline]
    pub const fn default_dir() -> Self {
        Self(0o755)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::default_file()
    }
}

/// Packed flag set of a [`FilePathInfo`].
///
/// The low twelve bits hold the permission mode; the named constants above
/// them record type and location facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InfoFlags(u32);

impl InfoFlags {
    /// The entry exists.
    pub const EXISTS: Self = Self(1 << 16);
    /// Regular file.
    pub const FILE: Self = Self(1 << 17);
    /// Directory.
    pub const DIRECTORY: Self = Self(1 << 18);
    /// Symbolic link (the entry itself, not its target).
    pub const SYMLINK: Self = Self(1 << 19);
    /// Bundle directory.
    pub const BUNDLE: Self = Self(1 << 20);
    /// Hidden entry.
    pub const HIDDEN: Self = Self(1 << 21);
    /// File system root.
    pub const ROOT: Self = Self(1 << 22);
    /// Lives on a local disk.
    pub const LOCAL_DISK: Self = Self(1 << 23);

    const PERMISSION_MASK: u32 = 0o7777;

    /// No flags, no permissions.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bits.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Build from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns `true` if all bits of `other` are set.
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// These flags plus `other`.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// These flags with the permission bits replaced.
    #[must_use]
    pub const fn with_permissions(self, permissions: Permissions) -> Self {
        Self((self.0 & !Self::PERMISSION_MASK) | permissions.mode())
    }

    /// The permission bits.
    pub const fn permissions(&self) -> Permissions {
        Permissions::from_mode(self.0 & Self::PERMISSION_MASK)
    }

    /// The entry type recorded in the flags, if any.
    pub fn file_type(&self) -> Option<FileType> {
        if self.contains(Self::SYMLINK) {
            Some(FileType::Symlink)
        } else if self.contains(Self::BUNDLE) {
            Some(FileType::Bundle)
        } else if self.contains(Self::DIRECTORY) {
            Some(FileType::Directory)
        } else if self.contains(Self::FILE) {
            Some(FileType::File)
        } else {
            None
        }
    }
}

impl std::ops::BitOr for InfoFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl From<FileType> for InfoFlags {
    fn from(file_type: FileType) -> Self {
        match file_type {
            FileType::File => Self::FILE,
            FileType::Directory => Self::DIRECTORY,
            FileType::Symlink => Self::SYMLINK,
            FileType::Bundle => Self::BUNDLE.with(Self::DIRECTORY),
        }
    }
}

/// A stat snapshot: size, flags and modification time.
///
/// Produced by back ends on demand and compared by value. A snapshot of a
/// missing path has no [`InfoFlags::EXISTS`] flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilePathInfo {
    /// Size in bytes.
    pub size: u64,
    /// Type, permission and location flags.
    pub flags: InfoFlags,
    /// Last modification time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub last_modified: SystemTime,
}

impl FilePathInfo {
    /// Snapshot of an existing entry.
    pub fn new(
        file_type: FileType,
        size: u64,
        permissions: Permissions,
        last_modified: SystemTime,
    ) -> Self {
        Self {
            size,
            flags: InfoFlags::EXISTS
                .with(file_type.into())
                .with_permissions(permissions),
            last_modified,
        }
    }

    /// Snapshot of a path that does not exist.
    pub fn not_found() -> Self {
        Self::default()
    }

    /// Returns `true` if the entry exists.
    #[inline]
    pub fn exists(&self) -> bool {
        self.flags.contains(InfoFlags::EXISTS)
    }

    /// Returns `true` for regular files.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.flags.contains(InfoFlags::FILE)
    }

    /// Returns `true` for directories, bundles included.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.flags.contains(InfoFlags::DIRECTORY)
    }

    /// Returns `true` for symbolic links.
    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.flags.contains(InfoFlags::SYMLINK)
    }

    /// Returns `true` for hidden entries.
    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.flags.contains(InfoFlags::HIDDEN)
    }

    /// Returns `true` for file system roots.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.flags.contains(InfoFlags::ROOT)
    }

    /// The entry's permissions.
    #[inline]
    pub fn permissions(&self) -> Permissions {
        self.flags.permissions()
    }

    /// The same snapshot with `flag` added.
    #[must_use]
    pub fn with_flag(mut self, flag: InfoFlags) -> Self {
        self.flags = self.flags.with(flag);
        self
    }
}

impl Default for FilePathInfo {
    fn default() -> Self {
        Self {
            size: 0,
            flags: InfoFlags::empty(),
            last_modified: SystemTime::UNIX_EPOCH,
        }
    }
}

/// A directory entry returned from `list_directory`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirEntry {
    /// Full path to the entry.
    pub path: FilePath,
    /// Stat snapshot, present when the listing asked for it.
    pub info: Option<FilePathInfo>,
}

impl DirEntry {
    /// Name of the entry (file name only).
    pub fn name(&self) -> &str {
        self.path.file_name()
    }
}

/// Which entries a directory listing returns.
///
/// Name patterns are case-insensitive globs that apply to files only;
/// directories are never filtered by name so that recursive walks can descend.
///
/// ```rust
/// use devpath::ListFilter;
///
/// let filter = ListFilter::files().with_name_filters(&["*.rs"]).unwrap();
/// assert!(filter.matches_name("main.RS"));
/// assert!(!filter.matches_name("README.md"));
/// ```
#[derive(Debug, Clone)]
pub struct ListFilter {
    /// Include regular files (and symlinks to them).
    pub files: bool,
    /// Include directories.
    pub dirs: bool,
    /// Include hidden entries.
    pub hidden: bool,
    /// Attach a [`FilePathInfo`] to each returned entry.
    pub with_info: bool,
    patterns: Vec<String>,
    names: Option<GlobSet>,
}

impl ListFilter {
    /// Files and directories, hidden included.
    pub fn all() -> Self {
        Self {
            files: true,
            dirs: true,
            hidden: true,
            with_info: false,
            patterns: Vec::new(),
            names: None,
        }
    }

    /// Files only, hidden included.
    pub fn files() -> Self {
        Self {
            dirs: false,
            ..Self::all()
        }
    }

    /// Directories only, hidden included.
    pub fn dirs() -> Self {
        Self {
            files: false,
            ..Self::all()
        }
    }

    /// Ask for stat snapshots with each entry.
    #[must_use]
    pub fn with_info(mut self) -> Self {
        self.with_info = true;
        self
    }

    /// Exclude hidden entries.
    #[must_use]
    pub fn without_hidden(mut self) -> Self {
        self.hidden = false;
        self
    }

    /// Only return files whose name matches one of `patterns`.
    pub fn with_name_filters(mut self, patterns: &[&str]) -> Result<Self, FsError> {
        if patterns.is_empty() {
            self.patterns.clear();
            self.names = None;
            return Ok(self);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .literal_separator(false)
                .build()
                .map_err(|e| FsError::InvalidPattern {
                    pattern: (*pattern).to_string(),
                    reason: e.to_string(),
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| FsError::InvalidPattern {
            pattern: patterns.join(","),
            reason: e.to_string(),
        })?;
        self.patterns = patterns.iter().map(|p| (*p).to_string()).collect();
        self.names = Some(set);
        Ok(self)
    }

    /// The name patterns in effect.
    pub fn name_filters(&self) -> &[String] {
        &self.patterns
    }

    /// Returns `true` if `name` passes the name patterns.
    pub fn matches_name(&self, name: &str) -> bool {
        self.names.as_ref().is_none_or(|set| set.is_match(name))
    }

    /// Decide whether an entry with `name` and `info` belongs in the listing.
    pub fn accepts(&self, name: &str, info: &FilePathInfo) -> bool {
        if !self.hidden && (info.is_hidden() || name.starts_with('.')) {
            return false;
        }
        if info.is_dir() {
            return self.dirs;
        }
        self.files && self.matches_name(name)
    }
}

impl Default for ListFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// Serde support for SystemTime (when serde feature is enabled).
#[cfg(feature = "serde")]
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (duration.as_secs(), duration.subsec_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos): (u64, u32) = Deserialize::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}
