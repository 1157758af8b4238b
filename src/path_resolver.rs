//! # PathResolver Trait
//!
//! Strategy trait for pluggable path resolution algorithms, plus the default
//! symlink-aware [`IterativeResolver`].
//!
//! ## Responsibility
//! - Define the contract for canonicalization (symlinks followed, `.`/`..` resolved)
//! - Detect symlink loops instead of spinning
//!
//! ## Usage
//!
//! ```rust
//! use devpath::{FileDir, FileLink, FilePath, FileWrite, IterativeResolver, MemoryFileAccess, PathResolver};
//!
//! let mem = MemoryFileAccess::new();
//! let p = |s: &str| FilePath::from_parts("mem", "doc", s);
//! mem.create_dir_all(&p("/real/dir")).unwrap();
//! mem.write_file(&p("/real/dir/f.txt"), b"x", None).unwrap();
//! mem.create_symlink(&p("/real"), &p("/link")).unwrap();
//!
//! let canonical = IterativeResolver.canonicalize(&p("/link/dir/../dir/f.txt"), &mem).unwrap();
//! assert_eq!(canonical, p("/real/dir/f.txt"));
//! ```

use crate::{DeviceFileAccess, FilePath, FsError};

/// Maximum number of symlinks followed while resolving one path.
pub const MAX_SYMLINK_DEPTH: usize = 40;

// ============================================================================
// Trait Definition
// ============================================================================

/// Strategy trait for path resolution algorithms.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to support concurrent access.
///
/// # Object Safety
///
/// Uses `&dyn DeviceFileAccess` to remain object-safe, enabling runtime resolver selection.
pub trait PathResolver: Send + Sync {
    /// Resolve path to canonical form.
    ///
    /// All symlinks are resolved, `.` and `..` are normalized,
    /// and all path components must exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] - A component doesn't exist
    /// - [`FsError::SymlinkLoop`] - Symlink loop detected (circular symlinks)
    fn canonicalize(
        &self,
        path: &FilePath,
        access: &dyn DeviceFileAccess,
    ) -> Result<FilePath, FsError>;

    /// Like [`canonicalize`](Self::canonicalize), but allows a non-existent final component.
    ///
    /// Resolves the parent fully and appends the final component lexically.
    /// Useful for save targets that don't exist yet.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] - A parent component doesn't exist
    /// - [`FsError::SymlinkLoop`] - Symlink loop detected
    fn soft_canonicalize(
        &self,
        path: &FilePath,
        access: &dyn DeviceFileAccess,
    ) -> Result<FilePath, FsError>;
}

// ============================================================================
// Default Implementation
// ============================================================================

/// Walks a path component by component, following each symlink it meets.
///
/// Relative paths are only cleaned lexically: there is no working directory
/// on a device to anchor them to.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterativeResolver;

impl IterativeResolver {
    fn resolve(
        &self,
        path: &FilePath,
        access: &dyn DeviceFileAccess,
        soft: bool,
    ) -> Result<FilePath, FsError> {
        let cleaned = path.clean_path();
        if !cleaned.is_absolute_path() {
            return Ok(cleaned);
        }
        let os = cleaned.os_type();
        let text = cleaned.path();
        let root_len = os.root_length(text);

        let mut root = text[..root_len].to_string();
        let mut resolved: Vec<String> = Vec::new();
        // Stack of components still to visit, last element next.
        let mut pending: Vec<String> = text[root_len..]
            .split('/')
            .rev()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let mut followed = 0usize;

        let join = |root: &str, segments: &[String]| format!("{root}{}", segments.join("/"));

        while let Some(component) = pending.pop() {
            match component.as_str() {
                "." => continue,
                ".." => {
                    resolved.pop();
                    continue;
                }
                _ => {}
            }
            resolved.push(component);
            let candidate = cleaned.with_new_path(&join(&root, &resolved));
            let info = access.stat_link(&candidate)?;
            if !info.exists() {
                if soft && pending.is_empty() {
                    break;
                }
                return Err(FsError::NotFound { path: candidate });
            }
            if !info.is_symlink() {
                continue;
            }

            followed += 1;
            if followed > MAX_SYMLINK_DEPTH {
                return Err(FsError::SymlinkLoop { path: path.clone() });
            }
            let target = access.symlink_target(&candidate)?;
            let target = target.path();
            resolved.pop();
            let target_root = os.root_length(target);
            if os.is_absolute(target) {
                root = target[..target_root].to_string();
                resolved.clear();
            }
            pending.extend(
                target[target_root..]
                    .split('/')
                    .rev()
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }

        Ok(cleaned.with_new_path(&join(&root, &resolved)))
    }
}

impl PathResolver for IterativeResolver {
    fn canonicalize(
        &self,
        path: &FilePath,
        access: &dyn DeviceFileAccess,
    ) -> Result<FilePath, FsError> {
        self.resolve(path, access, false)
    }

    fn soft_canonicalize(
        &self,
        path: &FilePath,
        access: &dyn DeviceFileAccess,
    ) -> Result<FilePath, FsError> {
        self.resolve(path, access, true)
    }
}

// ============================================================================
// Tests
// ============================================================================
