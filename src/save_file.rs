//! # Atomic Saving
//!
//! [`SaveFile`] writes new content next to the target and swaps it into place
//! on [`commit`](SaveFile::commit), so the target is never seen half written.
//!
//! ## Overview
//!
//! | Target | Temporary file | Replace step |
//! |--------|----------------|--------------|
//! | local | `tempfile` in the target's directory | atomic rename (`persist`) |
//! | device | `.<name>.<pid>-<n>.tmp` in the target's directory | rename to a unique `.bak` sibling, rename into place, drop backup |
//!
//! The temporary file gets exactly the target's permissions, or default file
//! permissions filtered by the umask for a new file. Without a commit the
//! temporary file is removed and the target stays exactly as it was.
//!
//! ## Example
//!
//! ```rust
//! use devpath::{FilePath, SaveFile};
//! use std::io::Write;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let target = FilePath::from_std_path(&dir.path().join("config.toml"));
//!
//! let mut save = SaveFile::create(target.clone()).unwrap();
//! save.write_all(b"answer = 42\n").unwrap();
//! save.commit().unwrap();
//!
//! assert_eq!(target.file_contents(None, 0).unwrap(), b"answer = 42\n");
//! ```

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::NamedTempFile;

use crate::{
    BackendRegistry, FilePath, FilePermissions, FileRead, FileWrite, FsError, Permissions,
    SharedAccess,
};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

enum Backing {
    Local(NamedTempFile),
    Device {
        access: SharedAccess,
        temp: FilePath,
        written: u64,
    },
}

impl std::fmt::Debug for Backing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backing::Local(temp) => f.debug_tuple("Local").field(&temp.path()).finish(),
            Backing::Device { temp, written, .. } => f
                .debug_struct("Device")
                .field("temp", temp)
                .field("written", written)
                .finish(),
        }
    }
}

/// Writer that replaces its target atomically on commit.
///
/// Dropping an open, uncommitted `SaveFile` rolls it back.
#[derive(Debug)]
pub struct SaveFile {
    target: FilePath,
    backing: Option<Backing>,
}

impl SaveFile {
    /// A writer for `target`. Nothing happens on disk until [`open`](Self::open).
    pub fn new(target: FilePath) -> Self {
        Self { target, backing: None }
    }

    /// [`new`](Self::new) followed by [`open`](Self::open).
    pub fn create(target: FilePath) -> Result<Self, FsError> {
        let mut save = Self::new(target);
        save.open()?;
        Ok(save)
    }

    /// Write `data` to `target` atomically.
    pub fn write_atomically(target: &FilePath, data: &[u8]) -> Result<(), FsError> {
        let mut save = Self::create(target.clone())?;
        save.write_all(data).map_err(|e| FsError::CommitIoFailure {
            path: target.clone(),
            reason: e.to_string(),
        })?;
        save.commit()
    }

    /// The file being replaced.
    pub fn target(&self) -> &FilePath {
        &self.target
    }

    /// Returns `true` between [`open`](Self::open) and commit or rollback.
    pub fn is_open(&self) -> bool {
        self.backing.is_some()
    }

    /// Where the new content is written until commit.
    pub fn temp_path(&self) -> Option<FilePath> {
        match self.backing.as_ref()? {
            Backing::Local(temp) => Some(FilePath::from_std_path(temp.path())),
            Backing::Device { temp, .. } => Some(temp.clone()),
        }
    }

    /// Create the temporary file next to the target.
    ///
    /// # Errors
    ///
    /// - [`FsError::TargetNotWritable`] if the target exists but cannot be written
    /// - [`FsError::TempFileCreationFailed`] if the temporary file cannot be created
    pub fn open(&mut self) -> Result<(), FsError> {
        if self.backing.is_some() {
            return Err(FsError::NotSupported {
                operation: "open an already open save file",
            });
        }
        let backing = if self.target.is_local() {
            self.open_local()?
        } else {
            self.open_device()?
        };
        tracing::debug!(path = %self.target, backing = ?backing, "opened save file");
        self.backing = Some(backing);
        Ok(())
    }

    fn open_local(&self) -> Result<Backing, FsError> {
        let Some(native) = self.target.to_std_path() else {
            return Err(FsError::TargetNotWritable { path: self.target.clone() });
        };
        let existing = match std::fs::metadata(&native) {
            Ok(meta) => {
                let writable = meta.is_file()
                    && std::fs::OpenOptions::new().read(true).write(true).open(&native).is_ok();
                if !writable {
                    return Err(FsError::TargetNotWritable { path: self.target.clone() });
                }
                Some(meta.permissions())
            }
            Err(_) => None,
        };

        let dir = native
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let prefix = format!(".{}.", self.target.file_name());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".tmp");
        // A new file gets the default mode; the OS applies the umask at creation.
        #[cfg(unix)]
        if existing.is_none() {
            use std::os::unix::fs::PermissionsExt;
            let mode = Permissions::default_file().mode();
            builder.permissions(std::fs::Permissions::from_mode(mode));
        }
        let creation_failed = |e: io::Error| FsError::TempFileCreationFailed {
            path: self.target.clone(),
            reason: e.to_string(),
        };
        let temp = builder.tempfile_in(dir).map_err(creation_failed)?;
        // An existing target's mode is copied exactly, bypassing the umask.
        if let Some(permissions) = existing {
            temp.as_file().set_permissions(permissions).map_err(creation_failed)?;
        }
        Ok(Backing::Local(temp))
    }

    /// A fresh hidden sibling of the target, e.g. `.name.<pid>-<n>.tmp`.
    fn sibling(&self, extension: &str) -> FilePath {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let name = format!(".{}.{}-{n}.{extension}", self.target.file_name(), std::process::id());
        self.target.parent_dir().path_appended(&name)
    }

    fn open_device(&self) -> Result<Backing, FsError> {
        let access = BackendRegistry::global().resolve(&self.target)?;
        let info = access.stat(&self.target)?;
        let permissions = if info.exists() {
            if !info.is_file() || info.permissions().readonly() {
                return Err(FsError::TargetNotWritable { path: self.target.clone() });
            }
            info.permissions()
        } else {
            Permissions::default_file()
        };

        let temp = self.sibling("tmp");
        access
            .write_file(&temp, b"", None)
            .map_err(|e| FsError::TempFileCreationFailed {
                path: self.target.clone(),
                reason: e.to_string(),
            })?;
        if let Err(err) = access.set_permissions(&temp, permissions) {
            tracing::debug!(
                path = %temp,
                error = %err,
                "could not copy permissions to temporary file"
            );
        }
        Ok(Backing::Device { access, temp, written: 0 })
    }

    /// Replace the target with everything written so far.
    ///
    /// On failure the temporary file is removed and the target holds its old
    /// content.
    ///
    /// # Errors
    ///
    /// [`FsError::CommitIoFailure`] with the underlying error text, or
    /// [`FsError::NotSupported`] if the writer is not open.
    pub fn commit(&mut self) -> Result<(), FsError> {
        let Some(backing) = self.backing.take() else {
            return Err(FsError::NotSupported {
                operation: "commit a save file that is not open",
            });
        };
        let result = match backing {
            Backing::Local(temp) => self.commit_local(temp),
            Backing::Device { access, temp, .. } => self.commit_device(&access, &temp),
        };
        match &result {
            Ok(()) => tracing::debug!(path = %self.target, "committed save file"),
            Err(error) => tracing::warn!(path = %self.target, %error, "save file commit failed"),
        }
        result
    }

    fn commit_failure(&self, reason: impl ToString) -> FsError {
        FsError::CommitIoFailure {
            path: self.target.clone(),
            reason: reason.to_string(),
        }
    }

    fn commit_local(&self, temp: NamedTempFile) -> Result<(), FsError> {
        // Dropping `temp` on any error path deletes the temporary file.
        temp.as_file().sync_all().map_err(|e| self.commit_failure(e))?;
        let Some(native) = self.target.to_std_path() else {
            return Err(self.commit_failure("target is not a local path"));
        };
        let result = temp.persist(&native).map(drop).map_err(|e| self.commit_failure(e.error));
        BackendRegistry::global().stat_cache().invalidate(&self.target);
        result
    }

    fn commit_device(&self, access: &SharedAccess, temp: &FilePath) -> Result<(), FsError> {
        let discard_temp = || {
            if let Err(err) = access.remove_file(temp) {
                tracing::warn!(path = %temp, error = %err, "could not remove temporary file");
            }
        };

        let target_exists = match access.stat(&self.target) {
            Ok(info) => info.exists(),
            Err(err) => {
                discard_temp();
                return Err(self.commit_failure(err));
            }
        };
        // Never reuse a name the user might own, such as `<target>.bak`.
        let mut backup = None;
        if target_exists {
            let candidate = self.sibling("bak");
            match access.exists(&candidate) {
                Ok(false) => backup = Some(candidate),
                Ok(true) => {
                    discard_temp();
                    return Err(self.commit_failure(format!("backup name {candidate} is taken")));
                }
                Err(err) => {
                    discard_temp();
                    return Err(self.commit_failure(err));
                }
            }
        }

        if let Some(backup) = &backup {
            if let Err(err) = access.rename_file(&self.target, backup) {
                discard_temp();
                return Err(self.commit_failure(err));
            }
        }
        if let Err(err) = access.rename_file(temp, &self.target) {
            if let Some(backup) = &backup {
                if let Err(restore) = access.rename_file(backup, &self.target) {
                    tracing::warn!(path = %backup, error = %restore, "could not restore backup");
                }
            }
            discard_temp();
            return Err(self.commit_failure(err));
        }
        if let Some(backup) = &backup {
            if let Err(err) = access.remove_file(backup) {
                tracing::warn!(path = %backup, error = %err, "could not remove backup");
            }
        }
        Ok(())
    }

    /// Discard the written content. The target is left untouched.
    pub fn rollback(&mut self) {
        match self.backing.take() {
            Some(Backing::Local(temp)) => {
                if let Err(err) = temp.close() {
                    tracing::warn!(
                        path = %self.target,
                        error = %err,
                        "could not remove temporary file"
                    );
                }
            }
            Some(Backing::Device { access, temp, .. }) => {
                if let Err(err) = access.remove_file(&temp) {
                    tracing::warn!(path = %temp, error = %err, "could not remove temporary file");
                }
            }
            None => return,
        }
        tracing::debug!(path = %self.target, "rolled back save file");
    }
}

impl io::Write for SaveFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.backing.as_mut() {
            Some(Backing::Local(temp)) => temp.write(buf),
            Some(Backing::Device { access, temp, written }) => {
                access
                    .write_file(temp, buf, Some(*written))
                    .map_err(|e| io::Error::other(e.to_string()))?;
                *written += buf.len() as u64;
                Ok(buf.len())
            }
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "save file is not open")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.backing.as_mut() {
            Some(Backing::Local(temp)) => temp.flush(),
            _ => Ok(()),
        }
    }
}

impl Drop for SaveFile {
    fn drop(&mut self) {
        self.rollback();
    }
}
