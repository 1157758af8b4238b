//! Local file system back end.
//!
//! [`LocalFileAccess`] serves every path with an empty scheme through direct
//! `std::fs` calls. The registry hands it out for local paths without lookup.

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::time::SystemTime;

use crate::{
    DirEntry, Environment, FileDevice, FileDir, FileLink, FilePath, FilePathInfo, FilePermissions,
    FileRead, FileType, FileWrite, FsError, InfoFlags, ListDirIter, ListFilter, OsType, Permissions,
};

/// Direct OS file access for local paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileAccess;

impl LocalFileAccess {
    /// The local back end.
    pub fn new() -> Self {
        Self
    }

    fn native(path: &FilePath, operation: &'static str) -> Result<PathBuf, FsError> {
        if path.is_empty() {
            return Err(FsError::NotFound { path: path.clone() });
        }
        path.to_std_path()
            .ok_or(FsError::NotSupported { operation })
    }
}

fn info_from_metadata(path: &FilePath, meta: &fs::Metadata) -> FilePathInfo {
    let file_type = if meta.file_type().is_symlink() {
        FileType::Symlink
    } else if meta.is_dir() {
        FileType::Directory
    } else {
        FileType::File
    };
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let permissions = permissions_from_metadata(meta);
    let mut info = FilePathInfo::new(file_type, meta.len(), permissions, modified)
        .with_flag(InfoFlags::LOCAL_DISK);
    if is_hidden(path, meta) {
        info = info.with_flag(InfoFlags::HIDDEN);
    }
    if path.is_root_path() {
        info = info.with_flag(InfoFlags::ROOT);
    }
    info
}

#[cfg(unix)]
fn permissions_from_metadata(meta: &fs::Metadata) -> Permissions {
    use std::os::unix::fs::PermissionsExt;
    Permissions::from_mode(meta.permissions().mode())
}

#[cfg(not(unix))]
fn permissions_from_metadata(meta: &fs::Metadata) -> Permissions {
    let base = if meta.permissions().readonly() { 0o444 } else { 0o666 };
    let exec = if meta.is_dir() { 0o111 } else { 0 };
    Permissions::from_mode(base | exec)
}

#[cfg(windows)]
fn is_hidden(path: &FilePath, meta: &fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    meta.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0 || path.file_name().starts_with('.')
}

#[cfg(not(windows))]
fn is_hidden(path: &FilePath, _meta: &fs::Metadata) -> bool {
    let name = path.file_name();
    name.starts_with('.') && name != "." && name != ".."
}

impl FileRead for LocalFileAccess {
    fn exists(&self, path: &FilePath) -> Result<bool, FsError> {
        let native = Self::native(path, "exists")?;
        Ok(native.exists())
    }

    fn stat(&self, path: &FilePath) -> Result<FilePathInfo, FsError> {
        let native = Self::native(path, "stat")?;
        match fs::metadata(&native) {
            Ok(meta) => Ok(info_from_metadata(path, &meta)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FilePathInfo::not_found()),
            Err(e) => Err(FsError::from_io("stat", path, e)),
        }
    }

    fn read_file(
        &self,
        path: &FilePath,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<Vec<u8>, FsError> {
        let native = Self::native(path, "read_file")?;
        let meta = fs::metadata(&native).map_err(|e| FsError::from_io("read_file", path, e))?;
        if meta.is_dir() {
            return Err(FsError::NotAFile { path: path.clone() });
        }
        let mut file = fs::File::open(&native).map_err(|e| FsError::from_io("read_file", path, e))?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset))
                .map_err(|e| FsError::from_io("read_file", path, e))?;
        }
        let mut data = Vec::new();
        let result = match limit {
            Some(limit) => file.take(limit).read_to_end(&mut data),
            None => file.read_to_end(&mut data),
        };
        result.map_err(|e| FsError::from_io("read_file", path, e))?;
        Ok(data)
    }
}

impl FileWrite for LocalFileAccess {
    fn write_file(
        &self,
        path: &FilePath,
        data: &[u8],
        offset: Option<u64>,
    ) -> Result<u64, FsError> {
        let native = Self::native(path, "write_file")?;
        if native.is_dir() {
            return Err(FsError::NotAFile { path: path.clone() });
        }
        let io = |e| FsError::from_io("write_file", path, e);
        match offset {
            None => fs::write(&native, data).map_err(io)?,
            Some(offset) => {
                let mut file = fs::OpenOptions::new().write(true).open(&native).map_err(io)?;
                file.seek(SeekFrom::Start(offset)).map_err(io)?;
                file.write_all(data).map_err(io)?;
            }
        }
        Ok(data.len() as u64)
    }

    fn remove_file(&self, path: &FilePath) -> Result<(), FsError> {
        let native = Self::native(path, "remove_file")?;
        let meta =
            fs::symlink_metadata(&native).map_err(|e| FsError::from_io("remove_file", path, e))?;
        if meta.is_dir() {
            return Err(FsError::NotAFile { path: path.clone() });
        }
        fs::remove_file(&native).map_err(|e| FsError::from_io("remove_file", path, e))
    }

    fn remove_recursively(&self, path: &FilePath) -> Result<(), FsError> {
        let native = Self::native(path, "remove_recursively")?;
        let meta =
            fs::symlink_metadata(&native)
                .map_err(|e| FsError::from_io("remove_recursively", path, e))?;
        let result = if meta.is_dir() {
            fs::remove_dir_all(&native)
        } else {
            fs::remove_file(&native)
        };
        result.map_err(|e| FsError::from_io("remove_recursively", path, e))
    }

    fn copy_file(&self, from: &FilePath, to: &FilePath) -> Result<(), FsError> {
        let src = Self::native(from, "copy_file")?;
        let dst = Self::native(to, "copy_file")?;
        if src.is_dir() {
            return Err(FsError::NotAFile { path: from.clone() });
        }
        fs::copy(&src, &dst)
            .map(|_| ())
            .map_err(|e| FsError::from_io("copy_file", from, e))
    }

    fn rename_file(&self, from: &FilePath, to: &FilePath) -> Result<(), FsError> {
        let src = Self::native(from, "rename_file")?;
        let dst = Self::native(to, "rename_file")?;
        fs::rename(&src, &dst).map_err(|e| FsError::from_io("rename_file", from, e))
    }
}

impl FileDir for LocalFileAccess {
    fn list_directory(&self, path: &FilePath, filter: &ListFilter) -> Result<ListDirIter, FsError> {
        let native = Self::native(path, "list_directory")?;
        let meta = fs::metadata(&native).map_err(|e| FsError::from_io("list_directory", path, e))?;
        if !meta.is_dir() {
            return Err(FsError::NotADirectory { path: path.clone() });
        }
        let reader =
            fs::read_dir(&native).map_err(|e| FsError::from_io("list_directory", path, e))?;

        let mut entries = Vec::new();
        for item in reader {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    entries.push(Err(FsError::from_io("list_directory", path, e)));
                    continue;
                }
            };
            let name = item.file_name().to_string_lossy().into_owned();
            let child = path.path_appended(&name);
            let meta = fs::metadata(item.path()).or_else(|_| fs::symlink_metadata(item.path()));
            let info = match meta {
                Ok(meta) => info_from_metadata(&child, &meta),
                Err(e) => {
                    entries.push(Err(FsError::from_io("list_directory", &child, e)));
                    continue;
                }
            };
            if filter.accepts(&name, &info) {
                entries.push(Ok(DirEntry {
                    path: child,
                    info: filter.with_info.then_some(info),
                }));
            }
        }
        entries.sort_by(|a, b| match (a, b) {
            (Ok(a), Ok(b)) => a.name().cmp(b.name()),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => std::cmp::Ordering::Equal,
        });
        Ok(ListDirIter::from_vec(entries))
    }

    fn create_dir(&self, path: &FilePath) -> Result<(), FsError> {
        let native = Self::native(path, "create_dir")?;
        fs::create_dir(&native).map_err(|e| FsError::from_io("create_dir", path, e))
    }

    fn create_dir_all(&self, path: &FilePath) -> Result<(), FsError> {
        let native = Self::native(path, "create_dir_all")?;
        fs::create_dir_all(&native).map_err(|e| FsError::from_io("create_dir_all", path, e))
    }
}

impl FileLink for LocalFileAccess {
    #[cfg(unix)]
    fn create_symlink(&self, target: &FilePath, link: &FilePath) -> Result<(), FsError> {
        let native = Self::native(link, "create_symlink")?;
        std::os::unix::fs::symlink(target.native_path(), &native)
            .map_err(|e| FsError::from_io("create_symlink", link, e))
    }

    #[cfg(windows)]
    fn create_symlink(&self, target: &FilePath, link: &FilePath) -> Result<(), FsError> {
        let native = Self::native(link, "create_symlink")?;
        let target_native = PathBuf::from(target.native_path());
        let points_to_dir = link
            .parent_dir()
            .resolve_path(target)
            .to_std_path()
            .is_some_and(|p| p.is_dir());
        let result = if points_to_dir {
            std::os::windows::fs::symlink_dir(&target_native, &native)
        } else {
            std::os::windows::fs::symlink_file(&target_native, &native)
        };
        result.map_err(|e| FsError::from_io("create_symlink", link, e))
    }

    #[cfg(not(any(unix, windows)))]
    fn create_symlink(&self, _target: &FilePath, _link: &FilePath) -> Result<(), FsError> {
        Err(FsError::NotSupported {
            operation: "create_symlink",
        })
    }

    fn symlink_target(&self, path: &FilePath) -> Result<FilePath, FsError> {
        let native = Self::native(path, "symlink_target")?;
        let meta =
            fs::symlink_metadata(&native).map_err(|e| FsError::from_io("symlink_target", path, e))?;
        if !meta.file_type().is_symlink() {
            return Err(FsError::InvalidData {
                path: path.clone(),
                details: "not a symlink".into(),
            });
        }
        let target =
            fs::read_link(&native).map_err(|e| FsError::from_io("symlink_target", path, e))?;
        Ok(FilePath::from_std_path(&target))
    }

    fn stat_link(&self, path: &FilePath) -> Result<FilePathInfo, FsError> {
        let native = Self::native(path, "stat_link")?;
        match fs::symlink_metadata(&native) {
            Ok(meta) => Ok(info_from_metadata(path, &meta)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FilePathInfo::not_found()),
            Err(e) => Err(FsError::from_io("stat_link", path, e)),
        }
    }
}

impl FilePermissions for LocalFileAccess {
    fn permissions(&self, path: &FilePath) -> Result<Permissions, FsError> {
        let native = Self::native(path, "permissions")?;
        let meta = fs::metadata(&native).map_err(|e| FsError::from_io("permissions", path, e))?;
        Ok(permissions_from_metadata(&meta))
    }

    #[cfg(unix)]
    fn set_permissions(&self, path: &FilePath, permissions: Permissions) -> Result<(), FsError> {
        use std::os::unix::fs::PermissionsExt;
        let native = Self::native(path, "set_permissions")?;
        fs::set_permissions(&native, fs::Permissions::from_mode(permissions.mode()))
            .map_err(|e| FsError::from_io("set_permissions", path, e))
    }

    #[cfg(not(unix))]
    fn set_permissions(&self, path: &FilePath, permissions: Permissions) -> Result<(), FsError> {
        let native = Self::native(path, "set_permissions")?;
        let meta = fs::metadata(&native).map_err(|e| FsError::from_io("set_permissions", path, e))?;
        let mut perms = meta.permissions();
        perms.set_readonly(permissions.readonly());
        fs::set_permissions(&native, perms)
            .map_err(|e| FsError::from_io("set_permissions", path, e))
    }
}

impl FileDevice for LocalFileAccess {
    fn os_type(&self, _path: &FilePath) -> OsType {
        OsType::host()
    }

    fn environment(&self, _path: &FilePath) -> Result<Environment, FsError> {
        Ok(Environment::system())
    }
}
