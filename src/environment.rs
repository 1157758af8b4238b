//! Process and device environments with `PATH` lookup.

use crate::{FilePath, OsType};

/// An ordered set of environment variables for a given [`OsType`].
///
/// Variable names compare case-insensitively for Windows environments.
/// Insertion order is kept so that a device environment can be replayed in the
/// order the device reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    os: OsType,
    vars: Vec<(String, String)>,
}

const DEFAULT_PATHEXT: &str = ".COM;.EXE;.BAT;.CMD";

impl Environment {
    /// An empty environment for `os`.
    pub fn new(os: OsType) -> Self {
        Self {
            os,
            vars: Vec::new(),
        }
    }

    /// The environment of the current process.
    pub fn system() -> Self {
        let vars = std::env::vars_os()
            .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
            .collect();
        Self {
            os: OsType::host(),
            vars,
        }
    }

    /// Build from `(name, value)` pairs.
    pub fn from_pairs<I, K, V>(os: OsType, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Self::new(os);
        for (k, v) in pairs {
            env.set(k, v);
        }
        env
    }

    /// OS whose conventions this environment follows.
    pub fn os_type(&self) -> OsType {
        self.os
    }

    fn position(&self, name: &str) -> Option<usize> {
        if self.os.is_windows() {
            self.vars.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))
        } else {
            self.vars.iter().position(|(k, _)| k == name)
        }
    }

    /// Value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.vars[i].1.as_str())
    }

    /// Returns `true` if `name` is set.
    pub fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set `name` to `value`, keeping its position if already present.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.vars[i].1 = value,
            None => self.vars.push((name, value)),
        }
    }

    /// Remove `name`.
    pub fn unset(&mut self, name: &str) {
        if let Some(i) = self.position(name) {
            self.vars.remove(i);
        }
    }

    /// Append `value` to a list variable, or set it if missing or empty.
    pub fn append_or_set(&mut self, name: &str, value: &str) {
        let sep = self.os.path_list_separator();
        let updated = match self.get(name) {
            Some(current) if !current.is_empty() => format!("{current}{sep}{value}"),
            _ => value.to_string(),
        };
        self.set(name, updated);
    }

    /// Prepend `value` to a list variable, or set it if missing or empty.
    pub fn prepend_or_set(&mut self, name: &str, value: &str) {
        let sep = self.os.path_list_separator();
        let updated = match self.get(name) {
            Some(current) if !current.is_empty() => format!("{value}{sep}{current}"),
            _ => value.to_string(),
        };
        self.set(name, updated);
    }

    /// Iterate `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if no variable is set.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// The `PATH` entries as raw strings, `/`-separated, empty entries skipped.
    pub fn path_list(&self) -> Vec<String> {
        let Some(path) = self.get("PATH") else {
            return Vec::new();
        };
        path.split(self.os.path_list_separator())
            .filter(|s| !s.is_empty())
            .map(|s| {
                if self.os.is_windows() {
                    s.replace('\\', "/")
                } else {
                    s.to_string()
                }
            })
            .collect()
    }

    /// File names to try for `executable`, honoring `PATHEXT` on Windows.
    pub fn executable_candidates(&self, executable: &str) -> Vec<String> {
        if !self.os.is_windows() {
            return vec![executable.to_string()];
        }
        let name = executable.rsplit(['/', '\\']).next().unwrap_or(executable);
        if name.contains('.') {
            return vec![executable.to_string()];
        }
        let exts = self.get("PATHEXT").unwrap_or(DEFAULT_PATHEXT);
        let mut out: Vec<String> = exts
            .split(';')
            .filter(|e| !e.is_empty())
            .map(|e| format!("{executable}{}", e.to_ascii_lowercase()))
            .collect();
        out.push(executable.to_string());
        out
    }

    /// Search `executable` in `directories`, returning the first accepted candidate.
    ///
    /// `accept` decides whether a candidate qualifies, typically by checking that
    /// it is an executable file on its device.
    pub fn search_in_directories(
        &self,
        executable: &str,
        directories: &[FilePath],
        accept: impl Fn(&FilePath) -> bool,
    ) -> Option<FilePath> {
        let candidates = self.executable_candidates(executable);
        for dir in directories.iter().filter(|d| !d.is_empty()) {
            for name in &candidates {
                let candidate = dir.path_appended(name);
                if accept(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Search `executable` in `additional_dirs` followed by `PATH`.
    ///
    /// `PATH` entries are placed on the device of `device`. An absolute
    /// `executable` is checked directly.
    pub fn search_in_path(
        &self,
        executable: &str,
        device: &FilePath,
        additional_dirs: &[FilePath],
        accept: impl Fn(&FilePath) -> bool,
    ) -> Option<FilePath> {
        if executable.is_empty() {
            return None;
        }
        let normalized = if self.os.is_windows() {
            executable.replace('\\', "/")
        } else {
            executable.to_string()
        };
        if self.os.is_absolute(&normalized) {
            return self
                .executable_candidates(&normalized)
                .into_iter()
                .map(|c| device.with_new_path(&c))
                .find(|c| accept(c));
        }
        let mut dirs: Vec<FilePath> = additional_dirs.to_vec();
        dirs.extend(self.path_list().iter().map(|p| device.with_new_path(p)));
        self.search_in_directories(executable, &dirs, accept)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(OsType::host())
    }
}
