//! Integration tests for devpath.
//!
//! These tests drive the public API the way an editor would: paths are parsed
//! from user text, routed through the registry to local or device back ends,
//! walked, searched, saved and watched.

use devpath::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

// ============================================================================
// Test Backend: counts stat calls and forwards to a MemoryFileAccess
// ============================================================================

#[derive(Default)]
struct CountingAccess {
    inner: MemoryFileAccess,
    stats: AtomicUsize,
}

impl CountingAccess {
    fn stat_calls(&self) -> usize {
        self.stats.load(Ordering::SeqCst)
    }
}

impl FileRead for CountingAccess {
    fn stat(&self, path: &FilePath) -> Result<FilePathInfo, FsError> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        self.inner.stat(path)
    }

    fn read_file(
        &self,
        path: &FilePath,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<Vec<u8>, FsError> {
        self.inner.read_file(path, limit, offset)
    }
}

impl FileWrite for CountingAccess {
    fn write_file(
        &self,
        path: &FilePath,
        data: &[u8],
        offset: Option<u64>,
    ) -> Result<u64, FsError> {
        self.inner.write_file(path, data, offset)
    }

    fn remove_file(&self, path: &FilePath) -> Result<(), FsError> {
        self.inner.remove_file(path)
    }

    fn remove_recursively(&self, path: &FilePath) -> Result<(), FsError> {
        self.inner.remove_recursively(path)
    }

    fn copy_file(&self, from: &FilePath, to: &FilePath) -> Result<(), FsError> {
        self.inner.copy_file(from, to)
    }

    fn rename_file(&self, from: &FilePath, to: &FilePath) -> Result<(), FsError> {
        self.inner.rename_file(from, to)
    }
}

impl FileDir for CountingAccess {
    fn list_directory(&self, path: &FilePath, filter: &ListFilter) -> Result<ListDirIter, FsError> {
        self.inner.list_directory(path, filter)
    }

    fn create_dir(&self, path: &FilePath) -> Result<(), FsError> {
        self.inner.create_dir(path)
    }

    fn create_dir_all(&self, path: &FilePath) -> Result<(), FsError> {
        self.inner.create_dir_all(path)
    }
}

impl FileLink for CountingAccess {
    fn create_symlink(&self, target: &FilePath, link: &FilePath) -> Result<(), FsError> {
        self.inner.create_symlink(target, link)
    }

    fn symlink_target(&self, path: &FilePath) -> Result<FilePath, FsError> {
        self.inner.symlink_target(path)
    }

    fn stat_link(&self, path: &FilePath) -> Result<FilePathInfo, FsError> {
        self.inner.stat_link(path)
    }
}

impl FilePermissions for CountingAccess {
    fn permissions(&self, path: &FilePath) -> Result<Permissions, FsError> {
        self.inner.permissions(path)
    }

    fn set_permissions(&self, path: &FilePath, permissions: Permissions) -> Result<(), FsError> {
        self.inner.set_permissions(path, permissions)
    }
}

impl FileDevice for CountingAccess {
    fn os_type(&self, path: &FilePath) -> OsType {
        self.inner.os_type(path)
    }

    fn environment(&self, path: &FilePath) -> Result<Environment, FsError> {
        self.inner.environment(path)
    }
}

/// A memory device registered globally under the `itest` scheme.
fn device(host: &str) -> (Arc<MemoryFileAccess>, impl Fn(&str) -> FilePath) {
    let mem = Arc::new(MemoryFileAccess::new());
    BackendRegistry::global().register("itest", host, mem.clone());
    let host = host.to_string();
    (mem, move |p: &str| FilePath::from_parts("itest", &host, p))
}

fn collect(
    search: &FileSearch,
    files: &mut dyn FileIterator) -> (Vec<SearchResultItem>, SearchSummary,
) {
    let mut hits = Vec::new();
    let summary = search.run(files, |event| {
        if let SearchEvent::Results(batch) = event {
            hits.extend(batch);
        }
    });
    (hits, summary)
}

// ============================================================================
// Tests: Trait Hierarchy Verification
// ============================================================================

#[test]
fn custom_backend_gets_composite_traits() {
    fn use_access<B: FileAccess>(_: &B) {}
    fn use_device<B: DeviceFileAccess>(_: &B) {}

    let backend = CountingAccess::default();
    use_access(&backend);
    use_device(&backend);
}

#[test]
fn backends_usable_as_trait_objects() {
    let backends: Vec<SharedAccess> = vec![
        Arc::new(MemoryFileAccess::new()),
        Arc::new(LocalFileAccess::new()),
        Arc::new(CountingAccess::default()),
    ];
    for backend in &backends {
        let dyn_ref: &dyn DeviceFileAccess = &**backend;
        let _ = dyn_ref.os_type(&FilePath::from_string("/"));
    }
}

#[test]
fn extension_methods_work_through_arc() {
    let mem: SharedAccess = Arc::new(MemoryFileAccess::new());
    let file = FilePath::from_string("/note.txt");
    mem.write_file(&file, b"remember", None).unwrap();
    assert!(mem.is_file(&file).unwrap());
    assert_eq!(mem.file_size(&file).unwrap(), 8);
    assert_eq!(mem.read_to_string(&file).unwrap(), "remember");
}

// ============================================================================
// Tests: Routing and Stat Caching
// ============================================================================

#[test]
fn registry_routes_by_scheme_and_host() {
    let registry = BackendRegistry::new();
    let a = Arc::new(MemoryFileAccess::new());
    let b = Arc::new(MemoryFileAccess::new());
    registry.register("ssh", "alpha", a.clone());
    registry.register_scheme("ssh", b.clone());

    let on_alpha = FilePath::from_string("ssh://alpha/x.txt");
    let on_beta = FilePath::from_string("ssh://beta/x.txt");
    registry.resolve(&on_alpha).unwrap().write_file(&on_alpha, b"a", None).unwrap();
    registry.resolve(&on_beta).unwrap().write_file(&on_beta, b"bb", None).unwrap();

    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    assert!(registry.is_available(&FilePath::from_string("/local/path")));

    let err = registry
        .resolve(&FilePath::from_string("ftp://nowhere/x"))
        .err().unwrap();
    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
}

#[test]
fn repeated_stats_are_served_from_cache_until_a_write() {
    let registry = BackendRegistry::new();
    let backend = Arc::new(CountingAccess::default());
    registry.register("count", "box", backend.clone());
    let file = FilePath::from_string("count://box/data.bin");
    let access = registry.resolve(&file).unwrap();

    access.write_file(&file, b"12345", None).unwrap();
    assert_eq!(access.stat(&file).unwrap().size, 5);
    assert_eq!(access.stat(&file).unwrap().size, 5);
    assert_eq!(backend.stat_calls(), 1);

    access.write_file(&file, b"1234567", None).unwrap();
    assert_eq!(access.stat(&file).unwrap().size, 7);
    assert_eq!(backend.stat_calls(), 2);

    let stats = registry.stat_cache().stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
}

#[test]
fn device_paths_answer_through_path_methods() {
    let (_mem, p) = device("pathops");
    let dir = p("/project/src");
    dir.create_dir().unwrap();
    let file = dir.path_appended("main.rs");
    file.write_file_contents(b"fn main() {}\n", None).unwrap();

    assert!(file.is_file());
    assert!(dir.is_dir());
    assert_eq!(file.file_size().unwrap(), 13);

    let renamed = file.with_replaced_suffix("txt");
    file.rename_file(&renamed).unwrap();
    assert!(!file.exists());
    assert_eq!(renamed.file_contents(None, 0).unwrap(), b"fn main() {}\n");

    let names: Vec<String> = dir
        .dir_entries(&ListFilter::all())
        .unwrap()
        .iter()
        .map(|e| e.path.file_name().to_string())
        .collect();
    assert_eq!(names, ["main.txt"]);
}

// ============================================================================
// Tests: Path Values
// ============================================================================

#[test]
fn user_input_round_trips_through_display() {
    for text in ["/usr/lib/x.so", "docker://box/etc/hosts", "/tmp/../var//log"] {
        let path = FilePath::from_user_input(text);
        assert_eq!(FilePath::from_string(&path.to_string()), path, "{text}");
    }
}

#[test]
fn relative_paths_resolve_back_to_the_target() {
    let anchor = FilePath::from_string("ssh://host/home/me/project");
    let target = FilePath::from_string("ssh://host/home/me/lib/util.rs");
    let relative = target.relative_path_from(&anchor);
    assert_eq!(relative.path(), "../lib/util.rs");
    assert_eq!(anchor.resolve_path(&relative), target);
}

#[test]
fn local_paths_map_to_std_paths() {
    let dir = tempfile::tempdir().unwrap();
    let path = FilePath::from_std_path(dir.path());
    assert!(path.is_local());
    assert_eq!(path.to_std_path().unwrap(), dir.path());
    assert!(path.is_dir());
    assert!(path.is_writable_dir());
}

// ============================================================================
// Tests: Error Handling Verification
// ============================================================================

#[test]
fn errors_carry_the_failing_path() {
    let (_mem, p) = device("errors");
    let missing = p("/missing.txt");
    let err = missing.file_contents(None, 0).unwrap_err();
    assert!(matches!(err, FsError::NotFound { ref path } if *path == missing));
    assert!(err.to_string().contains("itest://errors/missing.txt"));
}

#[test]
fn unregistered_device_is_reported_not_panicked() {
    let path = FilePath::from_string("nobody://home/file");
    assert!(!path.exists());
    let err = path.info().unwrap_err();
    assert!(matches!(err, FsError::BackendUnavailable { .. }));
}

#[test]
fn invalid_search_pattern_is_rejected_up_front() {
    let params = SearchParameters::new("(unclosed", FindFlags::REGULAR_EXPRESSION);
    let err = FileSearch::new(params).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPattern);
}

// ============================================================================
// Tests: Realistic Workflows
// ============================================================================

#[test]
fn workflow_walk_and_search_local_tree() {
    let dir = tempfile::tempdir().unwrap();
    let root = FilePath::from_std_path(dir.path());
    root.path_appended("src").create_dir().unwrap();
    root.path_appended("target/debug").create_dir().unwrap();
    root.path_appended("src/lib.rs")
        .write_file_contents(b"pub fn answer() -> u32 {\n    42\n}\n", None)
        .unwrap();
    root.path_appended("src/main.rs")
        .write_file_contents(b"fn main() {\n    println!(\"{}\", answer());\n}\n", None)
        .unwrap();
    root.path_appended("target/debug/gen.rs")
        .write_file_contents(b"answer answer answer\n", None)
        .unwrap();
    root.path_appended("README.md")
        .write_file_contents(b"answer\n", None)
        .unwrap();

    let filter = FileFilter::from_text("*.rs", "*/target/*").unwrap();
    let mut walker = DirectoryWalker::new(vec![root.clone()], filter);
    let search = FileSearch::new(SearchParameters::new("answer", FindFlags::WHOLE_WORDS)).unwrap();
    let (mut hits, summary) = collect(&search, &mut walker);
    hits.sort_by(|a, b| a.path.cmp(&b.path));

    assert_eq!(summary.files_searched, 2);
    assert_eq!(summary.matches, 2);
    assert!(!summary.cancelled);
    assert_eq!(hits[0].path.file_name(), "lib.rs");
    assert_eq!((hits[0].line, hits[0].column), (1, 7));
    assert_eq!(hits[1].path.file_name(), "main.rs");
    assert_eq!(hits[1].line, 2);
    assert_eq!(walker.current_progress(), MAX_PROGRESS);
}

#[test]
fn workflow_search_and_replace_with_preserved_case() {
    let (mem, p) = device("replace");
    mem.create_dir_all(&p("/doc")).unwrap();
    mem.write_file(&p("/doc/a.txt"), b"Color and color and COLOR\n", None)
        .unwrap();

    let flags = FindFlags::PRESERVE_CASE;
    let search = FileSearch::new(SearchParameters::new("color", flags)).unwrap();
    let mut files = FileListIterator::new([p("/doc/a.txt")]);
    let (hits, _) = collect(&search, &mut files);

    let replaced: Vec<String> = hits.iter().map(|h| h.replacement_text("shade")).collect();
    assert_eq!(replaced, ["Shade", "shade", "SHADE"]);
}

#[test]
fn workflow_search_sees_unsaved_editor_contents() {
    let (mem, p) = device("unsaved");
    mem.create_dir_all(&p("/src")).unwrap();
    mem.write_file(&p("/src/a.rs"), b"old text\n", None).unwrap();

    let overrides = HashMap::from([(p("/src/a.rs"), "new text\n".to_string())]);
    let search = FileSearch::new(SearchParameters::new("new", FindFlags::empty()))
        .unwrap()
        .with_content_overrides(overrides);
    let mut walker = DirectoryWalker::new(vec![p("/src")], FileFilter::all());
    let (hits, summary) = collect(&search, &mut walker);
    assert_eq!(summary.matches, 1);
    assert_eq!(hits[0].line_text, "new text");
}

#[test]
fn workflow_background_search_can_be_cancelled() {
    let (mem, p) = device("background");
    mem.create_dir_all(&p("/many")).unwrap();
    for i in 0..50 {
        mem.write_file(&p(&format!("/many/f{i}.txt")), b"needle\n", None)
            .unwrap();
    }
    // Start paused so no worker gets to a file before the cancel.
    let token = CancellationToken::new();
    token.set_paused(true);
    let search = FileSearch::new(SearchParameters::new("needle", FindFlags::empty()))
        .unwrap()
        .with_cancellation(token);
    let walker = DirectoryWalker::new(vec![p("/many")], FileFilter::all());
    let handle = search.spawn(Box::new(walker)).unwrap();
    handle.cancel();
    let summary = handle.wait();
    assert!(summary.cancelled);
    assert_eq!(summary.files_searched, 0);
    assert_eq!(summary.matches, 0);
}

#[test]
fn workflow_atomic_save_of_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = FilePath::from_std_path(dir.path()).path_appended("config.toml");
    file.write_file_contents(b"version = 1\n", None).unwrap();
    assert_eq!(file.file_size().unwrap(), 12);

    SaveFile::write_atomically(&file, b"version = 2\nname = \"x\"\n").unwrap();
    assert_eq!(file.file_contents(None, 0).unwrap(), b"version = 2\nname = \"x\"\n");
    // The cached snapshot was dropped on commit.
    assert_eq!(file.file_size().unwrap(), 23);

    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn workflow_abandoned_save_leaves_device_file_untouched() {
    let (mem, p) = device("abandon");
    let file = p("/keep.txt");
    mem.write_file(&file, b"original", None).unwrap();
    {
        use std::io::Write;
        let mut save = SaveFile::create(file.clone()).unwrap();
        save.write_all(b"half written").unwrap();
    }
    assert_eq!(mem.read_file(&file, None, 0).unwrap(), b"original");
    assert_eq!(mem.len(), 1);
}

#[test]
fn workflow_watch_saved_file() {
    let (mem, p) = device("watchsave");
    let file = p("/w/settings.json");
    mem.create_dir_all(&p("/w")).unwrap();
    mem.write_file(&file, b"{}", None).unwrap();

    let facility = ManualWatchFacility::new();
    let shared = facility.clone();
    let coordinator = Arc::new(WatchCoordinator::new(WatchConfig::default(), move || {
        Ok(Box::new(shared.clone()) as Box<dyn WatchFacility>)
    }));
    let editor = coordinator.watcher(0).unwrap();
    let explorer = coordinator.watcher(0).unwrap();
    editor.add_file(&file, WatchMode::NotifyOnAnyChange).unwrap();
    explorer.add_directory(&p("/w")).unwrap();
    assert_eq!(coordinator.os_watch_count(), 2);

    SaveFile::write_atomically(&file, b"{\"a\": 1}").unwrap();
    facility.push(file.clone());
    let now = Instant::now();
    coordinator.poll_at(now);

    let editor_events: Vec<_> = editor.receiver().try_iter().collect();
    assert_eq!(editor_events, [WatchNotification::FileChanged(file.clone())]);
    assert!(explorer.receiver().try_iter().next().is_none());

    coordinator.poll_at(now + Duration::from_secs(1));
    let explorer_events: Vec<_> = explorer.receiver().try_iter().collect();
    assert_eq!(explorer_events, [WatchNotification::DirectoryChanged(p("/w"))]);

    drop(editor);
    drop(explorer);
    assert_eq!(coordinator.group_count(), 0);
    assert!(facility.watched().is_empty());
}

#[test]
fn workflow_concurrent_device_access() {
    let (_mem, p) = device("threads");
    let dir = p("/shared");
    dir.create_dir().unwrap();

    std::thread::scope(|scope| {
        for t in 0..4 {
            let dir = dir.clone();
            scope.spawn(move || {
                for i in 0..10 {
                    let file = dir.path_appended(&format!("t{t}-{i}.txt"));
                    file.write_file_contents(b"x", None).unwrap();
                    assert!(file.exists());
                }
            });
        }
    });

    assert_eq!(dir.dir_entries(&ListFilter::files()).unwrap().len(), 40);
}
