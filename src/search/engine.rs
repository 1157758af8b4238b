//! The worker pool that runs a search.

use std::borrow::Cow;
use std::collections::HashMap;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, TrySendError};

use super::codec::codec_or_default;
use super::matcher::Matcher;
use super::{display_line, SearchEvent, SearchParameters, SearchResultItem, SearchSummary};
use crate::{CancellationToken, FileItem, FileIterator, FilePath, FsError};

/// How long the feeder waits for results while the work queue is full.
const POLL: Duration = Duration::from_millis(10);

enum Outcome {
    /// `complete` is unset when cancellation cut the file short.
    Searched {
        items: Vec<SearchResultItem>,
        complete: bool,
    },
    Skipped {
        path: FilePath,
        error: FsError,
    },
}

/// Accumulates worker output into batched events on the calling thread.
struct Collector<'a> {
    sink: &'a mut dyn FnMut(SearchEvent),
    batch: Vec<SearchResultItem>,
    batch_size: usize,
    last_progress: Option<usize>,
    summary: SearchSummary,
}

impl<'a> Collector<'a> {
    fn new(sink: &'a mut dyn FnMut(SearchEvent), batch_size: usize) -> Self {
        Self {
            sink,
            batch: Vec::new(),
            batch_size: batch_size.max(1),
            last_progress: None,
            summary: SearchSummary::default(),
        }
    }

    fn accept(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Searched { items, complete } => {
                if complete {
                    self.summary.files_searched += 1;
                }
                self.summary.matches += items.len();
                for item in items {
                    self.batch.push(item);
                    if self.batch.len() >= self.batch_size {
                        self.flush();
                    }
                }
            }
            Outcome::Skipped { path, error } => {
                self.summary.files_skipped += 1;
                (self.sink)(SearchEvent::FileSkipped { path, error });
            }
        }
    }

    fn progress(&mut self, value: usize, max: usize) {
        if self.last_progress != Some(value) {
            self.last_progress = Some(value);
            self.flush();
            (self.sink)(SearchEvent::Progress { value, max });
        }
    }

    fn flush(&mut self) {
        if !self.batch.is_empty() {
            (self.sink)(SearchEvent::Results(std::mem::take(&mut self.batch)));
        }
    }

    fn finish(mut self, cancelled: bool) -> SearchSummary {
        self.flush();
        self.summary.cancelled = cancelled;
        self.summary
    }
}

/// A configured search, ready to run over any [`FileIterator`].
///
/// Each file is one unit of work for the pool. A file that cannot be read is
/// reported as [`SearchEvent::FileSkipped`] and the search goes on.
///
/// # Example
///
/// ```rust
/// use devpath::{FileListIterator, FilePath, FileSearch, FindFlags, SearchEvent, SearchParameters};
/// use std::collections::HashMap;
///
/// let doc = FilePath::from_string("/unsaved/notes.txt");
/// let overrides = HashMap::from([(doc.clone(), "todo: ship it".to_string())]);
/// let search = FileSearch::new(SearchParameters::new("ship", FindFlags::WHOLE_WORDS))
///     .unwrap()
///     .with_content_overrides(overrides);
///
/// let mut hits = Vec::new();
/// let summary = search.run(&mut FileListIterator::new([doc]), |event| {
///     if let SearchEvent::Results(batch) = event {
///         hits.extend(batch);
///     }
/// });
/// assert_eq!(summary.matches, 1);
/// assert_eq!(hits[0].column, 6);
/// ```
#[derive(Debug)]
pub struct FileSearch {
    params: SearchParameters,
    matcher: Matcher,
    overrides: HashMap<FilePath, String>,
    cancel: CancellationToken,
}

impl FileSearch {
    /// Compile the search term.
    ///
    /// # Errors
    ///
    /// [`FsError::InvalidPattern`] for a regular expression that does not compile.
    pub fn new(params: SearchParameters) -> Result<Self, FsError> {
        let matcher = Matcher::new(&params.term, params.flags)?;
        Ok(Self {
            params,
            matcher,
            overrides: HashMap::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Search these texts instead of reading the files, e.g. unsaved editor buffers.
    pub fn with_content_overrides(mut self, overrides: HashMap<FilePath, String>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Use `token` to cancel or pause this search.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The token controlling this search.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The parameters this search was created with.
    pub fn parameters(&self) -> &SearchParameters {
        &self.params
    }

    /// Search an in-memory text as if it were the content of `path`.
    pub fn search_text(&self, path: &FilePath, text: &str) -> Vec<SearchResultItem> {
        self.scan(path, text, &CancellationToken::new()).0
    }

    /// Matches in `text` and whether the whole text was scanned.
    fn scan(
        &self,
        path: &FilePath,
        text: &str,
        cancel: &CancellationToken,
    ) -> (Vec<SearchResultItem>, bool) {
        if self.matcher.is_empty() {
            return (Vec::new(), true);
        }
        let found = self.matcher.find_in_text(text, cancel);
        let items = found
            .hits
            .into_iter()
            .map(|(line, text, m)| SearchResultItem {
                path: path.clone(),
                line,
                column: m.column,
                length: m.length,
                line_text: display_line(text, self.params.max_line_length),
                captures: m.captures,
                flags: self.params.flags,
            })
            .collect();
        (items, found.complete)
    }

    fn search_item(&self, item: &FileItem) -> Outcome {
        tracing::trace!(path = %item.path, "searching file");
        let text = match self.overrides.get(&item.path) {
            Some(text) => Cow::Borrowed(text.as_str()),
            None => match item.path.file_contents(None, 0) {
                Ok(bytes) => Cow::Owned(codec_or_default(item.encoding.as_deref()).decode(&bytes)),
                Err(error) => {
                    tracing::warn!(path = %item.path, %error, "skipping unreadable file");
                    return Outcome::Skipped {
                        path: item.path.clone(),
                        error,
                    };
                }
            },
        };
        let (items, complete) = self.scan(&item.path, &text, &self.cancel);
        if !complete {
            tracing::debug!(path = %item.path, matches = items.len(), "search cancelled mid-file");
        }
        Outcome::Searched { items, complete }
    }

    /// Search every file of `files`, reporting events to `sink` on the calling thread.
    ///
    /// Files are discovered lazily on the calling thread while the worker pool
    /// scans them. Returns when all files were searched or the search was cancelled.
    pub fn run(
        &self,
        files: &mut dyn FileIterator,
        mut sink: impl FnMut(SearchEvent),
    ) -> SearchSummary {
        let mut collector = Collector::new(&mut sink, self.params.batch_size);
        if self.matcher.is_empty() {
            return collector.finish(self.cancel.is_cancelled());
        }
        let threads = self.params.threads.max(1);
        tracing::debug!(term = %self.params.term, threads, "starting search");

        std::thread::scope(|scope| {
            let (work_tx, work_rx) = crossbeam_channel::bounded::<FileItem>(threads * 2);
            let (done_tx, done_rx) = crossbeam_channel::unbounded::<Outcome>();
            for _ in 0..threads {
                let work_rx = work_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for item in work_rx {
                        if !self.cancel.wait_while_paused() {
                            break;
                        }
                        if done_tx.send(self.search_item(&item)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(work_rx);
            drop(done_tx);

            let mut index = 0;
            'feed: while !self.cancel.is_cancelled() {
                files.update(index);
                let Some(item) = files.item(index).cloned() else {
                    break;
                };
                index += 1;
                collector.progress(files.current_progress(), files.max_progress());

                let mut pending = item;
                loop {
                    match work_tx.try_send(pending) {
                        Ok(()) => break,
                        Err(TrySendError::Full(back)) => {
                            pending = back;
                            if let Ok(outcome) = done_rx.recv_timeout(POLL) {
                                collector.accept(outcome);
                            }
                            if self.cancel.is_cancelled() {
                                break 'feed;
                            }
                        }
                        Err(TrySendError::Disconnected(_)) => break 'feed,
                    }
                }
                while let Ok(outcome) = done_rx.try_recv() {
                    collector.accept(outcome);
                }
            }
            collector.progress(files.current_progress(), files.max_progress());
            drop(work_tx);
            for outcome in done_rx {
                collector.accept(outcome);
            }
        });

        let summary = collector.finish(self.cancel.is_cancelled());
        tracing::debug!(
            files = summary.files_searched,
            skipped = summary.files_skipped,
            matches = summary.matches,
            cancelled = summary.cancelled,
            "search finished"
        );
        summary
    }

    /// Run the search on a background thread.
    ///
    /// Events arrive on [`SearchHandle::events`]. Dropping the handle cancels the search.
    pub fn spawn(self, mut files: Box<dyn FileIterator>) -> Result<SearchHandle, FsError> {
        let (tx, events) = crossbeam_channel::unbounded();
        let cancel = self.cancel.clone();
        let thread = std::thread::Builder::new()
            .name("devpath-search".to_string())
            .spawn(move || {
                self.run(files.as_mut(), |event| {
                    let _ = tx.send(event);
                })
            })?;
        Ok(SearchHandle {
            events,
            cancel,
            thread: Some(thread),
        })
    }
}

/// A search running on a background thread.
#[derive(Debug)]
pub struct SearchHandle {
    events: Receiver<SearchEvent>,
    cancel: CancellationToken,
    thread: Option<JoinHandle<SearchSummary>>,
}

impl SearchHandle {
    /// Events as they are produced. The channel disconnects when the search ends.
    pub fn events(&self) -> &Receiver<SearchEvent> {
        &self.events
    }

    /// Stop the search.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Suspend the workers until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.cancel.set_paused(true);
    }

    /// Continue a paused search.
    pub fn resume(&self) {
        self.cancel.set_paused(false);
    }

    /// Returns `true` once the search thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the search to end and return its totals.
    pub fn wait(mut self) -> SearchSummary {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload)),
            None => SearchSummary::default(),
        }
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BackendRegistry, DirectoryWalker, FileDir, FileFilter, FileListIterator, FileWrite,
        FindFlags, MemoryFileAccess,
    };
    use std::sync::Arc;

    fn device(host: &str) -> (Arc<MemoryFileAccess>, impl Fn(&str) -> FilePath) {
        let mem = Arc::new(MemoryFileAccess::new());
        BackendRegistry::global().register("search", host, mem.clone());
        let host = host.to_string();
        (mem, move |p: &str| FilePath::from_parts("search", &host, p))
    }

    fn collect(
        search: &FileSearch,
        files: &mut dyn FileIterator) -> (Vec<SearchEvent>, SearchSummary,
    ) {
        let mut events = Vec::new();
        let summary = search.run(files, |e| events.push(e));
        (events, summary)
    }

    fn hits(events: &[SearchEvent]) -> Vec<SearchResultItem> {
        let mut all: Vec<SearchResultItem> = events
            .iter()
            .filter_map(|e| match e {
                SearchEvent::Results(batch) => Some(batch.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        all.sort_by(|a, b| {
            (a.path.path(), a.line, a.column).cmp(&(b.path.path(), b.line, b.column))
        });
        all
    }

    #[test]
    fn literal_search_in_text() {
        let search = FileSearch::new(SearchParameters::new("foo", FindFlags::empty())).unwrap();
        let found = search.search_text(&FilePath::from_string("/t"), "Foo bar foofoo");
        let spots: Vec<(usize, usize, usize)> =
            found.iter().map(|h| (h.line, h.column, h.length)).collect();
        assert_eq!(spots, [(1, 0, 3), (1, 8, 3), (1, 11, 3)]);
        assert_eq!(found[0].matched_text(), "Foo");
        assert_eq!(found[0].line_text, "Foo bar foofoo");
    }

    #[test]
    fn empty_term_finds_nothing() {
        let search = FileSearch::new(SearchParameters::new("", FindFlags::empty())).unwrap();
        assert!(search.search_text(&FilePath::from_string("/t"), "abc").is_empty());
        let mut files = FileListIterator::new([FilePath::from_string("/t")]);
        let (events, summary) = collect(&search, &mut files);
        assert!(events.is_empty());
        assert_eq!(summary, SearchSummary::default());
    }

    #[test]
    fn searches_files_and_skips_unreadable_ones() {
        let (mem, p) = device("files");
        mem.write_file(&p("/a.txt"), b"needle\nhay\nneedle needle", None).unwrap();
        mem.write_file(&p("/b.txt"), b"nothing here", None).unwrap();
        let params = SearchParameters::new("needle", FindFlags::empty()).with_threads(3);
        let search = FileSearch::new(params).unwrap();

        let mut files = FileListIterator::new([p("/a.txt"), p("/missing.txt"), p("/b.txt")]);
        let (events, summary) = collect(&search, &mut files);

        assert_eq!(summary.files_searched, 2);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.matches, 3);
        assert!(!summary.cancelled);
        let spots: Vec<(usize, usize)> = hits(&events).iter().map(|h| (h.line, h.column)).collect();
        assert_eq!(spots, [(1, 0), (3, 0), (3, 7)]);
        assert!(events.iter().any(|e| matches!(
            e,
            SearchEvent::FileSkipped { path, .. } if path.path() == "/missing.txt"
        )));
    }

    #[test]
    fn results_are_batched() {
        let (mem, p) = device("batch");
        mem.write_file(&p("/x.txt"), b"x x x x x", None).unwrap();
        let params = SearchParameters::new("x", FindFlags::empty()).with_batch_size(2);
        let search = FileSearch::new(params).unwrap();
        let (events, _) = collect(&search, &mut FileListIterator::new([p("/x.txt")]));
        let sizes: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                SearchEvent::Results(batch) => Some(batch.len()),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, [2, 2, 1]);
    }

    #[test]
    fn progress_reaches_maximum() {
        let (mem, p) = device("progress");
        mem.write_file(&p("/1"), b"a", None).unwrap();
        mem.write_file(&p("/2"), b"a", None).unwrap();
        let search = FileSearch::new(SearchParameters::new("a", FindFlags::empty())).unwrap();
        let (events, _) = collect(&search, &mut FileListIterator::new([p("/1"), p("/2")]));
        let last = events.iter().rev().find_map(|e| match e {
            SearchEvent::Progress { value, max } => Some((*value, *max)),
            _ => None,
        });
        assert_eq!(last, Some((2, 2)));
    }

    #[test]
    fn overrides_replace_file_content() {
        let (mem, p) = device("override");
        mem.write_file(&p("/doc.txt"), b"old text", None).unwrap();
        let overrides = HashMap::from([(p("/doc.txt"), "new text".to_string())]);
        let search = FileSearch::new(SearchParameters::new("new", FindFlags::empty()))
            .unwrap()
            .with_content_overrides(overrides);
        let (events, summary) = collect(&search, &mut FileListIterator::new([p("/doc.txt")]));
        assert_eq!(summary.matches, 1);
        assert_eq!(hits(&events)[0].line_text, "new text");
    }

    #[test]
    fn encoding_hint_is_used_for_decoding() {
        let (mem, p) = device("latin1");
        mem.write_file(&p("/l.txt"), b"caf\xE9", None).unwrap();
        let search =
            FileSearch::new(SearchParameters::new("café", FindFlags::CASE_SENSITIVE)).unwrap();
        let mut files =
            FileListIterator::from_items([FileItem::with_encoding(p("/l.txt"), "latin1")]);
        let (_, summary) = collect(&search, &mut files);
        assert_eq!(summary.matches, 1);
    }

    #[test]
    fn regex_search_over_walker() {
        let (mem, p) = device("walk");
        mem.create_dir_all(&p("/src")).unwrap();
        mem.write_file(&p("/src/main.rs"), b"fn main() {}\nfn helper() {}", None).unwrap();
        mem.write_file(&p("/src/notes.md"), b"fn in markdown", None).unwrap();
        let filter = FileFilter::new(&["*.rs"], &[] as &[&str]).unwrap();
        let mut walker = DirectoryWalker::new(vec![p("/src")], filter);
        let params = SearchParameters::new(r"fn (\w+)", FindFlags::REGULAR_EXPRESSION);
        let search = FileSearch::new(params).unwrap();
        let (events, summary) = collect(&search, &mut walker);
        assert_eq!(summary.files_searched, 1);
        let found = hits(&events);
        assert_eq!(found[0].captures, ["fn main", "main"]);
        assert_eq!(found[1].replacement_text(r"def \1"), "def helper");
    }

    #[test]
    fn partial_file_results_are_delivered() {
        let search = FileSearch::new(SearchParameters::new("x", FindFlags::empty())).unwrap();
        let path = FilePath::from_string("/cut-short.txt");
        let (items, complete) = search.scan(&path, "x\nx", &CancellationToken::new());
        assert!(complete);

        let mut events: Vec<SearchEvent> = Vec::new();
        let mut sink = |e: SearchEvent| events.push(e);
        let mut collector = Collector::new(&mut sink, 10);
        collector.accept(Outcome::Searched { items, complete: false });
        let summary = collector.finish(true);

        assert_eq!(summary.files_searched, 0);
        assert_eq!(summary.matches, 2);
        let lines: Vec<usize> = hits(&events).iter().map(|h| h.line).collect();
        assert_eq!(lines, [1, 2]);
    }

    #[test]
    fn cancelled_search_reports_nothing() {
        let (mem, p) = device("cancel");
        mem.write_file(&p("/a"), b"x", None).unwrap();
        let search = FileSearch::new(SearchParameters::new("x", FindFlags::empty())).unwrap();
        search.cancellation().cancel();
        let (events, summary) = collect(&search, &mut FileListIterator::new([p("/a")]));
        assert!(summary.cancelled);
        assert_eq!(summary.matches, 0);
        assert!(hits(&events).is_empty());
    }

    #[test]
    fn spawned_search_can_be_paused_and_resumed() {
        let (mem, p) = device("spawn");
        mem.write_file(&p("/a"), b"one two", None).unwrap();
        let search = FileSearch::new(SearchParameters::new("two", FindFlags::empty())).unwrap();
        search.cancellation().set_paused(true);

        let handle = search.spawn(Box::new(FileListIterator::new([p("/a")]))).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished());
        handle.resume();

        let events = handle.events().clone();
        let summary = handle.wait();
        assert_eq!(summary.matches, 1);
        let received: Vec<SearchEvent> = events.try_iter().collect();
        assert_eq!(hits(&received)[0].column, 4);
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let err =
            FileSearch::new(SearchParameters::new("[", FindFlags::REGULAR_EXPRESSION)).unwrap_err();
        assert!(matches!(err, FsError::InvalidPattern { .. }));
    }

    #[test]
    fn search_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileSearch>();
    }
}
