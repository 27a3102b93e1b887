//! Filesystem watcher adapter built on `notify`.
//!
//! Native notifications run on notify's own thread; the callback only maps
//! and enqueues, so it never blocks the pump.
//!
//! Moves are reported by the OS as two halves sharing a tracker id. A half
//! whose partner never shows up crossed the watch boundary: a lone `From` is a
//! file moved out of the tree (reported as Deleted once [`RENAME_GRACE`]
//! passes), a lone tracked `To` is a file moved in (reported as Created).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use notify::event::{ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{EventQueue, EventSource, SourceError};
use crate::event::{Event, EventKind};

/// How long a `From` half waits for its `To` before counting as a move-out.
pub const RENAME_GRACE: Duration = Duration::from_millis(500);

/// Recursive watch over a directory tree.
pub struct WatcherSource {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
    flusher: Option<(mpsc::Sender<()>, JoinHandle<()>)>,
}

impl WatcherSource {
    /// Subscribe to changes under `root`.
    pub fn start(root: impl Into<PathBuf>, queue: EventQueue) -> Result<Self, SourceError> {
        let root = root.into();
        if !root.exists() {
            return Err(SourceError::MissingRoot(root));
        }

        let stitcher = Arc::new(Mutex::new(RenameStitcher::new(RENAME_GRACE)));

        let callback_stitcher = stitcher.clone();
        let callback_queue = queue.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(native) => {
                    let events = callback_stitcher.lock().observe(&native, Instant::now());
                    enqueue(&callback_queue, events);
                }
                Err(e) => warn!(error = %e, "filesystem watch error"),
            }
        })
        .map_err(|source| SourceError::Watch {
            path: root.clone(),
            source,
        })?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|source| SourceError::Watch {
                path: root.clone(),
                source,
            })?;

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name("ransomwatch-moves".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(RENAME_GRACE / 2) {
                    Err(RecvTimeoutError::Timeout) => {
                        let expired = stitcher.lock().expire(Instant::now());
                        enqueue(&queue, expired);
                    }
                    _ => break,
                }
            })
            .map_err(|e| SourceError::Watch {
                path: root.clone(),
                source: notify::Error::io(e),
            })?;

        info!(root = %root.display(), "filesystem watcher started");
        Ok(Self {
            root,
            watcher: Some(watcher),
            flusher: Some((stop_tx, handle)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn enqueue(queue: &EventQueue, events: Vec<Event>) {
    for event in events {
        debug!(kind = %event.kind, file = %event.file, "file event");
        if !queue.push(event) {
            debug!("event queue full, file event dropped");
        }
    }
}

impl EventSource for WatcherSource {
    fn name(&self) -> &'static str {
        "watcher"
    }

    fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            // The root may already be gone; dropping the watcher releases the handle anyway.
            if let Err(e) = watcher.unwatch(&self.root) {
                debug!(error = %e, "unwatch failed");
            }
            info!(root = %self.root.display(), "filesystem watcher stopped");
        }
        if let Some((stop_tx, handle)) = self.flusher.take() {
            drop(stop_tx);
            if handle.join().is_err() {
                warn!("move flusher thread panicked");
            }
        }
    }
}

impl Drop for WatcherSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pairs the two halves of a native rename by tracker id.
#[derive(Debug)]
pub struct RenameStitcher {
    grace: Duration,
    pending: HashMap<usize, (PathBuf, Instant)>,
}

impl RenameStitcher {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            pending: HashMap::new(),
        }
    }

    /// Map one native notification, holding back `From` halves until their
    /// partner arrives or [`RenameStitcher::expire`] gives up on them.
    pub fn observe(&mut self, native: &notify::Event, now: Instant) -> Vec<Event> {
        let mut events = self.expire(now);
        let tracker = native.attrs.tracker();

        match (native.kind, tracker) {
            (notify::EventKind::Modify(ModifyKind::Name(RenameMode::From)), Some(id)) => {
                if let Some(path) = native.paths.first() {
                    self.pending.insert(id, (path.clone(), now));
                }
            }
            (notify::EventKind::Modify(ModifyKind::Name(RenameMode::To)), Some(id)) => {
                // A matched To is followed by a Both carrying the destination.
                if !self.pending.contains_key(&id) {
                    events.extend(
                        native
                            .paths
                            .iter()
                            .map(|p| Event::now(EventKind::Created, p.display().to_string())),
                    );
                }
            }
            (notify::EventKind::Modify(ModifyKind::Name(RenameMode::Both)), tracker) => {
                if let Some(id) = tracker {
                    self.pending.remove(&id);
                }
                events.extend(map_native(native));
            }
            _ => events.extend(map_native(native)),
        }

        events
    }

    /// Report every `From` older than the grace period as Deleted.
    pub fn expire(&mut self, now: Instant) -> Vec<Event> {
        let grace = self.grace;
        let mut expired = Vec::new();
        self.pending.retain(|_, (path, seen)| {
            if now.duration_since(*seen) >= grace {
                expired.push(Event::now(EventKind::Deleted, path.display().to_string()));
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Stateless mapping of a native notification to zero or more events, one per
/// affected path. Untracked rename halves are reported as Renamed; tracked
/// `From`/`To` halves need [`RenameStitcher`] and map to nothing here.
pub fn map_native(native: &notify::Event) -> Vec<Event> {
    use notify::EventKind as Native;

    let kind = match native.kind {
        Native::Create(_) => EventKind::Created,
        Native::Remove(_) => EventKind::Deleted,
        Native::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From | RenameMode::To if native.attrs.tracker().is_some() => {
                return Vec::new()
            }
            RenameMode::From => return Vec::new(),
            RenameMode::Both => {
                // Report the destination only.
                return native
                    .paths
                    .last()
                    .map(|p| vec![Event::now(EventKind::Renamed, p.display().to_string())])
                    .unwrap_or_default();
            }
            _ => EventKind::Renamed,
        },
        Native::Modify(_) => EventKind::Modified,
        Native::Access(_) | Native::Any | Native::Other => return Vec::new(),
    };

    native
        .paths
        .iter()
        .map(|p| Event::now(kind, p.display().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverflowPolicy;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn native(kind: notify::EventKind, paths: &[&str]) -> notify::Event {
        let mut e = notify::Event::new(kind);
        for p in paths {
            e = e.add_path(PathBuf::from(p));
        }
        e
    }

    fn rename(mode: RenameMode, paths: &[&str], tracker: usize) -> notify::Event {
        native(notify::EventKind::Modify(ModifyKind::Name(mode)), paths).set_tracker(tracker)
    }

    fn wait_for(queue: &EventQueue, pred: impl Fn(&Event) -> bool) -> Vec<Event> {
        let mut seen = Vec::new();
        for _ in 0..40 {
            std::thread::sleep(Duration::from_millis(50));
            seen.extend(queue.drain());
            if seen.iter().any(&pred) {
                break;
            }
        }
        seen
    }

    #[test]
    fn test_map_native_kinds() {
        let created = map_native(&native(notify::EventKind::Create(CreateKind::File), &["/a"]));
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].kind, EventKind::Created);
        assert_eq!(created[0].risk_weight, 1);

        let modified = map_native(&native(
            notify::EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/a"],
        ));
        assert_eq!(modified[0].kind, EventKind::Modified);
        assert_eq!(modified[0].risk_weight, 2);

        let deleted = map_native(&native(notify::EventKind::Remove(RemoveKind::File), &["/a"]));
        assert_eq!(deleted[0].kind, EventKind::Deleted);
        assert_eq!(deleted[0].risk_weight, 10);

        let renamed = map_native(&native(
            notify::EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/old.txt", "/new.txt.locked"],
        ));
        assert_eq!(renamed.len(), 1);
        assert_eq!(renamed[0].kind, EventKind::Renamed);
        assert_eq!(renamed[0].risk_weight, 25);
        assert_eq!(renamed[0].file, "/new.txt.locked");

        let untracked_to = map_native(&native(
            notify::EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/new.txt"],
        ));
        assert_eq!(untracked_to[0].kind, EventKind::Renamed);

        let tracked_from = map_native(&rename(RenameMode::From, &["/old.txt"], 4));
        assert!(tracked_from.is_empty());

        let access = map_native(&native(
            notify::EventKind::Access(notify::event::AccessKind::Any),
            &["/a"],
        ));
        assert!(access.is_empty());
    }

    #[test]
    fn test_stitcher_pairs_in_tree_rename() {
        let mut s = RenameStitcher::new(RENAME_GRACE);
        let t0 = Instant::now();

        assert!(s.observe(&rename(RenameMode::From, &["/w/a.txt"], 7), t0).is_empty());
        assert_eq!(s.pending(), 1);
        assert!(s.observe(&rename(RenameMode::To, &["/w/a.txt.locked"], 7), t0).is_empty());

        let both = s.observe(&rename(RenameMode::Both, &["/w/a.txt", "/w/a.txt.locked"], 7), t0);
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].kind, EventKind::Renamed);
        assert_eq!(both[0].file, "/w/a.txt.locked");
        assert_eq!(s.pending(), 0);

        // Nothing left to expire as Deleted.
        assert!(s.expire(t0 + RENAME_GRACE * 4).is_empty());
    }

    #[test]
    fn test_stitcher_lone_halves_cross_the_boundary() {
        let mut s = RenameStitcher::new(RENAME_GRACE);
        let t0 = Instant::now();

        let moved_in = s.observe(&rename(RenameMode::To, &["/w/incoming.bin"], 11), t0);
        assert_eq!(moved_in.len(), 1);
        assert_eq!(moved_in[0].kind, EventKind::Created);
        assert_eq!(moved_in[0].file, "/w/incoming.bin");

        assert!(s.observe(&rename(RenameMode::From, &["/w/report.docx"], 12), t0).is_empty());
        assert!(s.expire(t0 + RENAME_GRACE / 2).is_empty());

        let moved_out = s.expire(t0 + RENAME_GRACE);
        assert_eq!(moved_out.len(), 1);
        assert_eq!(moved_out[0].kind, EventKind::Deleted);
        assert_eq!(moved_out[0].risk_weight, 10);
        assert_eq!(moved_out[0].file, "/w/report.docx");
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn test_stitcher_expires_on_next_notification() {
        let mut s = RenameStitcher::new(RENAME_GRACE);
        let t0 = Instant::now();
        s.observe(&rename(RenameMode::From, &["/w/gone.txt"], 3), t0);

        let later = native(notify::EventKind::Create(CreateKind::File), &["/w/new.txt"]);
        let events = s.observe(&later, t0 + RENAME_GRACE);
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Deleted, EventKind::Created]);
    }

    #[test]
    fn test_missing_root_is_recoverable_error() {
        let queue = EventQueue::new(16, OverflowPolicy::DropOldest);
        let result = WatcherSource::start("/definitely/not/here/ransomwatch", queue);
        assert!(matches!(result, Err(SourceError::MissingRoot(_))));
    }

    #[test]
    fn test_watcher_sees_file_creation_and_stops() {
        let dir = tempfile::TempDir::new().unwrap();
        let queue = EventQueue::new(256, OverflowPolicy::DropOldest);
        let mut source = WatcherSource::start(dir.path(), queue.clone()).unwrap();
        assert!(source.is_running());

        std::fs::write(dir.path().join("doc.txt"), b"hello").unwrap();

        let seen = wait_for(&queue, |e| e.file.ends_with("doc.txt"));
        assert!(
            seen.iter().any(|e| e.file.ends_with("doc.txt")),
            "no event for doc.txt: {:?}",
            seen
        );

        source.stop();
        source.stop();
        assert!(!source.is_running());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_moves_across_watch_boundary() {
        let outside = tempfile::TempDir::new().unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let staged = outside.path().join("incoming.bin");
        let resident = dir.path().join("report.docx");
        std::fs::write(&staged, b"payload").unwrap();
        std::fs::write(&resident, b"quarterly").unwrap();

        let queue = EventQueue::new(256, OverflowPolicy::DropOldest);
        let mut source = WatcherSource::start(dir.path(), queue.clone()).unwrap();

        std::fs::rename(&staged, dir.path().join("incoming.bin")).unwrap();
        let moved_in = wait_for(&queue, |e| e.file.ends_with("incoming.bin"));
        assert!(
            moved_in
                .iter()
                .any(|e| e.kind == EventKind::Created && e.file.ends_with("incoming.bin")),
            "move into tree not reported: {:?}",
            moved_in
        );

        std::fs::rename(&resident, outside.path().join("report.docx")).unwrap();
        let moved_out = wait_for(&queue, |e| e.file.ends_with("report.docx"));
        assert!(
            moved_out
                .iter()
                .any(|e| e.kind == EventKind::Deleted && e.file.ends_with("report.docx")),
            "move out of tree not reported: {:?}",
            moved_out
        );

        source.stop();
    }

    #[test]
    fn test_root_removed_while_watching_does_not_panic() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().join("watched");
        std::fs::create_dir(&root).unwrap();
        let queue = EventQueue::new(256, OverflowPolicy::DropOldest);
        let mut source = WatcherSource::start(&root, queue.clone()).unwrap();

        std::fs::remove_dir_all(&root).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        source.stop();
        let _ = queue.drain();
    }
}
