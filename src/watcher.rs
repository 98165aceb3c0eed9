use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use anyhow::{Context, Result};

use crate::{FileEvent, FileEventKind};

/// Watches a single directory (non-recursive) and delivers normalized
/// file events over a channel. Raw notify events are translated on a
/// background thread; anything that is not a plain file-level
/// create/modify/delete/rename is dropped there.
pub struct DirWatcher {
    _watcher: RecommendedWatcher,
    event_rx: Receiver<FileEvent>,
}

impl DirWatcher {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let (event_tx, event_rx) = mpsc::channel::<FileEvent>();

        let mut watcher = notify::recommended_watcher(tx)
            .context("Failed to create file system watcher")?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .context("Failed to start watching directory")?;

        thread::spawn(move || {
            let mut dirs = DirTracker::new();
            while let Ok(result) = rx.recv() {
                match result {
                    Ok(event) => {
                        if let Some(file_event) = normalize(event) {
                            // Directory-level notifications are not part
                            // of the log. A deleted path can no longer be
                            // asked; the tracker catches removes of
                            // directories it saw alive.
                            let is_dir = file_event.path.is_dir();
                            if !dirs.admit(&file_event, is_dir) {
                                continue;
                            }
                            if event_tx.send(file_event).is_err() {
                                break; // Receiver dropped, exit thread
                            }
                        }
                    }
                    Err(err) => {
                        tracing::error!("File watcher error: {}", err);
                    }
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            event_rx,
        })
    }

    pub fn try_recv(&self) -> Result<FileEvent, mpsc::TryRecvError> {
        self.event_rx.try_recv()
    }

    pub fn recv(&self) -> Result<FileEvent, mpsc::RecvError> {
        self.event_rx.recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<FileEvent, mpsc::RecvTimeoutError> {
        self.event_rx.recv_timeout(timeout)
    }
}

/// Remembers paths seen as directories so a later remove can still be
/// classified once the path is gone. Backends that tag folder removes
/// (`RemoveKind::Folder`) never need this; removes of a directory that
/// was never observed alive still slip through as file deletions.
struct DirTracker {
    known: HashSet<PathBuf>,
}

impl DirTracker {
    fn new() -> Self {
        Self {
            known: HashSet::new(),
        }
    }

    /// Returns false for directory-level events that must not reach
    /// the log.
    fn admit(&mut self, event: &FileEvent, is_dir: bool) -> bool {
        if is_dir {
            self.known.insert(event.path.clone());
            return false;
        }
        match &event.kind {
            FileEventKind::Deleted => !self.known.remove(&event.path),
            _ => true,
        }
    }
}

/// Maps a raw notify event onto the four kinds the log understands.
/// Platforms that split a rename into separate halves get each half
/// reported as a delete or a create at the respective path.
fn normalize(event: Event) -> Option<FileEvent> {
    let mut paths = event.paths.into_iter();
    match event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => None,
        EventKind::Create(_) => paths.next().map(|p| FileEvent::new(p, FileEventKind::Created)),
        EventKind::Remove(_) => paths.next().map(|p| FileEvent::new(p, FileEventKind::Deleted)),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let from = paths.next()?;
            let to = paths.next()?;
            Some(FileEvent::new(to, FileEventKind::Moved { from }))
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.next().map(|p| FileEvent::new(p, FileEventKind::Deleted))
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.next().map(|p| FileEvent::new(p, FileEventKind::Created))
        }
        EventKind::Modify(_) => paths.next().map(|p| FileEvent::new(p, FileEventKind::Modified)),
        _ => None,
    }
}
