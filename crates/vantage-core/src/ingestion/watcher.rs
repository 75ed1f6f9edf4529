//! File-watcher stage (spec §4.3 "File-watcher integration"): collapse
//! bursts of filesystem events for the same path into one re-index
//! action within a debounce window.

use crate::config::WatcherConfig;
use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher as NotifyWatcherTrait};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
    Moved { from: PathBuf, to: PathBuf },
}

/// Owns the OS-level watch handle; dropping it stops the watch.
pub struct FileWatcher {
    _inner: notify::RecommendedWatcher,
    pub events: mpsc::Receiver<WatchEvent>,
}

impl FileWatcher {
    pub fn watch(root: &Path, config: &WatcherConfig) -> notify::Result<Self> {
        let (raw_tx, raw_rx) = std::sync::mpsc::channel::<NotifyEvent>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<NotifyEvent>| {
            if let Ok(event) = res {
                let _ = raw_tx.send(event);
            }
        })?;
        let mode = if config.recursive { RecursiveMode::Recursive } else { RecursiveMode::NonRecursive };
        watcher.watch(root, mode)?;

        let (out_tx, out_rx) = mpsc::channel(256);
        let window = Duration::from_millis(config.debounce_ms);
        std::thread::spawn(move || debounce_loop(raw_rx, out_tx, window));

        Ok(Self { _inner: watcher, events: out_rx })
    }
}

#[derive(Clone, Copy)]
enum PendingKind {
    Created,
    Modified,
    Removed,
}

fn debounce_loop(raw_rx: std::sync::mpsc::Receiver<NotifyEvent>, out_tx: mpsc::Sender<WatchEvent>, window: Duration) {
    let mut pending: HashMap<PathBuf, (Instant, PendingKind)> = HashMap::new();

    loop {
        match raw_rx.recv_timeout(window) {
            Ok(event) => {
                if event.paths.len() == 2 {
                    if out_tx.blocking_send(WatchEvent::Moved { from: event.paths[0].clone(), to: event.paths[1].clone() }).is_err() {
                        return;
                    }
                    continue;
                }
                let kind = classify(&event.kind);
                for path in event.paths {
                    pending.insert(path, (Instant::now(), kind));
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => return,
        }

        let now = Instant::now();
        let ready: Vec<PathBuf> = pending
            .iter()
            .filter(|(_, (observed_at, _))| now.duration_since(*observed_at) >= window)
            .map(|(path, _)| path.clone())
            .collect();
        for path in ready {
            if let Some((_, kind)) = pending.remove(&path) {
                let event = match kind {
                    PendingKind::Created => WatchEvent::Created(path),
                    PendingKind::Modified => WatchEvent::Modified(path),
                    PendingKind::Removed => WatchEvent::Removed(path),
                };
                if out_tx.blocking_send(event).is_err() {
                    return;
                }
            }
        }
    }
}

fn classify(kind: &EventKind) -> PendingKind {
    match kind {
        EventKind::Create(_) => PendingKind::Created,
        EventKind::Remove(_) => PendingKind::Removed,
        _ => PendingKind::Modified,
    }
}
