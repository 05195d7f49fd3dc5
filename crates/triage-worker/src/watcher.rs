//! Watches the detector's output directory and queues new alert files.
//!
//! Only file creation (or a rename into the directory) counts as a new alert.
//! Modifications of existing files are ignored, so an alert is queued at most
//! once per appearance.

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use triage_core::loader::is_alert_file;

use crate::config::WatchMode;
use crate::queue::AlertQueue;

/// Keeps the underlying notify watcher alive; dropping it stops watching.
pub struct AlertWatcher {
    _inner: Box<dyn Watcher + Send>,
}

impl AlertWatcher {
    pub fn start(
        dir: &Path,
        mode: WatchMode,
        poll_interval: Duration,
        queue: AlertQueue,
    ) -> notify::Result<Self> {
        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in alert_paths(&event) {
                    info!(file = %path.display(), "New alert file detected");
                    queue.enqueue(path);
                }
            }
            Err(e) => error!(error = %e, "Watch error"),
        };

        let mut inner: Box<dyn Watcher + Send> = match mode {
            WatchMode::Native => Box::new(notify::recommended_watcher(handler)?),
            WatchMode::Poll => Box::new(PollWatcher::new(
                handler,
                notify::Config::default().with_poll_interval(poll_interval),
            )?),
        };
        inner.watch(dir, RecursiveMode::NonRecursive)?;

        info!(dir = %dir.display(), mode = ?mode, "Watching for alert files");
        Ok(Self { _inner: inner })
    }
}

/// Alert files an event announces as newly present
pub fn alert_paths(event: &Event) -> Vec<PathBuf> {
    let paths: Vec<&PathBuf> = match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event.paths.iter().collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.iter().collect(),
        // [from, to]
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().into_iter().collect()
        }
        _ => Vec::new(),
    };

    paths
        .into_iter()
        .filter(|p| is_alert_file(p))
        .cloned()
        .collect()
}
