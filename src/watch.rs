use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecursiveMode, Watcher as _};

use crate::error::WatchError;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Re-runs a pipeline whenever the watched file changes.
///
/// Filesystem events arrive on a channel from the OS-level watcher and
/// are consumed here on a single thread, so one run always finishes
/// before the next can start. The debounce clock is per-watcher state,
/// letting several watchers coexist in one process.
pub struct FileWatcher {
    path: PathBuf,
    debounce: Duration,
    last_run: Option<Instant>,
}

impl FileWatcher {
    pub fn new(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        FileWatcher {
            path: path.into(),
            debounce,
            last_run: None,
        }
    }

    /// Run `handler` once immediately, then again after each debounced
    /// change to the watched file. Returns when `stop` is raised (the
    /// caller wires it to ctrl-c) or when the handler fails; either way
    /// the watch handle is released before returning.
    pub fn watch<F>(
        mut self,
        stop: Arc<AtomicBool>,
        mut handler: F,
    ) -> Result<(), WatchError>
    where
        F: FnMut() -> anyhow::Result<()>,
    {
        let target = self
            .path
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| WatchError::NotAFile(self.path.display().to_string()))?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx)?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        self.run_handler(&mut handler)?;

        while !stop.load(Ordering::SeqCst) {
            // Short timeout so the stop flag is polled even when the file
            // never changes.
            let event = match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(Ok(event)) => event,
                Ok(Err(e)) => return Err(e.into()),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            if !touches_target(&event, &target) {
                continue;
            }
            if !self.debounce_elapsed() {
                continue;
            }
            self.run_handler(&mut handler)?;
        }

        watcher.unwatch(&dir)?;
        Ok(())
    }

    fn run_handler<F>(&mut self, handler: &mut F) -> Result<(), WatchError>
    where
        F: FnMut() -> anyhow::Result<()>,
    {
        handler()?;
        self.last_run = Some(Instant::now());
        Ok(())
    }

    fn debounce_elapsed(&self) -> bool {
        match self.last_run {
            Some(at) => at.elapsed() >= self.debounce,
            None => true,
        }
    }
}

fn touches_target(event: &Event, target: &OsStr) -> bool {
    let relevant_kind = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_));
    relevant_kind && event.paths.iter().any(|p| p.file_name() == Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_debounce_suppresses_rapid_events() {
        let mut watcher = FileWatcher::new(Path::new("a.conf"), Duration::from_millis(500));

        assert!(watcher.debounce_elapsed());
        watcher.last_run = Some(Instant::now());
        assert!(!watcher.debounce_elapsed());
    }

    #[test]
    fn test_debounce_reopens_after_window() {
        let mut watcher = FileWatcher::new(Path::new("a.conf"), Duration::from_millis(0));

        watcher.last_run = Some(Instant::now());
        assert!(watcher.debounce_elapsed());
    }

    #[test]
    fn test_events_for_other_files_are_ignored() {
        let event = Event {
            kind: EventKind::Modify(notify::event::ModifyKind::Any),
            paths: vec![PathBuf::from("/tmp/other.conf")],
            attrs: Default::default(),
        };

        assert!(!touches_target(&event, OsStr::new("a.conf")));
        assert!(touches_target(&event, OsStr::new("other.conf")));
    }

    #[test]
    fn test_remove_events_are_ignored() {
        let event = Event {
            kind: EventKind::Remove(notify::event::RemoveKind::Any),
            paths: vec![PathBuf::from("/tmp/a.conf")],
            attrs: Default::default(),
        };

        assert!(!touches_target(&event, OsStr::new("a.conf")));
    }
}
