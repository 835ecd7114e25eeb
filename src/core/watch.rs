//! Watch loop: rebuild tracked files when they change on disk.
//!
//! Filesystem events arrive from the notify backend over a channel. Only
//! modification events for tracked files trigger a rebuild; everything else
//! is logged. Rebuilds of the same path are serialized through a per-path
//! lock while different paths may rebuild concurrently. Ctrl-c feeds a
//! shutdown signal into the same channel; the loop then drains, in-flight
//! rebuilds are joined, and the watch ends cleanly.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use notify::{Event, EventKind, RecursiveMode, Watcher as _};

use crate::core::error::Result;
use crate::core::runner::{lock_or_recover, PipelineRunner};
use crate::log_status;

/// One message on the watch loop's channel.
enum WatchSignal {
    Fs(std::result::Result<Event, notify::Error>),
    Shutdown,
}

/// Per-path single-flight guard. Holding a path's lock means a rebuild of
/// that path is in progress; a second rebuild for the same path waits.
#[derive(Default)]
pub struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding rebuilds of one path, created on first use.
    pub fn guard_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = lock_or_recover(&self.locks);
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }
}

/// Watches the current directory tree and recompiles tracked files on change.
pub struct Watcher {
    /// Absolute event path to project-relative file name.
    tracked: HashMap<PathBuf, String>,
    runner: Arc<PipelineRunner>,
    locks: Arc<PathLocks>,
    in_flight: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl Watcher {
    pub fn new(files: &[String], runner: Arc<PipelineRunner>) -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut tracked = HashMap::new();
        for file in files {
            let joined = cwd.join(file);
            let canonical = fs::canonicalize(&joined).unwrap_or_else(|_| joined.clone());
            tracked.insert(canonical, file.clone());
            tracked.insert(joined, file.clone());
        }

        Watcher {
            tracked,
            runner,
            locks: Arc::new(PathLocks::new()),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// Watch until ctrl-c arrives or the signal channel closes. In-flight
    /// rebuilds are joined before returning so no compile is abandoned
    /// mid-run.
    pub fn watch(&self) -> Result<()> {
        let (signal_tx, signal_rx) = mpsc::channel();

        let fs_tx = signal_tx.clone();
        let mut backend = notify::recommended_watcher(move |event| {
            let _ = fs_tx.send(WatchSignal::Fs(event));
        })?;
        backend.watch(Path::new("."), RecursiveMode::Recursive)?;

        ctrlc::set_handler(move || {
            let _ = signal_tx.send(WatchSignal::Shutdown);
        })?;

        log_status!("watch", "Started to watch the current directory.");
        self.run_loop(signal_rx);

        drop(backend);
        self.join_in_flight();
        log_status!("watch", "Stopped watching the current directory.");
        Ok(())
    }

    /// Process signals until shutdown is requested or every sender is gone.
    fn run_loop(&self, signals: mpsc::Receiver<WatchSignal>) {
        for signal in signals {
            match signal {
                WatchSignal::Fs(Ok(event)) => self.handle_event(event),
                WatchSignal::Fs(Err(e)) => log_status!("watch", "Watch error: {}", e),
                WatchSignal::Shutdown => break,
            }
        }
    }

    /// Wait for every dispatched rebuild thread to finish.
    fn join_in_flight(&self) {
        let handles: Vec<_> = lock_or_recover(&self.in_flight).drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }

    fn handle_event(&self, event: Event) {
        if !matches!(event.kind, EventKind::Modify(_)) {
            for path in &event.paths {
                log_status!("watch", "{:?}: {}", event.kind, path.display());
            }
            return;
        }

        for path in event.paths {
            match self.tracked_name(&path) {
                Some(file) => self.rebuild(path, file),
                None => log_status!("watch", "Modified: {}", path.display()),
            }
        }
    }

    /// Map an event path back to the tracked project file it refers to.
    pub fn tracked_name(&self, path: &Path) -> Option<String> {
        if let Some(file) = self.tracked.get(path) {
            return Some(file.clone());
        }
        let canonical = fs::canonicalize(path).ok()?;
        self.tracked.get(&canonical).cloned()
    }

    /// Recompile one file on its own thread, serialized per path.
    fn rebuild(&self, path: PathBuf, file: String) {
        let guard = self.locks.guard_for(&path);
        let runner = Arc::clone(&self.runner);

        let handle = thread::spawn(move || {
            let _in_flight = lock_or_recover(&guard);
            log_status!("watch", "Rebuilding {}", file);
            runner.run_file(&file);
        });
        lock_or_recover(&self.in_flight).push(handle);
    }
}
