use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use super::reader::{has_spreadsheet_extension, is_lock_file};
use super::types::*;

/// Quiet period after an arrival before the caller is woken, so a file still
/// being copied is not picked up mid-write.
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches the source directory for new spreadsheets. Used only as a wake-up
/// signal for the polling loop; the directory listing stays authoritative.
pub struct DirectoryWatcher {
    #[allow(dead_code)]
    watcher: RecommendedWatcher,
    events: Receiver<Result<Event, notify::Error>>,
    dir: PathBuf,
    case_insensitive: bool,
}

impl DirectoryWatcher {
    /// Start watching `dir` (non-recursively, so the quarantine area is ignored)
    pub fn new(dir: &Path, case_insensitive: bool) -> Result<Self, ExcelError> {
        if !dir.is_dir() {
            return Err(ExcelError::file_not_found(&dir.display().to_string()));
        }

        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        ).map_err(|e| ExcelError::new(format!("Failed to create watcher: {}", e), ExcelErrorType::WatchError))?;

        watcher.watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| ExcelError::new(format!("Failed to watch directory: {}", e), ExcelErrorType::WatchError))?;

        Ok(DirectoryWatcher {
            watcher,
            events: rx,
            dir: dir.to_path_buf(),
            case_insensitive,
        })
    }

    /// Block until a spreadsheet arrives or `timeout` elapses.
    /// Returns `true` when woken by an arrival.
    pub fn wait_for_arrival(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }

            match self.events.recv_timeout(remaining) {
                Ok(Ok(event)) => {
                    if self.is_arrival(&event) {
                        self.drain_until_quiet();
                        return true;
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "Watch error");
                }
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => {
                    // Watcher gone: degrade to a plain sleep.
                    std::thread::sleep(remaining);
                    return false;
                }
            }
        }
    }

    /// Swallow follow-up events until the directory has been quiet for `DEBOUNCE`
    fn drain_until_quiet(&self) {
        while self.events.recv_timeout(DEBOUNCE).is_ok() {}
    }

    fn is_arrival(&self, event: &Event) -> bool {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return false;
        }
        event.paths.iter().any(|path| {
            has_spreadsheet_extension(path, self.case_insensitive)
                && !is_lock_file(path)
                && path.is_file()
        })
    }
}
