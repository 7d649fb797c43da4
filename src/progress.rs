//! Progress sinks for the sync traversal
//!
//! The engine reports what it is doing through a [`ProgressSink`];
//! every method has a no-op default so callers implement only what they
//! care about. Events carry the recursion depth, and the console
//! renderings indent two spaces per level.

use crate::engine::SyncOutcome;
use crate::entry::EntryKind;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub trait ProgressSink: Send + Sync {
    fn sync_started(&self, _depth: usize, _dest: &Path) {}
    fn adding(&self, _depth: usize, _dest: &Path) {}
    fn removing(&self, _depth: usize, _dest: &Path) {}
    fn updating(&self, _depth: usize, _dest: &Path) {}
    fn type_mismatch(&self, _depth: usize, _dest: &Path, _source: EntryKind, _dest_kind: EntryKind) {
    }
    fn skipped_symlink(&self, _depth: usize, _source: &Path) {}
    fn sync_finished(&self, _depth: usize, _dest: &Path) {}
    fn completed(&self, _source: &Path, _dest: &Path, _outcome: &SyncOutcome) {}
}

pub struct NoopProgress;
impl ProgressSink for NoopProgress {}

fn pad(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Line-per-event output for verbose runs
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn sync_started(&self, depth: usize, dest: &Path) {
        println!("{}Synchronizing {}", pad(depth), dest.display());
    }

    fn adding(&self, depth: usize, dest: &Path) {
        println!("{}Adding {}", pad(depth + 1), dest.display());
    }

    fn removing(&self, depth: usize, dest: &Path) {
        println!("{}Removing {}", pad(depth + 1), dest.display());
    }

    fn updating(&self, depth: usize, dest: &Path) {
        println!("{}Updating {}", pad(depth + 1), dest.display());
    }

    fn type_mismatch(&self, depth: usize, dest: &Path, source: EntryKind, dest_kind: EntryKind) {
        println!(
            "{}Skipping {}: source is a {} but destination is a {}",
            pad(depth + 1),
            dest.display(),
            source.describe(),
            dest_kind.describe()
        );
    }

    fn skipped_symlink(&self, depth: usize, source: &Path) {
        println!("{}Skipping symlink {}", pad(depth + 1), source.display());
    }

    fn sync_finished(&self, depth: usize, dest: &Path) {
        println!("{}Done synchronizing {}", pad(depth), dest.display());
    }
}

/// Single-line activity spinner for quiet runs
pub struct SpinnerProgress {
    spinner: ProgressBar,
    operations: AtomicU64,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));

        Self {
            spinner,
            operations: AtomicU64::new(0),
        }
    }

    fn bump(&self, what: &str, dest: &Path) {
        let n = self.operations.fetch_add(1, Ordering::Relaxed) + 1;
        self.spinner
            .set_message(format!("{} {} ({} operations)", what, dest.display(), n));
    }

    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for SpinnerProgress {
    fn sync_started(&self, _depth: usize, dest: &Path) {
        self.spinner
            .set_message(format!("Synchronizing {}", dest.display()));
    }

    fn adding(&self, _depth: usize, dest: &Path) {
        self.bump("Adding", dest);
    }

    fn removing(&self, _depth: usize, dest: &Path) {
        self.bump("Removing", dest);
    }

    fn updating(&self, _depth: usize, dest: &Path) {
        self.bump("Updating", dest);
    }
}

/// Counts actions across a run; cheap enough to attach to any sync
#[derive(Default)]
pub struct ActionCounter {
    adds: AtomicU64,
    removes: AtomicU64,
    updates: AtomicU64,
}

impl ActionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// (adds, removes, updates)
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.adds.load(Ordering::Relaxed),
            self.removes.load(Ordering::Relaxed),
            self.updates.load(Ordering::Relaxed),
        )
    }
}

impl ProgressSink for ActionCounter {
    fn adding(&self, _depth: usize, _dest: &Path) {
        self.adds.fetch_add(1, Ordering::Relaxed);
    }

    fn removing(&self, _depth: usize, _dest: &Path) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    fn updating(&self, _depth: usize, _dest: &Path) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }
}

/// Records rendered event lines in memory, for embedding callers that
/// want the stream after the fact (and for tests)
#[derive(Default)]
pub struct CollectingProgress {
    events: Mutex<Vec<String>>,
}

impl CollectingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn push(&self, line: String) {
        self.events.lock().push(line);
    }
}

impl ProgressSink for CollectingProgress {
    fn sync_started(&self, depth: usize, dest: &Path) {
        self.push(format!("{}Synchronizing {}", pad(depth), dest.display()));
    }

    fn adding(&self, depth: usize, dest: &Path) {
        self.push(format!("{}Adding {}", pad(depth + 1), dest.display()));
    }

    fn removing(&self, depth: usize, dest: &Path) {
        self.push(format!("{}Removing {}", pad(depth + 1), dest.display()));
    }

    fn updating(&self, depth: usize, dest: &Path) {
        self.push(format!("{}Updating {}", pad(depth + 1), dest.display()));
    }

    fn type_mismatch(&self, depth: usize, dest: &Path, source: EntryKind, dest_kind: EntryKind) {
        self.push(format!(
            "{}Skipping {}: source is a {} but destination is a {}",
            pad(depth + 1),
            dest.display(),
            source.describe(),
            dest_kind.describe()
        ));
    }

    fn skipped_symlink(&self, depth: usize, source: &Path) {
        self.push(format!(
            "{}Skipping symlink {}",
            pad(depth + 1),
            source.display()
        ));
    }

    fn sync_finished(&self, depth: usize, dest: &Path) {
        self.push(format!("{}Done synchronizing {}", pad(depth), dest.display()));
    }
}

/// Forwards every event to each attached sink
pub struct FanoutProgress {
    sinks: Vec<std::sync::Arc<dyn ProgressSink>>,
}

impl FanoutProgress {
    pub fn new(sinks: Vec<std::sync::Arc<dyn ProgressSink>>) -> Self {
        Self { sinks }
    }
}

impl ProgressSink for FanoutProgress {
    fn sync_started(&self, depth: usize, dest: &Path) {
        for sink in &self.sinks {
            sink.sync_started(depth, dest);
        }
    }

    fn adding(&self, depth: usize, dest: &Path) {
        for sink in &self.sinks {
            sink.adding(depth, dest);
        }
    }

    fn removing(&self, depth: usize, dest: &Path) {
        for sink in &self.sinks {
            sink.removing(depth, dest);
        }
    }

    fn updating(&self, depth: usize, dest: &Path) {
        for sink in &self.sinks {
            sink.updating(depth, dest);
        }
    }

    fn type_mismatch(&self, depth: usize, dest: &Path, source: EntryKind, dest_kind: EntryKind) {
        for sink in &self.sinks {
            sink.type_mismatch(depth, dest, source, dest_kind);
        }
    }

    fn skipped_symlink(&self, depth: usize, source: &Path) {
        for sink in &self.sinks {
            sink.skipped_symlink(depth, source);
        }
    }

    fn sync_finished(&self, depth: usize, dest: &Path) {
        for sink in &self.sinks {
            sink.sync_finished(depth, dest);
        }
    }

    fn completed(&self, source: &Path, dest: &Path, outcome: &SyncOutcome) {
        for sink in &self.sinks {
            sink.completed(source, dest, outcome);
        }
    }
}
