//! Recursive directory-tree synchronization
//!
//! The engine mirrors a host directory onto a destination reached
//! through a [`FileSystemBackend`], one level at a time, depth-first.
//! Per-entry failures are collected and the traversal keeps going; only
//! a missing source directory aborts a call outright, before anything
//! on the destination is touched.
//!
//! Within a level, additions run first, then deletions (mirror mode
//! only), then updates. A subdirectory is fully synchronized before the
//! parent moves on to its next sibling. Everything is sequential: a
//! remote round trip can take seconds, and entries are paid for one at
//! a time.

use crate::backend::{FileSystemBackend, ListOutcome};
use crate::entry::{self, DirectoryEntry, DirectoryListing, EntryKind};
use crate::plan;
use crate::progress::ProgressSink;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Recursion ceiling; deeper subtrees are reported and skipped rather
/// than followed forever (a corrupted remote listing can be cyclic)
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// What to do when a file exists on both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Copy whenever the name matches, mtimes notwithstanding
    AlwaysOverwrite,
    /// Copy only when the source mtime is strictly newer
    #[default]
    OnlyIfNewer,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Delete destination-only entries so the destination ends up an
    /// exact mirror of the source
    pub mirror: bool,
    pub update_policy: UpdatePolicy,
    /// Include dotfiles and `name~` backup files
    pub show_hidden: bool,
    pub max_depth: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mirror: true,
            update_policy: UpdatePolicy::default(),
            show_hidden: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Cooperative cancellation handle, checked between operations. Clone
/// one end into a Ctrl-C handler and the traversal winds down at the
/// next entry boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Errors accumulated across one whole traversal, in traversal order.
/// Empty means full success.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub errors: Vec<String>,
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Newline-joined block for callers that report errors as flat text
    pub fn joined(&self) -> String {
        self.errors.join("\n")
    }

    fn record(&mut self, message: String) {
        self.errors.push(message);
    }

    fn absorb(&mut self, child: SyncOutcome) {
        self.errors.extend(child.errors);
    }
}

pub struct SyncEngine<'a> {
    backend: &'a dyn FileSystemBackend,
    progress: &'a dyn ProgressSink,
    options: SyncOptions,
    cancel: CancelFlag,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        backend: &'a dyn FileSystemBackend,
        progress: &'a dyn ProgressSink,
        options: SyncOptions,
    ) -> Self {
        Self {
            backend,
            progress,
            options,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Make `dest_dir` match `source_dir`. Best effort: per-entry
    /// failures are collected in the outcome and do not stop the
    /// remaining entries; every entry that succeeds stays synchronized
    /// even when siblings fail.
    pub fn sync(&self, source_dir: &Path, dest_dir: &Path) -> SyncOutcome {
        let outcome = self.sync_level(source_dir, dest_dir, 0);
        self.progress.completed(source_dir, dest_dir, &outcome);
        outcome
    }

    fn sync_level(&self, source_dir: &Path, dest_dir: &Path, depth: usize) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();
        if self.cancel.is_cancelled() {
            return outcome;
        }

        // Missing source is a fatal precondition for this call: one
        // error, destination untouched.
        if !source_dir.is_dir() {
            outcome.record(format!(
                "Source {} does not exist or is not a directory",
                source_dir.display()
            ));
            return outcome;
        }

        self.progress.sync_started(depth, dest_dir);

        let source_listing = match entry::list_local(source_dir, self.options.show_hidden) {
            Ok(listing) => listing,
            Err(e) => {
                outcome.record(format!("Failed to list {}: {}", source_dir.display(), e));
                self.progress.sync_finished(depth, dest_dir);
                return outcome;
            }
        };

        let dest_listing = match self.open_dest(source_dir, dest_dir, &mut outcome) {
            Some(listing) => listing,
            None => {
                // fast path taken, or this level could not proceed
                self.progress.sync_finished(depth, dest_dir);
                return outcome;
            }
        };

        let plan = plan::plan(&source_listing, &dest_listing);

        self.apply_additions(&plan.to_add, &source_listing, source_dir, dest_dir, depth, &mut outcome);
        if self.options.mirror {
            self.apply_deletions(&plan.to_delete, &dest_listing, dest_dir, depth, &mut outcome);
        }
        self.apply_updates(
            &plan.to_update,
            &source_listing,
            &dest_listing,
            source_dir,
            dest_dir,
            depth,
            &mut outcome,
        );

        self.progress.sync_finished(depth, dest_dir);
        outcome
    }

    /// Produce the destination listing for one level, creating the
    /// directory when it does not exist yet. Returns `None` when the
    /// level is already dealt with (bulk clone) or cannot proceed.
    fn open_dest(
        &self,
        source_dir: &Path,
        dest_dir: &Path,
        outcome: &mut SyncOutcome,
    ) -> Option<DirectoryListing> {
        match self.backend.list(dest_dir, self.options.show_hidden) {
            Ok(ListOutcome::Listing(listing)) => Some(listing),
            Ok(ListOutcome::Absent) => {
                match self
                    .backend
                    .clone_tree(source_dir, dest_dir, self.options.show_hidden)
                {
                    Ok(true) => None,
                    Ok(false) => match self.backend.mkdir(dest_dir) {
                        Ok(()) => Some(DirectoryListing::new()),
                        Err(e) => {
                            outcome.record(format!(
                                "Failed to create {}: {}",
                                dest_dir.display(),
                                e
                            ));
                            None
                        }
                    },
                    Err(e) => {
                        outcome.record(format!(
                            "Failed to copy tree to {}: {}",
                            dest_dir.display(),
                            e
                        ));
                        None
                    }
                }
            }
            Err(e) => {
                outcome.record(format!("Failed to list {}: {}", dest_dir.display(), e));
                None
            }
        }
    }

    fn recurse(
        &self,
        source_path: &Path,
        dest_path: &Path,
        depth: usize,
        outcome: &mut SyncOutcome,
    ) {
        if depth + 1 > self.options.max_depth {
            outcome.record(format!(
                "Recursion limit ({}) reached at {}, subtree skipped",
                self.options.max_depth,
                source_path.display()
            ));
            return;
        }
        let child = self.sync_level(source_path, dest_path, depth + 1);
        outcome.absorb(child);
    }

    fn apply_additions(
        &self,
        names: &[String],
        source_listing: &DirectoryListing,
        source_dir: &Path,
        dest_dir: &Path,
        depth: usize,
        outcome: &mut SyncOutcome,
    ) {
        for name in names {
            if self.cancel.is_cancelled() {
                return;
            }
            let Some(item) = source_listing.get(name) else {
                continue;
            };
            let source_path = source_dir.join(name);
            let dest_path = dest_dir.join(name);

            match item.kind {
                EntryKind::File => {
                    self.progress.adding(depth, &dest_path);
                    if let Err(e) = self.backend.copy_file(&source_path, &dest_path) {
                        outcome.record(format!("Failed to copy {}: {}", source_path.display(), e));
                    }
                }
                EntryKind::Directory => {
                    self.recurse(&source_path, &dest_path, depth, outcome);
                }
                EntryKind::Symlink => {
                    self.progress.skipped_symlink(depth, &source_path);
                }
            }
        }
    }

    fn apply_deletions(
        &self,
        names: &[String],
        dest_listing: &DirectoryListing,
        dest_dir: &Path,
        depth: usize,
        outcome: &mut SyncOutcome,
    ) {
        for name in names {
            if self.cancel.is_cancelled() {
                return;
            }
            let Some(item) = dest_listing.get(name) else {
                continue;
            };
            let dest_path = dest_dir.join(name);
            self.progress.removing(depth, &dest_path);

            let removed = match item.kind {
                EntryKind::Directory => self.backend.remove_tree(&dest_path),
                EntryKind::File | EntryKind::Symlink => self.backend.remove_file(&dest_path),
            };
            if let Err(e) = removed {
                outcome.record(format!("Failed to remove {}: {}", dest_path.display(), e));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_updates(
        &self,
        names: &[String],
        source_listing: &DirectoryListing,
        dest_listing: &DirectoryListing,
        source_dir: &Path,
        dest_dir: &Path,
        depth: usize,
        outcome: &mut SyncOutcome,
    ) {
        for name in names {
            if self.cancel.is_cancelled() {
                return;
            }
            let (Some(source_item), Some(dest_item)) =
                (source_listing.get(name), dest_listing.get(name))
            else {
                continue;
            };
            let source_path = source_dir.join(name);
            let dest_path = dest_dir.join(name);

            match (source_item.kind, dest_item.kind) {
                (EntryKind::Directory, EntryKind::Directory) => {
                    self.recurse(&source_path, &dest_path, depth, outcome);
                }
                (EntryKind::File, EntryKind::File) => {
                    if self.needs_update(source_item, dest_item) {
                        self.progress.updating(depth, &dest_path);
                        if let Err(e) = self.backend.copy_file(&source_path, &dest_path) {
                            outcome.record(format!(
                                "Failed to copy {}: {}",
                                source_path.display(),
                                e
                            ));
                        }
                    }
                }
                (EntryKind::Symlink, _) | (_, EntryKind::Symlink) => {
                    self.progress.skipped_symlink(depth, &source_path);
                }
                // file on one side, directory on the other: informational,
                // the entry stays as it is
                (source_kind, dest_kind) => {
                    self.progress
                        .type_mismatch(depth, &dest_path, source_kind, dest_kind);
                }
            }
        }
    }

    fn needs_update(&self, source: &DirectoryEntry, dest: &DirectoryEntry) -> bool {
        match self.options.update_policy {
            UpdatePolicy::AlwaysOverwrite => true,
            UpdatePolicy::OnlyIfNewer => source.mtime > dest.mtime,
        }
    }
}
