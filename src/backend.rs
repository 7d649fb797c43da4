//! Destination-side filesystem abstraction
//!
//! The sync engine reads the source from the host filesystem and drives
//! the destination exclusively through this trait, so the same algorithm
//! runs against a mounted device directory or a device behind a
//! request/response command channel. The engine never branches on which
//! implementation it was given.

use crate::entry::DirectoryListing;
use anyhow::Result;
use std::path::Path;

/// Result of listing a destination directory.
///
/// Devices report "no such directory" as a status rather than an error,
/// and an absent directory is acted on (created or bulk-cloned) while an
/// empty one is just diffed, so the two must stay distinguishable.
#[derive(Debug)]
pub enum ListOutcome {
    Absent,
    Listing(DirectoryListing),
}

pub trait FileSystemBackend: Send + Sync {
    fn exists(&self, path: &Path) -> Result<bool>;

    fn list(&self, path: &Path, show_hidden: bool) -> Result<ListOutcome>;

    /// Creates one directory level; the caller guarantees the parent exists
    fn mkdir(&self, path: &Path) -> Result<()>;

    /// Overwrites the destination unconditionally. `source` is always a
    /// host path, whatever the backend.
    fn copy_file(&self, source: &Path, dest: &Path) -> Result<()>;

    fn remove_file(&self, path: &Path) -> Result<()>;

    fn remove_tree(&self, path: &Path) -> Result<()>;

    /// One-shot recursive copy, tried when the destination directory is
    /// absent. Backends without a fast path return `Ok(false)` and the
    /// engine falls back to `mkdir` plus a per-entry diff.
    fn clone_tree(&self, _source: &Path, _dest: &Path, _show_hidden: bool) -> Result<bool> {
        Ok(false)
    }
}

/// Wraps another backend and turns every mutation into a successful
/// no-op, so a dry run can walk the full diff without touching the
/// destination. Reads pass through.
pub struct ReadOnlyBackend<'a> {
    inner: &'a dyn FileSystemBackend,
}

impl<'a> ReadOnlyBackend<'a> {
    pub fn new(inner: &'a dyn FileSystemBackend) -> Self {
        Self { inner }
    }
}

impl FileSystemBackend for ReadOnlyBackend<'_> {
    fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path)
    }

    fn list(&self, path: &Path, show_hidden: bool) -> Result<ListOutcome> {
        self.inner.list(path, show_hidden)
    }

    fn mkdir(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn copy_file(&self, _source: &Path, _dest: &Path) -> Result<()> {
        Ok(())
    }

    fn remove_file(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn remove_tree(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    // clone_tree keeps the default `Ok(false)` so the walk stays
    // per-entry and every planned action is reported
}
