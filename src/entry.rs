//! Directory-entry listing and stat normalization
//!
//! One listing covers exactly one directory level; recursion is the
//! engine's job. Symlinks surface as their own kind and are never followed.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::{self, Metadata};
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Kind of a single directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    pub fn describe(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
        }
    }
}

/// Normalized stat record for one named item in a directory
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    /// Seconds since the epoch, sub-second precision where available
    pub mtime: f64,
    /// Raw permission bits, 0 where the platform has none
    pub mode: u32,
}

/// One directory level, keyed by entry name. Map order is not
/// semantically significant but keeps traversal deterministic.
pub type DirectoryListing = BTreeMap<String, DirectoryEntry>;

/// Dotfiles and editor backup files are skipped unless asked for
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.ends_with('~')
}

pub fn mtime_seconds(meta: &Metadata) -> f64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn mode_bits(meta: &Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode()
    }
    #[cfg(not(unix))]
    {
        let _ = meta;
        0
    }
}

/// Build a normalized entry from host metadata
pub fn normalize(name: String, meta: &Metadata) -> DirectoryEntry {
    let kind = if meta.file_type().is_symlink() {
        EntryKind::Symlink
    } else if meta.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    DirectoryEntry {
        name,
        kind,
        size: meta.len(),
        mtime: mtime_seconds(meta),
        mode: mode_bits(meta),
    }
}

/// List one level of the host filesystem.
///
/// A missing or unreadable directory is an error here; the sync source
/// must exist before anything else happens.
pub fn list_local(path: &Path, show_hidden: bool) -> Result<DirectoryListing> {
    let mut listing = DirectoryListing::new();

    let items = fs::read_dir(path)
        .with_context(|| format!("Failed to list {}", path.display()))?;

    for item in items {
        let item = item.with_context(|| format!("Failed to read entry in {}", path.display()))?;
        let name = item.file_name().to_string_lossy().into_owned();
        if !show_hidden && is_hidden(&name) {
            continue;
        }

        // lstat, so a symlink is reported as itself rather than its target
        if let Ok(meta) = fs::symlink_metadata(item.path()) {
            listing.insert(name.clone(), normalize(name, &meta));
        } // else: skip unreadable entries
    }

    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn hidden_names() {
        assert!(is_hidden(".hidden"));
        assert!(is_hidden("backup~"));
        assert!(!is_hidden("a.txt"));
        assert!(!is_hidden("notes"));
    }

    #[test]
    fn hidden_filtering() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["a.txt", ".hidden", "b~"] {
            File::create(dir.path().join(name)).expect("create");
        }

        let visible = list_local(dir.path(), false).expect("list");
        assert_eq!(visible.keys().collect::<Vec<_>>(), vec!["a.txt"]);

        let all = list_local(dir.path(), true).expect("list");
        assert_eq!(all.len(), 3);
        assert!(all.contains_key(".hidden"));
        assert!(all.contains_key("b~"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gone = dir.path().join("nope");
        assert!(list_local(&gone, false).is_err());
    }

    #[test]
    fn kinds_and_sizes() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("data.bin"), b"12345").expect("write");
        fs::create_dir(dir.path().join("sub")).expect("mkdir");

        let listing = list_local(dir.path(), false).expect("list");
        let file = &listing["data.bin"];
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.size, 5);
        assert!(file.mtime > 0.0);
        assert_eq!(listing["sub"].kind, EntryKind::Directory);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("target.txt"), b"x").expect("write");
        std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("link"))
            .expect("symlink");

        let listing = list_local(dir.path(), false).expect("list");
        assert_eq!(listing["link"].kind, EntryKind::Symlink);
        assert_eq!(listing["target.txt"].kind, EntryKind::File);
    }
}
