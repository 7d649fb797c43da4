//! Local-mount backend: the device shows up as an ordinary directory
//!
//! Every operation is a direct filesystem call; failures surface as
//! standard I/O errors.

use crate::backend::{FileSystemBackend, ListOutcome};
use crate::entry::{self, is_hidden};
use anyhow::{Context, Result};
use filetime::FileTime;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Default)]
pub struct LocalMountBackend;

impl LocalMountBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Destination keeps the source mtime so the newer-mtime comparison
/// converges instead of re-copying on every run
fn preserve_mtime(source: &Path, dest: &Path) -> Result<()> {
    let meta = fs::metadata(source)?;
    let mtime = FileTime::from_last_modification_time(&meta);
    filetime::set_file_mtime(dest, mtime)?;
    Ok(())
}

impl FileSystemBackend for LocalMountBackend {
    fn exists(&self, path: &Path) -> Result<bool> {
        Ok(path.exists())
    }

    fn list(&self, path: &Path, show_hidden: bool) -> Result<ListOutcome> {
        if !path.is_dir() {
            return Ok(ListOutcome::Absent);
        }
        Ok(ListOutcome::Listing(entry::list_local(path, show_hidden)?))
    }

    fn mkdir(&self, path: &Path) -> Result<()> {
        fs::create_dir(path).with_context(|| format!("mkdir {}", path.display()))?;
        Ok(())
    }

    fn copy_file(&self, source: &Path, dest: &Path) -> Result<()> {
        fs::copy(source, dest)
            .with_context(|| format!("copy {} -> {}", source.display(), dest.display()))?;
        preserve_mtime(source, dest)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
        Ok(())
    }

    fn remove_tree(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).with_context(|| format!("remove tree {}", path.display()))?;
        Ok(())
    }

    /// Replicates the whole source tree in one walk, used when the
    /// destination directory does not exist yet
    fn clone_tree(&self, source: &Path, dest: &Path, show_hidden: bool) -> Result<bool> {
        for item in WalkDir::new(source)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                show_hidden
                    || e.path() == source
                    || !is_hidden(&e.file_name().to_string_lossy())
            })
        {
            let item = item?;
            let rel = item
                .path()
                .strip_prefix(source)
                .with_context(|| format!("walk escaped {}", source.display()))?;
            let target = dest.join(rel);

            let file_type = item.file_type();
            if file_type.is_dir() {
                fs::create_dir_all(&target)
                    .with_context(|| format!("mkdir {}", target.display()))?;
            } else if file_type.is_file() {
                self.copy_file(item.path(), &target)?;
            }
            // symlinks are skipped here as everywhere else
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn absent_is_not_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing");

        assert!(matches!(
            LocalMountBackend::new().list(&missing, false).expect("list"),
            ListOutcome::Absent
        ));

        fs::create_dir(&missing).expect("mkdir");
        match LocalMountBackend::new().list(&missing, false).expect("list") {
            ListOutcome::Listing(l) => assert!(l.is_empty()),
            ListOutcome::Absent => panic!("existing directory reported absent"),
        }
    }

    #[test]
    fn copy_preserves_mtime() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        fs::write(&src, b"payload").expect("write");
        filetime::set_file_mtime(&src, FileTime::from_unix_time(1_500_000_000, 0))
            .expect("set mtime");

        LocalMountBackend::new().copy_file(&src, &dst).expect("copy");

        let src_meta = fs::metadata(&src).expect("stat");
        let dst_meta = fs::metadata(&dst).expect("stat");
        assert_eq!(
            FileTime::from_last_modification_time(&src_meta),
            FileTime::from_last_modification_time(&dst_meta)
        );
        assert_eq!(fs::read(&dst).expect("read"), b"payload");
    }

    #[test]
    fn clone_tree_replicates_and_filters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(src.join("lib")).expect("mkdir");
        fs::write(src.join("main.py"), b"print()").expect("write");
        fs::write(src.join("lib/util.py"), b"pass").expect("write");
        File::create(src.join(".secret")).expect("create");

        let cloned = LocalMountBackend::new()
            .clone_tree(&src, &dst, false)
            .expect("clone");
        assert!(cloned);
        assert!(dst.join("main.py").is_file());
        assert!(dst.join("lib/util.py").is_file());
        assert!(!dst.join(".secret").exists());
    }
}
