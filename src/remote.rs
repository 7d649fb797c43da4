//! Command-channel backend for serial-attached devices
//!
//! The destination lives behind a narrow request/response interface:
//! every operation is one round trip, and every round trip can fail on
//! its own (timeout, device busy, unsupported command) without taking
//! the channel down with it. Framing the requests onto an actual wire
//! is the transport layer's problem; callers hand in a [`CommandChannel`]
//! and this backend does the rest.

use crate::backend::{FileSystemBackend, ListOutcome};
use crate::entry::{self, is_hidden, DirectoryEntry, DirectoryListing};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Component, Path};

/// One device operation. Paths always use `/` separators, whatever the
/// host platform uses.
#[derive(Debug, Clone)]
pub enum Request {
    Exists { path: String },
    List { path: String },
    Mkdir { path: String },
    WriteFile { path: String, data: Vec<u8>, mtime: f64 },
    RemoveFile { path: String },
    RemoveTree { path: String },
}

#[derive(Debug)]
pub enum Response {
    Bool(bool),
    Listing(Vec<DirectoryEntry>),
    /// The listed directory does not exist on the device
    Absent,
    Done,
}

/// A single request/response round trip to the device.
///
/// Implementations sit on top of whatever transport reaches the device
/// (serial REPL, USB bridge, test double). A failed call must leave the
/// channel usable for the next one.
pub trait CommandChannel: Send + Sync {
    fn call(&self, request: Request) -> Result<Response>;
}

/// Render a backend path with `/` separators for the device
pub fn device_path(path: &Path) -> String {
    let mut out = String::new();
    for comp in path.components() {
        match comp {
            Component::RootDir => out.push('/'),
            Component::Normal(part) => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&part.to_string_lossy());
            }
            Component::ParentDir => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str("..");
            }
            Component::CurDir | Component::Prefix(_) => {}
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

pub struct RemoteProtocolBackend {
    channel: Box<dyn CommandChannel>,
}

impl RemoteProtocolBackend {
    pub fn new(channel: Box<dyn CommandChannel>) -> Self {
        Self { channel }
    }

    fn expect_done(&self, request: Request) -> Result<()> {
        match self.channel.call(request)? {
            Response::Done => Ok(()),
            other => bail!("unexpected device response: {:?}", other),
        }
    }
}

impl FileSystemBackend for RemoteProtocolBackend {
    fn exists(&self, path: &Path) -> Result<bool> {
        match self.channel.call(Request::Exists {
            path: device_path(path),
        })? {
            Response::Bool(b) => Ok(b),
            other => bail!("unexpected device response: {:?}", other),
        }
    }

    fn list(&self, path: &Path, show_hidden: bool) -> Result<ListOutcome> {
        match self.channel.call(Request::List {
            path: device_path(path),
        })? {
            Response::Absent => Ok(ListOutcome::Absent),
            Response::Listing(items) => {
                let mut listing = DirectoryListing::new();
                for item in items {
                    if !show_hidden && is_hidden(&item.name) {
                        continue;
                    }
                    listing.insert(item.name.clone(), item);
                }
                Ok(ListOutcome::Listing(listing))
            }
            other => bail!("unexpected device response: {:?}", other),
        }
    }

    fn mkdir(&self, path: &Path) -> Result<()> {
        self.expect_done(Request::Mkdir {
            path: device_path(path),
        })
    }

    fn copy_file(&self, source: &Path, dest: &Path) -> Result<()> {
        // Target files are small on this class of device; one command
        // carries the whole payload.
        let data = fs::read(source)
            .with_context(|| format!("read {}", source.display()))?;
        let meta = fs::metadata(source)
            .with_context(|| format!("stat {}", source.display()))?;

        self.expect_done(Request::WriteFile {
            path: device_path(dest),
            data,
            mtime: entry::mtime_seconds(&meta),
        })
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.expect_done(Request::RemoveFile {
            path: device_path(path),
        })
    }

    fn remove_tree(&self, path: &Path) -> Result<()> {
        self.expect_done(Request::RemoveTree {
            path: device_path(path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;
    use parking_lot::Mutex;
    use std::path::PathBuf;

    #[test]
    fn device_paths_use_forward_slashes() {
        assert_eq!(device_path(Path::new("/")), "/");
        assert_eq!(device_path(Path::new("/flash/lib")), "/flash/lib");
        assert_eq!(device_path(&PathBuf::from("/flash").join("app")), "/flash/app");
        assert_eq!(device_path(Path::new("rel/dir")), "rel/dir");
    }

    /// Replays canned responses and records what was asked
    struct ScriptedChannel {
        responses: Mutex<Vec<Response>>,
        requests: Mutex<Vec<Request>>,
    }

    impl ScriptedChannel {
        fn new(mut responses: Vec<Response>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl CommandChannel for ScriptedChannel {
        fn call(&self, request: Request) -> Result<Response> {
            self.requests.lock().push(request);
            self.responses
                .lock()
                .pop()
                .ok_or_else(|| anyhow::anyhow!("device timed out"))
        }
    }

    #[test]
    fn absent_listing_is_a_status_not_an_error() {
        let backend = RemoteProtocolBackend::new(Box::new(ScriptedChannel::new(vec![
            Response::Absent,
        ])));
        assert!(matches!(
            backend.list(Path::new("/app"), false).expect("list"),
            ListOutcome::Absent
        ));
    }

    #[test]
    fn listing_filters_hidden_names() {
        let entries = ["boot.py", ".env", "old~"]
            .iter()
            .map(|n| DirectoryEntry {
                name: n.to_string(),
                kind: EntryKind::File,
                size: 1,
                mtime: 10.0,
                mode: 0,
            })
            .collect();
        let backend = RemoteProtocolBackend::new(Box::new(ScriptedChannel::new(vec![
            Response::Listing(entries),
        ])));

        match backend.list(Path::new("/"), false).expect("list") {
            ListOutcome::Listing(l) => {
                assert_eq!(l.keys().collect::<Vec<_>>(), vec!["boot.py"])
            }
            ListOutcome::Absent => panic!("expected a listing"),
        }
    }

    #[test]
    fn unexpected_response_is_an_error() {
        let backend = RemoteProtocolBackend::new(Box::new(ScriptedChannel::new(vec![
            Response::Bool(true),
        ])));
        assert!(backend.mkdir(Path::new("/app")).is_err());
    }

    #[test]
    fn call_failure_does_not_poison_the_channel() {
        let channel = ScriptedChannel::new(vec![Response::Done]);
        let backend = RemoteProtocolBackend::new(Box::new(channel));

        // first call drains the script, second errors, but a later scripted
        // response would still be served; the backend holds no failure state
        assert!(backend.mkdir(Path::new("/a")).is_ok());
        assert!(backend.mkdir(Path::new("/b")).is_err());
    }
}
