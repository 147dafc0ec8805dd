//! Snapshot persistence for the embedded store.
//!
//! The graph is written as a bincode-encoded list of users plus a list of
//! `(follower, followee)` pairs. Writes go to a temporary sibling file that
//! is then renamed over the target, so a crash never leaves a torn snapshot.
//!
//! Several processes may open the same snapshot. They coordinate through an
//! advisory lock on a `.lock` sibling: writers hold it exclusively for
//! reload, apply and save; readers hold it shared while they reload.

use bincode::Options;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

use super::embedded::{GraphState, UserVertex};
use super::{StoreError, StoreResult};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    users: Vec<UserVertex>,
    follows: Vec<(String, String)>,
}

fn codec() -> impl Options {
    bincode::options()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

/// Size and modification time of a snapshot file, used to notice writes
/// made by other processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

/// Current stamp of `path`, or `None` if there is no snapshot yet.
pub(crate) fn stamp(path: &Path) -> StoreResult<Option<FileStamp>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(FileStamp {
            len: meta.len(),
            modified: meta.modified().ok(),
        })),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Advisory lock on a snapshot, released on drop.
pub(crate) struct SnapshotLock {
    file: File,
}

impl SnapshotLock {
    pub(crate) fn exclusive(path: &Path) -> StoreResult<Self> {
        let file = open_lock_file(path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }

    pub(crate) fn shared(path: &Path) -> StoreResult<Self> {
        let file = open_lock_file(path)?;
        file.lock_shared()?;
        Ok(Self { file })
    }
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn open_lock_file(path: &Path) -> StoreResult<File> {
    create_parent(path)?;
    Ok(OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(path.with_extension("lock"))?)
}

fn create_parent(path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write `state` to `path`, creating parent directories as needed.
pub(crate) fn save(state: &GraphState, path: &Path) -> StoreResult<()> {
    create_parent(path)?;

    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        users: state.users().cloned().collect(),
        follows: state.follow_pairs(),
    };

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        codec().serialize_into(&mut writer, &snapshot)?;
        writer.flush()?;
    }
    fs::rename(&tmp_path, path)?;

    debug!(
        path = %path.display(),
        users = snapshot.users.len(),
        follows = snapshot.follows.len(),
        "snapshot written"
    );
    Ok(())
}

/// Read a snapshot previously written by [`save`].
///
/// Decoding never reads or allocates past the file's own length, so a
/// corrupt file is an error rather than a huge allocation.
pub(crate) fn load(path: &Path) -> StoreResult<GraphState> {
    let file = File::open(path)?;
    let limit = file.metadata()?.len();
    let snapshot: Snapshot = codec()
        .with_limit(limit)
        .deserialize_from(BufReader::new(file))?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(StoreError::Unavailable(format!(
            "unsupported snapshot version {} (expected {})",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }

    Ok(GraphState::from_parts(snapshot.users, snapshot.follows))
}
