//! Persistent, log-structured list engine.
//!
//! Directory layout:
//!
//! ```text
//! <dir>/
//! ├─ LOCK              # Advisory lock for single-process access
//! ├─ lists.log         # Append-only operation log
//! └─ lists.log.tmp     # Present only while compacting
//! ```
//!
//! Every mutation is appended to `lists.log` before it is applied to the
//! in-memory index, so the index can always be rebuilt by replaying the log.
//!
//! ## Recovery Policy
//!
//! - **Truncated tail record**: a crash mid-write. The last record's header
//!   is incomplete, or its checksummed header declares more bytes than the
//!   file holds. The partial record is cut off and the store opens with
//!   every earlier record applied.
//! - **CRC mismatch (header or record), bad magic, unknown type, future
//!   version**: fatal. The store refuses to open and leaves the log as it
//!   found it.

use crate::error::{StorageError, StorageResult};
use crate::memory::Lists;
use crate::record::{LogRecord, MAX_PAYLOAD_SIZE};
use crate::store::{check_bounds, ListStore};
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "lists.log";
const LOG_TEMP: &str = "lists.log.tmp";

struct OpenLog {
    file: File,
    size: u64,
    _lock_file: File,
}

struct Inner {
    lists: Lists,
    log: Option<OpenLog>,
}

impl Inner {
    fn log(&mut self) -> StorageResult<&mut OpenLog> {
        self.log.as_mut().ok_or(StorageError::Closed)
    }

    fn lists(&self) -> StorageResult<&Lists> {
        if self.log.is_none() {
            return Err(StorageError::Closed);
        }
        Ok(&self.lists)
    }
}

/// A persistent list engine backed by an append-only operation log.
///
/// Reads are served from an in-memory index rebuilt from the log on open.
/// Writes append a checksummed record and then update the index.
///
/// The engine has no native middle-range delete: callers remove a middle
/// range by reading the tail, trimming and pushing the tail back.
///
/// # Durability
///
/// - With `sync_on_write` every record is followed by `File::sync_data()`
/// - Without it, records reach the OS on every write and the disk on
///   [`ListStore::close`] or [`FileListStore::compact`]
///
/// # Example
///
/// ```no_run
/// use rangestream_storage::{FileListStore, ListStore};
/// use std::path::Path;
///
/// let store = FileListStore::open(Path::new("streams"), true, true).unwrap();
/// store.push(b"orders", &[b"created".to_vec()]).unwrap();
/// store.close().unwrap();
/// ```
pub struct FileListStore {
    dir: PathBuf,
    sync_on_write: bool,
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for FileListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileListStore")
            .field("dir", &self.dir)
            .field("sync_on_write", &self.sync_on_write)
            .finish_non_exhaustive()
    }
}

impl FileListStore {
    /// Opens or creates a store in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another process holds the directory (returns `Locked`)
    /// - The log is corrupted
    /// - I/O errors occur
    pub fn open(dir: &Path, create_if_missing: bool, sync_on_write: bool) -> StorageResult<Self> {
        if !dir.exists() {
            if !create_if_missing {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("storage directory does not exist: {}", dir.display()),
                )));
            }
            fs::create_dir_all(dir)?;
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOG_FILE))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let (lists, valid) = replay(&data)?;
        if valid < data.len() {
            tracing::warn!(
                dir = %dir.display(),
                discarded = data.len() - valid,
                "discarding truncated record at end of list log"
            );
            file.set_len(valid as u64)?;
            file.sync_all()?;
        }
        tracing::debug!(dir = %dir.display(), lists = lists.keys(usize::MAX).len(), "opened list store");

        Ok(Self {
            dir: dir.to_path_buf(),
            sync_on_write,
            inner: RwLock::new(Inner {
                lists,
                log: Some(OpenLog {
                    file,
                    size: valid as u64,
                    _lock_file: lock_file,
                }),
            }),
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the current size of the operation log in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Closed`] after close.
    pub fn log_size(&self) -> StorageResult<u64> {
        let inner = self.inner.read();
        inner
            .log
            .as_ref()
            .map(|log| log.size)
            .ok_or(StorageError::Closed)
    }

    /// Rewrites the log as one push per live list.
    ///
    /// Uses write-then-rename for crash safety: the new log is written and
    /// synced to a temp file, renamed over the old log, and the directory
    /// is synced.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or an I/O error occurs. The
    /// old log stays in place if anything fails before the rename. Once the
    /// rename succeeds, later writes go to the new log even if syncing the
    /// directory fails.
    pub fn compact(&self) -> StorageResult<()> {
        let mut inner = self.inner.write();
        inner.log()?;

        let mut data = Vec::new();
        for (key, values) in inner.lists.iter() {
            let record = LogRecord::Push {
                key: key.clone(),
                values: values.clone(),
            };
            data.extend(record.encode_frame()?);
        }

        let temp_path = self.dir.join(LOG_TEMP);
        let mut temp = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        temp.write_all(&data)?;
        temp.sync_all()?;

        fs::rename(&temp_path, self.dir.join(LOG_FILE))?;
        // The old handle now points at an unlinked file
        let log = inner.log()?;
        let before = log.size;
        log.file = temp;
        log.size = data.len() as u64;

        self.sync_directory()?;
        tracing::debug!(dir = %self.dir.display(), before, after = data.len(), "compacted list log");
        Ok(())
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        File::open(&self.dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        // NTFS journals directory metadata itself
        Ok(())
    }

    /// Appends `record` to the log, then applies it to the index.
    fn write(&self, inner: &mut Inner, record: &LogRecord) -> StorageResult<()> {
        let frame = record.encode_frame()?;
        let log = inner.log()?;
        if let Err(err) = append_frame(log, &frame, self.sync_on_write) {
            // Cut off a torn record so later appends stay readable
            let _ = log.file.set_len(log.size);
            return Err(err);
        }
        log.size += frame.len() as u64;
        apply(&mut inner.lists, record)
    }
}

fn append_frame(log: &mut OpenLog, frame: &[u8], sync: bool) -> StorageResult<()> {
    log.file.seek(SeekFrom::Start(log.size))?;
    log.file.write_all(frame)?;
    if sync {
        log.file.sync_data()?;
    }
    Ok(())
}

fn apply(lists: &mut Lists, record: &LogRecord) -> StorageResult<()> {
    match record {
        LogRecord::Push { key, values } => {
            lists.push(key, values);
        }
        LogRecord::Trim { key, start, stop } => lists.trim(key, *start, *stop)?,
        LogRecord::Clear { key } => {
            lists.clear(key);
        }
        LogRecord::FlushAll => lists.flush_all(),
    }
    Ok(())
}

/// Rebuilds the index from `data`. Returns it with the length of the
/// valid prefix of the log.
fn replay(data: &[u8]) -> StorageResult<(Lists, usize)> {
    let mut lists = Lists::default();
    let mut offset = 0;
    while let Some((record, size)) = LogRecord::decode_frame(data, offset)? {
        apply(&mut lists, &record).map_err(|err| {
            StorageError::corrupted(format!("record at offset {offset} does not apply: {err}"))
        })?;
        offset += size;
    }
    Ok((lists, offset))
}

impl ListStore for FileListStore {
    fn push(&self, key: &[u8], values: &[Vec<u8>]) -> StorageResult<u64> {
        let mut inner = self.inner.write();
        if values.is_empty() {
            return Ok(inner.lists()?.len(key));
        }
        let record = LogRecord::Push {
            key: key.to_vec(),
            values: values.to_vec(),
        };
        self.write(&mut inner, &record)?;
        Ok(inner.lists.len(key))
    }

    fn get(&self, key: &[u8], index: u64) -> StorageResult<Vec<u8>> {
        self.inner.read().lists()?.get(key, index)
    }

    fn len(&self, key: &[u8]) -> StorageResult<u64> {
        Ok(self.inner.read().lists()?.len(key))
    }

    fn range(&self, key: &[u8], start: u64, stop: u64) -> StorageResult<Vec<Vec<u8>>> {
        self.inner.read().lists()?.range(key, start, stop)
    }

    fn trim(&self, key: &[u8], start: u64, stop: u64) -> StorageResult<()> {
        let mut inner = self.inner.write();
        let len = inner.lists()?.len(key);
        check_bounds(start, stop, len)?;
        if start == 0 && stop == len {
            return Ok(());
        }
        let record = LogRecord::Trim {
            key: key.to_vec(),
            start,
            stop,
        };
        self.write(&mut inner, &record)
    }

    fn clear(&self, key: &[u8]) -> StorageResult<u64> {
        let mut inner = self.inner.write();
        let len = inner.lists()?.len(key);
        if len == 0 {
            return Ok(0);
        }
        self.write(&mut inner, &LogRecord::Clear { key: key.to_vec() })?;
        Ok(len)
    }

    fn keys(&self, limit: usize) -> StorageResult<Vec<Vec<u8>>> {
        Ok(self.inner.read().lists()?.keys(limit))
    }

    fn flush_all(&self) -> StorageResult<()> {
        let mut inner = self.inner.write();
        self.write(&mut inner, &LogRecord::FlushAll)
    }

    fn close(&self) -> StorageResult<()> {
        let mut inner = self.inner.write();
        let Some(log) = inner.log.take() else {
            return Ok(());
        };
        inner.lists = Lists::default();
        log.file.sync_all()?;
        tracing::debug!(dir = %self.dir.display(), "closed list store");
        Ok(())
    }

    fn push_payload_limit(&self) -> Option<usize> {
        Some(MAX_PAYLOAD_SIZE)
    }
}
