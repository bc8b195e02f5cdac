//! Filesystem-directory backend.
//!
//! One file per record, named after its id, inside a single directory.
//! A `.lock` file in the same directory names the process that owns it;
//! only that owner may read or write. Files whose name starts with `.` are
//! reserved for the backend and never reported as records.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;
use crate::types::{ItemId, StoredItem};

const LOCK_FILE: &str = ".lock";
const TEMP_PREFIX: &str = ".tmp-";

/// Directory-backed blob store with single-owner locking.
pub struct FsDirStore {
    root: PathBuf,
    owner: String,
    /// Serializes mutations issued through this handle.
    write_guard: Mutex<()>,
    closed: AtomicBool,
}

impl FsDirStore {
    /// Open (or create) the directory and take ownership of it.
    ///
    /// Fails with [`StoreError::NotOwner`] if another owner holds the lock.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let owner = format!("pid {} ({})", std::process::id(), uuid::Uuid::now_v7());
        let lock_path = root.join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
            Ok(mut file) => {
                let written = file.write_all(owner.as_bytes()).and_then(|()| file.sync_all());
                if let Err(e) = written {
                    drop(file);
                    let _ = fs::remove_file(&lock_path);
                    return Err(e.into());
                }
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&lock_path).unwrap_or_else(|_| "unknown".into());
                return Err(StoreError::NotOwner {
                    path: root,
                    holder,
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(path = %root.display(), %owner, "fsdir store opened");
        Ok(Self {
            root,
            owner,
            write_guard: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Remove the lock of a directory whose owner is gone.
    ///
    /// A process that is killed without closing its store leaves `.lock`
    /// behind, and every later [`open`](Self::open) fails with
    /// [`StoreError::NotOwner`]. The holder is not checked for liveness:
    /// call this only when no other process can be using the directory.
    /// Returns the previous holder, if there was one.
    pub fn break_lock(root: impl AsRef<Path>) -> StoreResult<Option<String>> {
        let root = root.as_ref();
        let lock_path = root.join(LOCK_FILE);
        let holder = match fs::read_to_string(&lock_path) {
            Ok(holder) => holder,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match fs::remove_file(&lock_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        warn!(path = %root.display(), %holder, "fsdir lock broken");
        Ok(Some(holder))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    /// Fail unless this handle is open and still owns the directory.
    fn ensure_owner(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        let holder = match fs::read_to_string(self.lock_path()) {
            Ok(holder) => holder,
            Err(e) if e.kind() == io::ErrorKind::NotFound => "nobody".to_string(),
            Err(e) => return Err(e.into()),
        };
        if holder != self.owner {
            return Err(StoreError::NotOwner {
                path: self.root.clone(),
                holder,
            });
        }
        Ok(())
    }

    fn object_path(&self, id: &ItemId) -> StoreResult<PathBuf> {
        let token = id.as_str();
        let reason = if token.is_empty() {
            Some("null id")
        } else if token.starts_with('.') {
            Some("leading dot is reserved")
        } else if token.contains(['/', '\\']) {
            Some("path separator")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(StoreError::InvalidId {
                id: id.clone(),
                reason,
            }),
            None => Ok(self.root.join(token)),
        }
    }

    /// Write to a hidden temp file and rename it over `target`.
    ///
    /// The temp file never outlives a failed write.
    fn write_atomic(&self, id: &ItemId, target: &Path, blob: &[u8]) -> StoreResult<()> {
        let tmp = self.root.join(format!("{TEMP_PREFIX}{}", id.as_str()));
        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(blob)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp, target)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn release_lock(&self) -> StoreResult<()> {
        match fs::read_to_string(self.lock_path()) {
            Ok(holder) if holder == self.owner => {
                fs::remove_file(self.lock_path())?;
                Ok(())
            }
            Ok(holder) => Err(StoreError::NotOwner {
                path: self.root.clone(),
                holder,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl BlobStore for FsDirStore {
    fn load_all(&self) -> StoreResult<Vec<StoredItem>> {
        self.ensure_owner()?;
        let mut items = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let raw = entry.file_name();
            if raw.to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            let name = raw.into_string().map_err(|_| StoreError::Corrupt {
                name: path.display().to_string(),
                reason: "file name is not valid UTF-8".into(),
            })?;
            if entry.file_type()?.is_dir() {
                return Err(StoreError::Corrupt {
                    name: path.display().to_string(),
                    reason: "unexpected directory".into(),
                });
            }
            let blob = match fs::read(&path) {
                Ok(blob) => blob,
                // Removed between listing and reading.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(StoreError::Corrupt {
                        name: path.display().to_string(),
                        reason: e.to_string(),
                    })
                }
            };
            items.push(StoredItem::new(name, blob));
        }
        items.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(path = %self.root.display(), count = items.len(), "fsdir load_all");
        Ok(items)
    }

    fn create(&self, id: &ItemId, blob: &[u8]) -> StoreResult<()> {
        let path = self.object_path(id)?;
        let _guard = self.write_guard.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_owner()?;
        if path.exists() {
            return Err(StoreError::AlreadyExists(id.clone()));
        }
        self.write_atomic(id, &path, blob)?;
        debug!(%id, bytes = blob.len(), "fsdir create");
        Ok(())
    }

    fn save(&self, id: &ItemId, blob: &[u8]) -> StoreResult<()> {
        let path = self.object_path(id)?;
        let _guard = self.write_guard.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_owner()?;
        if !path.is_file() {
            return Err(StoreError::NotFound(id.clone()));
        }
        self.write_atomic(id, &path, blob)?;
        debug!(%id, bytes = blob.len(), "fsdir save");
        Ok(())
    }

    fn delete(&self, id: &ItemId) -> StoreResult<()> {
        let path = self.object_path(id)?;
        let _guard = self.write_guard.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_owner()?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(%id, "fsdir delete");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&self) -> StoreResult<()> {
        let _guard = self.write_guard.lock().unwrap_or_else(|e| e.into_inner());
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }
        self.release_lock()?;
        info!(path = %self.root.display(), "fsdir store closed");
        Ok(())
    }
}

impl Drop for FsDirStore {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            if let Err(e) = self.release_lock() {
                warn!(path = %self.root.display(), error = %e, "failed to release fsdir lock");
            }
        }
    }
}

impl std::fmt::Debug for FsDirStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsDirStore")
            .field("root", &self.root)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
