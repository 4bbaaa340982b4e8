//! Filesystem helpers for crash-safe writes and per-directory locking
//!
//! Contract sidecars and the library cache are rewritten in place by
//! concurrent runs; writers take a [`DirLock`] and publish with
//! [`atomic_write`] so readers never observe a half-written file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::{Error, Result};

/// Lock file name created inside a locked directory
pub const LOCK_FILE_NAME: &str = ".rtag.lock";

/// Write data to a file atomically using temp-file-then-rename
///
/// The temp file lives in the same directory so the rename stays on one
/// filesystem. Data is synced before the rename.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("Not a file path: {}", path.display())))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_data()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Exclusive advisory lock on a directory
///
/// Held for the lifetime of the value. The OS releases the `flock` when the
/// process dies, so there is no stale-lock cleanup.
pub struct DirLock {
    _file: File,
    path: PathBuf,
}

impl DirLock {
    /// Acquire the lock on `dir`, polling until `timeout` expires
    pub fn acquire(dir: &Path, timeout: Duration) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let lock_path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;

        let start = Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(DirLock {
                        _file: file,
                        path: lock_path,
                    })
                }
                Err(_) if start.elapsed() >= timeout => {
                    return Err(Error::LockTimeout(lock_path.display().to_string()));
                }
                Err(_) => std::thread::sleep(poll_interval),
            }
        }
    }

    /// Path of the lock file backing this lock
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Bytes available to unprivileged writers on the volume holding `path`
///
/// `path` may not exist yet; the nearest existing ancestor is queried.
pub fn available_space(path: &Path) -> Result<u64> {
    let probe = path
        .ancestors()
        .find(|p| p.exists())
        .unwrap_or_else(|| Path::new("."));
    Ok(fs2::available_space(probe)?)
}
