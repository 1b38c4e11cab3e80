//! Advisory file locks that serialize operations across processes.
//!
//! Every CLI invocation that touches stored state holds [`DataDirLock`] from
//! before the first read until its audit batch is on disk. The audit log
//! additionally locks its own file around each append.

use crate::store::StoreError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const LOCK_FILENAME: &str = ".vp.lock";

/// Block until `file` holds an exclusive advisory lock.
///
/// The lock is released when the last handle to the open file is closed.
#[cfg(unix)]
pub fn lock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    loop {
        // LOCK_EX without LOCK_NB: wait for the current holder.
        let result = unsafe { libc::flock(fd, libc::LOCK_EX) };
        if result == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// On non-unix, holding the handle is all we do.
#[cfg(not(unix))]
pub fn lock_exclusive(_file: &File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn unlock(file: &File) {
    use std::os::unix::io::AsRawFd;
    unsafe {
        libc::flock(file.as_raw_fd(), libc::LOCK_UN);
    }
}

#[cfg(not(unix))]
fn unlock(_file: &File) {}

/// Exclusive lock over one data directory.
#[derive(Debug)]
pub struct DataDirLock {
    file: File,
    path: PathBuf,
}

impl DataDirLock {
    /// Wait for and take the lock for `root`, creating the directory if needed.
    pub fn acquire(root: &Path) -> Result<Self, StoreError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StoreError::Io { path, source }
        };

        std::fs::create_dir_all(root).map_err(io_err(root))?;
        let path = root.join(LOCK_FILENAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err(&path))?;
        lock_exclusive(&file).map_err(io_err(&path))?;

        // Holder's PID, for humans inspecting a stuck lock.
        file.set_len(0).map_err(io_err(&path))?;
        let mut writer = &file;
        let _ = writer.write_all(std::process::id().to_string().as_bytes());
        let _ = writer.flush();

        Ok(DataDirLock { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        unlock(&self.file);
        // The lock file stays. Removing it would let a waiter lock an
        // unlinked inode while a newcomer creates a fresh file.
    }
}
