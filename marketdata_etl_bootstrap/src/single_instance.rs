// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Single-Instance Lock
//!
//! Advisory file lock preventing two engine runs on one host. The lock is
//! taken with `flock(2)` on Unix and `LockFileEx` on Windows, so the OS
//! releases it when the process exits for any reason; a stale lock file left
//! on disk is harmless and is reused by the next run. This is deliberately
//! not a PID file (racy to check) and not a network service.
//!
//! The holder's PID is written into the file as a diagnostic for operators;
//! nothing reads it back programmatically.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default lock file name, created in the working directory.
pub const DEFAULT_LOCK_FILE: &str = "marketdata_etl.lock";

/// Why the lock could not be acquired.
#[derive(Error, Debug)]
pub enum LockError {
    #[error("another instance holds the lock file {0}")]
    AlreadyLocked(PathBuf),

    #[error("lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Held advisory lock; dropping it releases the OS lock.
#[derive(Debug)]
pub struct SingleInstanceLock {
    file: File,
    path: PathBuf,
}

impl SingleInstanceLock {
    /// Attempts to take the exclusive lock without blocking.
    pub fn try_acquire(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Io {
                path: path.clone(),
                source,
            })?;

        match try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(err) if is_contended(&err) => return Err(LockError::AlreadyLocked(path)),
            Err(source) => return Err(LockError::Io { path, source }),
        }

        let lock = Self { file, path };
        lock.write_pid();
        debug!(path = %lock.path.display(), "single-instance lock acquired");
        Ok(lock)
    }

    /// The lock file's path, for diagnostics.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // Operator diagnostic only; failures are ignored.
    fn write_pid(&self) {
        let mut file = &self.file;
        let _ = file.set_len(0);
        let _ = file.seek(SeekFrom::Start(0));
        let _ = writeln!(file, "{}", std::process::id());
        let _ = file.flush();
    }
}

impl Drop for SingleInstanceLock {
    fn drop(&mut self) {
        // Closing the descriptor releases the OS lock; the file itself stays
        // on disk and is reused by the next run.
        debug!(path = %self.path.display(), "single-instance lock released");
    }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(windows)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
    use std::os::windows::io::AsRawHandle;
    use winapi::um::fileapi::LockFileEx;
    use winapi::um::minwinbase::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, OVERLAPPED};

    let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
    let rc = unsafe {
        LockFileEx(
            file.as_raw_handle() as *mut _,
            LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
            0,
            u32::MAX,
            u32::MAX,
            &mut overlapped,
        )
    };
    if rc != 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
fn is_contended(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EWOULDBLOCK)
}

#[cfg(windows)]
fn is_contended(err: &io::Error) -> bool {
    // ERROR_LOCK_VIOLATION
    err.raw_os_error() == Some(33)
}
