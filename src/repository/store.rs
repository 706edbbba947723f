//! Repository-local metadata files
//!
//! A flat directory of named files plus the repository write lock. Writes
//! go through a temp file in the same directory and are persisted over the
//! target, so readers never see a partially written file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

const LOCK_FILE: &str = "wlock";
const LOCK_POLL: Duration = Duration::from_millis(50);

/// Directory holding the mapping files of one repository
#[derive(Debug, Clone)]
pub struct MetaStore {
    dir: PathBuf,
    lock_timeout: Duration,
}

impl MetaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout: Duration::from_secs(600),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Read a whole file. A missing file is `Ok(None)`.
    pub fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.join(name);
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Read a file, logging and swallowing anything but success
    pub fn try_read(&self, name: &str) -> Option<Vec<u8>> {
        match self.read(name) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("warning: unable to read {}: {}", name, e);
                None
            }
        }
    }

    /// Replace a file atomically
    pub fn write_atomic(&self, name: &str, data: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let path = self.join(name);
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        temp.write_all(data).map_err(|e| Error::io(temp.path(), e))?;
        temp.as_file().sync_all().map_err(|e| Error::io(temp.path(), e))?;
        temp.persist(&path).map_err(|e| Error::io(&path, e.error))?;
        tracing::debug!("writing {}", path.display());
        Ok(())
    }

    /// Take the exclusive repository write lock, waiting up to the timeout.
    ///
    /// The lock file holds the owner's pid. A lock whose owner no longer
    /// runs is broken rather than waited out.
    pub fn lock(&self) -> Result<RepoLock> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let path = self.join(LOCK_FILE);
        let start = Instant::now();
        let mut warned = false;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{}", std::process::id()) {
                        tracing::debug!("could not record pid in {}: {}", path.display(), e);
                    }
                    return Ok(RepoLock { path });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    // Empty while the owner is still writing its pid
                    let holder = read_holder(&path);
                    if let Some(pid) = holder {
                        if !process_alive(pid) && self.break_stale(&path, pid)? {
                            continue;
                        }
                    }
                    if start.elapsed() >= self.lock_timeout {
                        return Err(Error::LockTimeout { path, holder });
                    }
                    if !warned {
                        match holder {
                            Some(pid) => tracing::warn!(
                                "waiting for lock on {} held by process {}",
                                path.display(),
                                pid
                            ),
                            None => tracing::warn!("waiting for lock on {}", path.display()),
                        }
                        warned = true;
                    }
                    thread::sleep(LOCK_POLL);
                }
                Err(e) => return Err(Error::io(path, e)),
            }
        }
    }

    /// Remove a lock left by dead process `pid`.
    ///
    /// The file is moved aside first and only deleted if it still names
    /// `pid`. Returns false when the lock changed hands in between.
    fn break_stale(&self, path: &Path, pid: u32) -> Result<bool> {
        let aside = self.join(&format!("{}.stale.{}", LOCK_FILE, std::process::id()));
        match fs::rename(path, &aside) {
            Ok(()) => {}
            // Released while we looked
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(Error::io(path, e)),
        }
        if read_holder(&aside) == Some(pid) {
            tracing::warn!(
                "removing stale lock {} left by process {}",
                path.display(),
                pid
            );
            fs::remove_file(&aside).map_err(|e| Error::io(&aside, e))?;
            return Ok(true);
        }
        // Taken by a live process after we read it: put it back
        let restored = fs::hard_link(&aside, path);
        fs::remove_file(&aside).map_err(|e| Error::io(&aside, e))?;
        if let Err(e) = restored {
            tracing::warn!("could not restore lock {}: {}", path.display(), e);
        }
        Ok(false)
    }
}

fn read_holder(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

// No portable liveness check; never break locks here
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Held write lock; released on drop
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
}

impl RepoLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("failed to release lock {}: {}", self.path.display(), e);
        }
    }
}
