//! # Advisory Directory Locking
//!
//! Concurrent `mkrepo` invocations coordinate exclusively through lock files
//! on disk. Two layers live here:
//!
//! - **[`Flock`]**: one lock file with an OS advisory lock in shared or
//!   exclusive mode, acquired either blocking or non-blocking. The lock file
//!   itself is never removed.
//!
//! - **[`LockFiles`]**: exclusive locks over a whole set of directories.
//!   Directories are always locked in string order, so two invocations with
//!   overlapping sets can't deadlock each other. Acquisition polls until a
//!   shared deadline and is all-or-nothing: on timeout every lock taken so
//!   far is released before the error is returned. On success a
//!   [`LockGuard`] is returned which releases everything when dropped.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::error::{Error, Result};

/// Access mode used when acquiring a lock file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LockMode {
    /// Read-only use, compatible with other shared holders
    Shared,
    /// Write use, excludes every other holder
    Exclusive,
}

/// A single advisory lock on a lock file
#[derive(Debug)]
pub struct Flock {
    path: PathBuf,
    mode: LockMode,
    blocking: bool,
    file: Option<File>,
}

impl Flock {
    pub fn new(path: impl Into<PathBuf>, mode: LockMode, blocking: bool) -> Self {
        Self {
            path: path.into(),
            mode,
            blocking,
            file: None,
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Whether this handle currently holds the lock
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Acquire the lock, creating the lock file if needed
    ///
    /// A non-blocking acquire of a lock held elsewhere fails with
    /// [`Error::WouldBlock`]. Acquiring a lock this handle already holds is a
    /// no-op.
    pub fn acquire(&mut self) -> Result<()> {
        if self.is_held() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        let result = match (self.mode, self.blocking) {
            (LockMode::Shared, true) => fs2::FileExt::lock_shared(&file),
            (LockMode::Exclusive, true) => fs2::FileExt::lock_exclusive(&file),
            (LockMode::Shared, false) => fs2::FileExt::try_lock_shared(&file),
            (LockMode::Exclusive, false) => fs2::FileExt::try_lock_exclusive(&file),
        };

        match result {
            Ok(()) => {
                self.file = Some(file);
                Ok(())
            }
            Err(e) if is_contended(&e) => Err(Error::WouldBlock {
                path: self.path.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Release the lock; a no-op if it is not held
    pub fn release(&mut self) {
        // Closing the handle drops the advisory lock
        self.file.take();
    }
}

impl Drop for Flock {
    fn drop(&mut self) {
        self.release();
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    let contended = fs2::lock_contended_error();
    err.kind() == contended.kind()
        || (err.raw_os_error().is_some() && err.raw_os_error() == contended.raw_os_error())
}

/// Exclusive, all-or-nothing locking of a set of directories
#[derive(Debug, Clone)]
pub struct LockFiles {
    paths: Vec<PathBuf>,
    lock_name: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl LockFiles {
    /// Prepare to lock `paths`, each through `<path>/<lock_name>`
    ///
    /// Paths are de-duplicated and sorted as whole strings, not component
    /// by component: `/srv/repo-b` locks before `/srv/repo/a`. The caller's
    /// order does not matter.
    pub fn new<I, P>(paths: I, lock_name: &str, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut paths: Vec<PathBuf> = paths
            .into_iter()
            .map(|p| Into::<PathBuf>::into(p).components().collect())
            .collect();
        paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        paths.dedup();

        Self {
            paths,
            lock_name: lock_name.to_string(),
            timeout,
            poll_interval: (timeout / 10).max(Duration::from_secs(1)),
        }
    }

    /// Directories in the order they will be locked
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delay between attempts on a contended lock
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Lock file used for `dir`
    pub fn lock_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.lock_name)
    }

    /// Lock every directory, or none of them
    ///
    /// The timeout covers the whole set, not each path.
    pub fn acquire(&self) -> Result<LockGuard> {
        let start = Instant::now();
        let mut locks = Vec::with_capacity(self.paths.len());

        for dir in &self.paths {
            let mut lock = Flock::new(self.lock_path(dir), LockMode::Exclusive, false);
            match self.wait_for_lock(&mut lock, start) {
                Ok(()) => {
                    info!("Successfully locked {}", dir.display());
                    locks.push(lock);
                }
                Err(e) => {
                    debug!("{}", e);
                    release_all(&mut locks);
                    return Err(e);
                }
            }
        }

        Ok(LockGuard { locks })
    }

    fn wait_for_lock(&self, lock: &mut Flock, start: Instant) -> Result<()> {
        loop {
            match lock.acquire() {
                Ok(()) => return Ok(()),
                Err(Error::WouldBlock { .. }) => {}
                Err(e) => return Err(e),
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                debug!("Got timeout while trying to lock {}", lock.path().display());
                return Err(self.timeout_error());
            }
            thread::sleep(self.poll_interval.min(self.timeout - elapsed));
        }
    }

    fn timeout_error(&self) -> Error {
        Error::LockTimeout {
            paths: self
                .paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(","),
            timeout_secs: self.timeout.as_secs_f64(),
        }
    }
}

/// Held locks of a [`LockFiles`] set, released when dropped
#[derive(Debug)]
pub struct LockGuard {
    locks: Vec<Flock>,
}

impl LockGuard {
    /// Lock files held by this guard, in acquisition order
    pub fn lock_files(&self) -> impl Iterator<Item = &Path> {
        self.locks.iter().map(Flock::path)
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        release_all(&mut self.locks);
    }
}

fn release_all(locks: &mut Vec<Flock>) {
    for mut lock in locks.drain(..) {
        lock.release();
        debug!("Successfully released lock {}", lock.path().display());
    }
}
