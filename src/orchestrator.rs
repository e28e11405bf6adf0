//! Orchestrator for the complete reposetup operation
//!
//! This module coordinates all steps of building a repository:
//! 1. Resolve the repositories to sync from the yum config
//! 2. Create the destination and every cache directory
//! 3. Lock all of them, waiting at most [`LOCK_TIMEOUT`] by default
//! 4. Sync the cache with reposync (if enabled)
//! 5. Merge custom sources and the cache into the destination with repoman
//!
//! The locks are held until every step has finished, successfully or not.
//! Whatever fails underneath is reported as a single [`ReposetupError`].

use std::fs;
use std::iter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, info};

use crate::config::{self, RepoTarget};
use crate::defaults::{default_sync_dir, LOCK_NAME, LOCK_TIMEOUT, REPOMAN_BIN, REPOSYNC_BIN};
use crate::error::{Error, ReposetupError, Result};
use crate::lock::LockFiles;
use crate::process::CommandRunner;
use crate::repoman::{merge_sources, Repoman};
use crate::reposync::{Reposync, SyncAttempt};

/// Everything reposetup needs to build one repository
#[derive(Debug, Clone)]
pub struct ReposetupOptions {
    /// Where to create the repository
    pub dest: PathBuf,
    /// Where to keep the RPM cache
    pub sync_dir: PathBuf,
    /// Whether to sync the cache before merging
    pub sync: bool,
    /// Yum config listing the repositories to sync
    pub yum_config: Option<PathBuf>,
    /// Repoman config; built-in defaults are used without one
    pub repoman_config: Option<PathBuf>,
    /// Extra repoman sources, merged before the cache in this order
    pub custom_sources: Vec<String>,
    pub reposync_bin: String,
    pub repoman_bin: String,
    pub lock_timeout: Duration,
}

impl ReposetupOptions {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self {
            dest: dest.into(),
            sync_dir: default_sync_dir(),
            sync: true,
            yum_config: None,
            repoman_config: None,
            custom_sources: Vec::new(),
            reposync_bin: REPOSYNC_BIN.to_string(),
            repoman_bin: REPOMAN_BIN.to_string(),
            lock_timeout: LOCK_TIMEOUT,
        }
    }
}

/// What a successful reposetup did
#[derive(Debug, Clone, Default)]
pub struct ReposetupReport {
    /// One entry per synced repository, empty if sync was skipped
    pub synced: Vec<SyncAttempt>,
    /// Sources handed to repoman, in merge order
    pub sources: Vec<String>,
}

/// Build the repository described by `options`
pub fn reposetup(
    options: &ReposetupOptions,
    runner: &dyn CommandRunner,
) -> std::result::Result<ReposetupReport, ReposetupError> {
    match execute(options, runner) {
        Ok(report) => {
            info!("Successfully created repo {}", options.dest.display());
            Ok(report)
        }
        Err(e) => {
            error!("Failed to create repo {}", options.dest.display());
            debug!("{:?}", e);
            Err(ReposetupError {
                dest: options.dest.clone(),
                message: e.to_string(),
            })
        }
    }
}

fn execute(options: &ReposetupOptions, runner: &dyn CommandRunner) -> Result<ReposetupReport> {
    if let Some(repoman_config) = &options.repoman_config {
        if !repoman_config.is_file() {
            return Err(Error::ConfigurationMissing {
                path: repoman_config.clone(),
            });
        }
    }

    let targets = config::repo_paths(&options.sync_dir, options.yum_config.as_deref())?;
    let cache_dirs: Vec<&Path> = targets.iter().map(|t| t.path.as_path()).collect();
    let locked: Vec<&Path> = iter::once(options.dest.as_path())
        .chain(cache_dirs.iter().copied())
        .collect();

    safe_mkdir(&locked)?;

    let _guard = LockFiles::new(locked, LOCK_NAME, options.lock_timeout).acquire()?;

    let synced = if options.sync {
        do_sync(options, &targets, runner)?
    } else {
        Vec::new()
    };

    let sources = merge_sources(&options.custom_sources, cache_dirs);
    Repoman::new(runner, &options.repoman_bin, options.repoman_config.clone())
        .merge(&sources, &options.dest)?;

    Ok(ReposetupReport { synced, sources })
}

fn do_sync(
    options: &ReposetupOptions,
    targets: &[RepoTarget],
    runner: &dyn CommandRunner,
) -> Result<Vec<SyncAttempt>> {
    match &options.yum_config {
        Some(yum_config) if !targets.is_empty() => {
            Reposync::new(runner, &options.reposync_bin, yum_config, &options.sync_dir)
                .sync(targets)
        }
        Some(_) => {
            debug!("Yum config is empty");
            Ok(Vec::new())
        }
        None => {
            debug!("Yum config not provided, skipping sync");
            Ok(Vec::new())
        }
    }
}

/// Create every directory, ignoring ones that already exist
pub fn safe_mkdir<P: AsRef<Path>>(paths: &[P]) -> Result<()> {
    for path in paths {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
