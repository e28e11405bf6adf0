//! # Reposync Driver
//!
//! Mirrors every configured repository into its cache directory with the
//! `reposync` tool, one repository at a time.
//!
//! `reposync` is known to fail on packages it downloaded only partially or
//! in a different release on a previous run. Instead of giving up on the
//! first failure, each repository climbs a fixed escalation ladder:
//!
//! 1. **Plain**: run the tool.
//! 2. **Remove broken RPMs**: scan the failed run's stdout for packages it
//!    complained about, delete matching `*.rpm` files from the repository's
//!    cache directory, and run again.
//! 3. **Reset scratch cache**: wipe the scratch cache shared by the whole
//!    sync phase and run a last time.
//!
//! Every retry's exit status is checked, so the ladder stops at the first
//! successful run. If the last step fails too, the whole sync phase is
//! aborted with [`Error::SyncFailure`]. The scratch cache lives in a
//! temporary directory that is removed when the phase ends, however it ends.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use regex::Regex;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::config::RepoTarget;
use crate::error::{Error, Result};
use crate::process::{CommandRunner, CommandStatus};

/// Upper bound on tool runs per repository
pub const MAX_ATTEMPTS: u8 = 3;

/// Package names as they appear in reposync output
const RPM_NAME: &str = r"[a-z][a-zA-Z0-9._\-]+";

/// One rung of the escalation ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    Plain,
    RemoveBrokenRpms,
    ResetScratchCache,
}

const LADDER: [SyncStep; MAX_ATTEMPTS as usize] = [
    SyncStep::Plain,
    SyncStep::RemoveBrokenRpms,
    SyncStep::ResetScratchCache,
];

/// How syncing one repository ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The first run succeeded
    Success,
    /// A run succeeded after at least one recovery step
    Remediated,
    /// Every step failed
    Fatal,
}

/// Record of syncing one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAttempt {
    pub repoid: String,
    /// Tool runs used, at most [`MAX_ATTEMPTS`]
    pub attempts: u8,
    /// RPM files deleted from the repository cache
    pub removed: Vec<PathBuf>,
    /// Whether the shared scratch cache was wiped
    pub cache_cleared: bool,
    pub outcome: SyncOutcome,
    /// Status of the last run
    pub status: CommandStatus,
}

/// Scratch cache shared by every repository in one sync phase
#[derive(Debug)]
pub struct ScratchCache {
    dir: TempDir,
}

impl ScratchCache {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("reposync_").tempdir()?;
        debug!("Using {} as cache dir for reposync", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Throw away everything in the cache, leaving it empty
    pub fn reset(&self) -> Result<()> {
        fs::remove_dir_all(self.path())?;
        fs::create_dir(self.path())?;
        Ok(())
    }
}

/// Drives `reposync` for a set of repositories
pub struct Reposync<'a> {
    runner: &'a dyn CommandRunner,
    bin: String,
    yum_config: PathBuf,
    sync_dir: PathBuf,
}

impl<'a> Reposync<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        bin: impl Into<String>,
        yum_config: impl Into<PathBuf>,
        sync_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            bin: bin.into(),
            yum_config: yum_config.into(),
            sync_dir: sync_dir.into(),
        }
    }

    /// Sync every repository in order
    ///
    /// Stops at the first repository that can't be synced.
    pub fn sync(&self, targets: &[RepoTarget]) -> Result<Vec<SyncAttempt>> {
        fs::create_dir_all(&self.sync_dir)?;
        let scratch = ScratchCache::new()?;

        info!("Running reposync");
        let mut report = Vec::with_capacity(targets.len());
        for target in targets {
            info!("Syncing {}", target.repoid);
            let attempt = self.sync_repo(target, &scratch)?;

            if attempt.outcome == SyncOutcome::Fatal {
                error!(
                    "Reposync command failed for {}\nstdout:\n\t{}\nstderr:\n\t{}",
                    attempt.repoid, attempt.status.stdout, attempt.status.stderr
                );
                return Err(Error::SyncFailure {
                    repoid: attempt.repoid,
                    stdout: attempt.status.stdout,
                    stderr: attempt.status.stderr,
                });
            }
            report.push(attempt);
        }

        Ok(report)
    }

    /// Climb the escalation ladder for one repository
    ///
    /// `Err` means the tool could not be run at all or recovery itself
    /// failed; a tool that keeps failing yields a `Fatal` attempt.
    pub fn sync_repo(&self, target: &RepoTarget, scratch: &ScratchCache) -> Result<SyncAttempt> {
        let command = self.command(&target.repoid, scratch.path());
        let mut removed = Vec::new();
        let mut cache_cleared = false;
        let mut last: Option<CommandStatus> = None;

        for (attempts, step) in (1..).zip(LADDER) {
            match step {
                SyncStep::Plain => {}
                SyncStep::RemoveBrokenRpms => {
                    info!("Failed to sync {}, re-running", target.repoid);
                    let output = last.as_ref().map(|s| s.stdout.as_str()).unwrap_or_default();
                    removed = remove_broken_rpms(output, &target.path)?;
                }
                SyncStep::ResetScratchCache => {
                    info!(
                        "Failed to sync {} clearing cache and re-running",
                        target.repoid
                    );
                    scratch.reset()?;
                    cache_cleared = true;
                }
            }

            let status = self.runner.run(&command)?;
            if status.success() {
                info!("Successfully synced {}", target.repoid);
                let outcome = if step == SyncStep::Plain {
                    SyncOutcome::Success
                } else {
                    SyncOutcome::Remediated
                };
                return Ok(SyncAttempt {
                    repoid: target.repoid.clone(),
                    attempts,
                    removed,
                    cache_cleared,
                    outcome,
                    status,
                });
            }
            last = Some(status);
        }

        Ok(SyncAttempt {
            repoid: target.repoid.clone(),
            attempts: MAX_ATTEMPTS,
            removed,
            cache_cleared,
            outcome: SyncOutcome::Fatal,
            status: last.unwrap_or_else(|| CommandStatus {
                code: -1,
                stdout: String::new(),
                stderr: String::new(),
            }),
        })
    }

    /// Full `reposync` command line for one repository
    pub fn command(&self, repoid: &str, scratch: &Path) -> Vec<String> {
        vec![
            self.bin.clone(),
            "--config".to_string(),
            self.yum_config.display().to_string(),
            "--newest-only".to_string(),
            "--delete".to_string(),
            "--cachedir".to_string(),
            scratch.display().to_string(),
            "--download_path".to_string(),
            self.sync_dir.display().to_string(),
            "--repoid".to_string(),
            repoid.to_string(),
        ]
    }
}

/// Package name prefixes reposync reported as broken
///
/// Recognizes `<pkg>: [Errno 256]` (a stale version) and `<pkg> FAILED`
/// (a failed download).
pub fn broken_packages(output: &str) -> Result<BTreeSet<String>> {
    let wrong_version = Regex::new(&format!(r"(?P<package_name>{}): \[Errno 256\]", RPM_NAME))?;
    let wrong_release = Regex::new(&format!(r"(?P<package_name>{}) FAILED", RPM_NAME))?;

    Ok(wrong_version
        .captures_iter(output)
        .chain(wrong_release.captures_iter(output))
        .filter_map(|caps| caps.name("package_name"))
        .map(|m| m.as_str().to_string())
        .collect())
}

/// Delete cached RPMs that reposync reported as broken
///
/// Best effort: a file that can't be removed is logged and skipped.
/// Returns the removed files.
pub fn remove_broken_rpms(reposync_out: &str, repo_path: &Path) -> Result<Vec<PathBuf>> {
    if reposync_out.is_empty() || !repo_path.is_dir() {
        warn!(
            "unable to remove broken RPMs, no reposync output or missing repo path {}",
            repo_path.display()
        );
        return Ok(Vec::new());
    }

    let packages = broken_packages(reposync_out)?;
    if packages.is_empty() {
        return Ok(Vec::new());
    }
    debug!(
        "detected package errors in reposync output in {}: {}",
        repo_path.display(),
        packages.iter().cloned().collect::<Vec<_>>().join(",")
    );

    let mut removed = Vec::new();
    for entry in WalkDir::new(repo_path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(".rpm") || !packages.iter().any(|p| name.starts_with(p.as_str())) {
            continue;
        }

        let bad_package = entry.path();
        info!("removing conflicting RPM: {}", bad_package.display());
        match fs::remove_file(bad_package) {
            Ok(()) => removed.push(bad_package.to_path_buf()),
            Err(e) => warn!("failed to remove {}: {}", bad_package.display(), e),
        }
    }

    if !removed.is_empty() {
        debug!("removed {} conflicting packages", removed.len());
    }
    Ok(removed)
}
