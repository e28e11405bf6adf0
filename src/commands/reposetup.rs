//! Reposetup command implementation
//!
//! The reposetup command runs the whole flow:
//! 1. Lock the destination and the RPM cache
//! 2. Sync the RPM cache with reposync (unless `--skip-sync`)
//! 3. Merge custom sources and the cache into the destination with repoman

use std::path::{self, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use log::info;

use mkrepo::defaults;
use mkrepo::orchestrator::{reposetup, ReposetupOptions};
use mkrepo::process::SystemRunner;
use mkrepo::reposync::SyncOutcome;

/// Arguments for the reposetup command
#[derive(Args, Debug)]
pub struct ReposetupArgs {
    /// Where to create the repo
    #[arg(long, value_name = "PATH")]
    pub dest: PathBuf,

    /// Where to store RPM cache
    #[arg(long, value_name = "PATH", default_value = defaults::SYNC_DIR)]
    pub sync_dir: PathBuf,

    /// Sync RPM cache (default)
    #[arg(long, overrides_with = "skip_sync")]
    pub sync: bool,

    /// Don't sync RPM cache, build from what is already cached
    #[arg(long, overrides_with = "sync")]
    pub skip_sync: bool,

    /// Yum config to use for syncing the RPM cache and building the target
    /// repo. If not specified, cache sync will be skipped.
    #[arg(long, value_name = "PATH")]
    pub yum_config: Option<PathBuf>,

    /// A config for repoman. Note that store.RPMStore.rpm_dir is not
    /// configurable.
    #[arg(long, value_name = "PATH")]
    pub repoman_config: Option<PathBuf>,

    /// Add an extra RPM source to the target repo. Sources are added in the
    /// order given, before any RPM from the cache, so a different order can
    /// result in a different repo.
    #[arg(long = "custom-source", value_name = "SOURCE")]
    pub custom_sources: Vec<PathBuf>,

    /// reposync binary to run
    #[arg(long, value_name = "PATH", env = "MKREPO_REPOSYNC", default_value = defaults::REPOSYNC_BIN)]
    pub reposync_bin: String,

    /// repoman binary to run
    #[arg(long, value_name = "PATH", env = "MKREPO_REPOMAN", default_value = defaults::REPOMAN_BIN)]
    pub repoman_bin: String,
}

impl ReposetupArgs {
    /// Resolve paths and turn the arguments into library options
    pub fn into_options(self) -> Result<ReposetupOptions> {
        let mut options = ReposetupOptions::new(path::absolute(&self.dest)?);
        options.sync_dir = path::absolute(&self.sync_dir)?;
        options.sync = !self.skip_sync;

        if let Some(yum_config) = &self.yum_config {
            if !yum_config.exists() {
                anyhow::bail!("Yum config not found: {}", yum_config.display());
            }
            options.yum_config = Some(path::absolute(yum_config)?);
        }
        options.repoman_config = self
            .repoman_config
            .as_deref()
            .map(path::absolute)
            .transpose()?;

        for source in &self.custom_sources {
            let resolved = source
                .canonicalize()
                .with_context(|| format!("Custom source not found: {}", source.display()))?;
            options
                .custom_sources
                .push(resolved.display().to_string());
        }

        options.reposync_bin = self.reposync_bin;
        options.repoman_bin = self.repoman_bin;
        Ok(options)
    }
}

/// Execute the reposetup command
pub fn execute(args: ReposetupArgs) -> Result<()> {
    let options = args.into_options()?;
    let report = reposetup(&options, &SystemRunner)?;

    for attempt in report
        .synced
        .iter()
        .filter(|a| a.outcome == SyncOutcome::Remediated)
    {
        info!(
            "{} synced after {} attempts ({} broken RPMs removed)",
            attempt.repoid,
            attempt.attempts,
            attempt.removed.len()
        );
    }
    Ok(())
}
