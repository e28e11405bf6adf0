//! # Repoman Merge
//!
//! Builds the target repository by handing every source to `repoman add`.
//!
//! Source order matters: when the same package exists in several sources the
//! first one wins. Custom sources therefore come first, in the order the user
//! gave them, followed by each synced cache directory tagged
//! `:only-missing` so it only fills in packages nothing before it provided.

use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Error, Result};
use crate::process::CommandRunner;

/// Source suffix telling repoman to add only packages not yet present
pub const ONLY_MISSING: &str = ":only-missing";

/// Options used when no repoman config is given
pub const DEFAULT_OPTIONS: [&str; 4] = [
    "--option=main.on_empty_source=warn",
    "--option=store.RPMStore.on_wrong_distro=copy_to_all",
    "--option=store.RPMStore.with_srcrpms=false",
    "--option=store.RPMStore.with_sources=false",
];

/// Merge sources in priority order: custom sources, then cache directories
pub fn merge_sources<'p, I>(custom_sources: &[String], cache_dirs: I) -> Vec<String>
where
    I: IntoIterator<Item = &'p Path>,
{
    custom_sources
        .iter()
        .cloned()
        .chain(
            cache_dirs
                .into_iter()
                .map(|dir| format!("{}{}", dir.display(), ONLY_MISSING)),
        )
        .collect()
}

/// Drives `repoman` to assemble the target repository
pub struct Repoman<'a> {
    runner: &'a dyn CommandRunner,
    bin: String,
    config: Option<PathBuf>,
}

impl<'a> Repoman<'a> {
    /// `config` is a repoman config file; `store.RPMStore.rpm_dir` is always
    /// overridden by the destination.
    pub fn new(runner: &'a dyn CommandRunner, bin: impl Into<String>, config: Option<PathBuf>) -> Self {
        Self {
            runner,
            bin: bin.into(),
            config,
        }
    }

    /// Full `repoman` command line
    ///
    /// Fails if a config was given but does not exist.
    pub fn command(&self, sources: &[String], dest: &Path) -> Result<Vec<String>> {
        let mut cmd = vec![self.bin.clone()];
        match &self.config {
            None => cmd.extend(DEFAULT_OPTIONS.iter().map(|o| o.to_string())),
            Some(config) if config.is_file() => cmd.push(format!("--config={}", config.display())),
            Some(config) => {
                return Err(Error::ConfigurationMissing {
                    path: config.clone(),
                })
            }
        }

        cmd.push("--option=store.RPMStore.rpm_dir=".to_string());
        cmd.push(dest.display().to_string());
        cmd.push("add".to_string());
        cmd.extend(sources.iter().cloned());
        Ok(cmd)
    }

    /// Add `sources` to the repository at `dest`
    pub fn merge(&self, sources: &[String], dest: &Path) -> Result<()> {
        let cmd = self.command(sources, dest)?;

        info!("Running repoman");
        let status = self.runner.run(&cmd)?;
        if !status.success() {
            return Err(Error::MergeFailure {
                sources: sources.to_vec(),
                dest: dest.to_path_buf(),
                stderr: status.stderr,
            });
        }
        Ok(())
    }
}
