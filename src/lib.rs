//! # mkrepo Library
//!
//! This library builds RPM repositories from multiple sources. Upstream
//! repositories are mirrored into a local cache with `reposync`, and the
//! cache plus any custom sources are merged into a target directory with
//! `repoman`. It is designed to be used by the `mkrepo` command-line tool
//! but the flow can be embedded directly.
//!
//! ## Quick Example
//!
//! ```no_run
//! use mkrepo::orchestrator::{reposetup, ReposetupOptions};
//! use mkrepo::process::SystemRunner;
//!
//! let mut options = ReposetupOptions::new("/srv/repos/el7");
//! options.yum_config = Some("/etc/mkrepo/yum.conf".into());
//! options.custom_sources = vec!["/srv/rpms/hotfixes".to_string()];
//!
//! reposetup(&options, &SystemRunner).unwrap();
//! ```
//!
//! ## Core Concepts
//!
//! - **Locking (`lock`)**: The destination and every cache directory are
//!   locked through advisory lock files before anything touches them, so
//!   concurrent builds over overlapping directories wait for each other
//!   instead of corrupting each other.
//! - **Syncing (`reposync`)**: Each repository is synced with a bounded
//!   recovery ladder for the failures `reposync` is known to produce.
//! - **Merging (`repoman`)**: Sources are merged in priority order, custom
//!   sources before the cache.
//! - **Processes (`process`)**: External tools run through the
//!   `CommandRunner` trait, which tests replace with scripted runners.
//!
//! ## Execution Flow
//!
//! The main entry point is `orchestrator::reposetup`:
//!
//! 1.  **Resolve**: Read repository identifiers from the yum config.
//! 2.  **Prepare**: Create the destination and cache directories.
//! 3.  **Lock**: Exclusively lock all of them, in sorted order.
//! 4.  **Sync**: Run reposync for every repository (optional).
//! 5.  **Merge**: Run repoman to populate the destination.

pub mod config;
pub mod defaults;
pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod process;
pub mod repoman;
pub mod reposync;

#[cfg(test)]
mod ordering_proptest;
