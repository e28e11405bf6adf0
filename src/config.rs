//! # Yum Configuration
//!
//! The yum config handed to `reposync` doubles as the list of repositories
//! to mirror: every section except `[main]` is a repository identifier, and
//! each identifier is synced into `<sync_dir>/<identifier>`.
//!
//! Only the section names are read here. Everything else in the file is
//! interpreted by the sync tool.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption};
use log::error;

use crate::defaults::YUM_MAIN_SECTION;
use crate::error::{Error, Result};

/// One upstream repository and the cache directory it is synced into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    /// Repository identifier, the yum config section name
    pub repoid: String,
    /// `<sync_dir>/<repoid>`
    pub path: PathBuf,
}

/// Resolve the repositories to sync, in config file order
///
/// Without a yum config there is nothing to sync and the result is empty.
pub fn repo_paths(sync_dir: &Path, yum_config: Option<&Path>) -> Result<Vec<RepoTarget>> {
    let Some(yum_config) = yum_config else {
        return Ok(Vec::new());
    };

    let repoids = read_repo_ids(yum_config).inspect_err(|_| {
        error!("Failed to read {}", yum_config.display());
    })?;

    Ok(repoids
        .into_iter()
        .map(|repoid| RepoTarget {
            path: sync_dir.join(&repoid),
            repoid,
        })
        .collect())
}

/// Read the repository identifiers declared in a yum config file
pub fn read_repo_ids(yum_config: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(yum_config).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::ConfigurationMissing {
            path: yum_config.to_path_buf(),
        },
        _ => Error::Io(e),
    })?;

    parse_repo_ids(&content).map_err(|message| Error::ConfigParse {
        path: yum_config.to_path_buf(),
        message,
    })
}

/// Section names of a yum config, excluding `[main]`, without duplicates
pub fn parse_repo_ids(content: &str) -> std::result::Result<Vec<String>, String> {
    // Yum values may span indented continuation lines and contain backslashes
    let options = ParseOption {
        enabled_escape: false,
        enabled_indented_mutiline_value: true,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(content, options).map_err(|e| e.to_string())?;

    let mut repoids: Vec<String> = Vec::new();
    for section in ini.sections().flatten() {
        if section == YUM_MAIN_SECTION || repoids.iter().any(|r| r == section) {
            continue;
        }
        repoids.push(section.to_string());
    }

    Ok(repoids)
}
