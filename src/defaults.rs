//! Default values for mkrepo.
//!
//! This module provides centralized default values used across the library
//! and the CLI, ensuring consistency and avoiding duplication.

use std::path::PathBuf;
use std::time::Duration;

/// Basename of the lock file placed in every locked directory.
pub const LOCK_NAME: &str = "mkrepo.lock";

/// How long reposetup waits for all of its directory locks.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(180);

/// Default location of the RPM cache.
pub const SYNC_DIR: &str = "/var/cache/mkrepo";

/// Sync tool binary, resolved through `PATH` unless overridden.
pub const REPOSYNC_BIN: &str = "reposync";

/// Merge tool binary, resolved through `PATH` unless overridden.
pub const REPOMAN_BIN: &str = "repoman";

/// Section of the yum config that never names a repository.
pub const YUM_MAIN_SECTION: &str = "main";

/// Returns the default RPM cache directory.
///
/// This can be overridden by the `--sync-dir` CLI flag.
pub fn default_sync_dir() -> PathBuf {
    PathBuf::from(SYNC_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sync_dir_is_absolute() {
        let sync_dir = default_sync_dir();
        assert!(sync_dir.is_absolute());
        assert!(sync_dir.ends_with("mkrepo"));
    }

    #[test]
    fn test_lock_timeout_is_three_minutes() {
        assert_eq!(LOCK_TIMEOUT.as_secs(), 180);
    }
}
