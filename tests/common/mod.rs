//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_yum_config(configs::TWO_REPOS);
//!     // ... test code
//! }
//! ```

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use mkrepo::error::Result;
use mkrepo::lock::{Flock, LockMode};
use mkrepo::process::{CommandRunner, CommandStatus};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::{hold_lock, is_locked, status, ScriptedRunner, TestFixture};
}

/// Yum config snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// Two repositories besides `[main]`.
    pub const TWO_REPOS: &str = "[main]\nkeepcache=1\n\n[repo_a]\nname=a\n\n[repo_b]\nname=b\n";

    /// Only the `[main]` section, nothing to sync.
    pub const MAIN_ONLY: &str = "[main]\nkeepcache=1\n";
}

/// Basename of the lock files mkrepo creates.
#[allow(dead_code)]
pub const LOCK_NAME: &str = "mkrepo.lock";

/// Build a [`CommandStatus`] with the given exit code and output.
#[allow(dead_code)]
pub fn status(code: i32, stdout: &str, stderr: &str) -> CommandStatus {
    CommandStatus {
        code,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

/// Hold `<dir>/mkrepo.lock` the way a concurrent mkrepo run would.
#[allow(dead_code)]
pub fn hold_lock(dir: &Path) -> Flock {
    let mut lock = Flock::new(dir.join(LOCK_NAME), LockMode::Exclusive, false);
    lock.acquire().expect("lock should be free");
    lock
}

/// Whether someone currently holds `<dir>/mkrepo.lock`.
#[allow(dead_code)]
pub fn is_locked(dir: &Path) -> bool {
    let mut probe = Flock::new(dir.join(LOCK_NAME), LockMode::Exclusive, false);
    probe.acquire().is_err()
}

/// A [`CommandRunner`] that answers through a closure and records every call.
///
/// # Example
///
/// ```rust,ignore
/// let runner = ScriptedRunner::new(|_cmd| status(0, "", ""));
/// reposetup(&options, &runner).unwrap();
/// assert_eq!(runner.programs(), vec!["repoman"]);
/// ```
#[allow(dead_code)]
pub struct ScriptedRunner<F: Fn(&[String]) -> CommandStatus> {
    respond: F,
    calls: RefCell<Vec<Vec<String>>>,
}

#[allow(dead_code)]
impl<F: Fn(&[String]) -> CommandStatus> ScriptedRunner<F> {
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Every command run so far.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    /// Program name of every command run so far.
    pub fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c[0].clone()).collect()
    }
}

impl<F: Fn(&[String]) -> CommandStatus> CommandRunner for ScriptedRunner<F> {
    fn run(&self, command: &[String]) -> Result<CommandStatus> {
        self.calls.borrow_mut().push(command.to_vec());
        Ok((self.respond)(command))
    }
}

/// A test fixture that provides a temporary directory laid out for mkrepo.
///
/// The directory holds `dest/` (the target repo), `cache/` (the sync dir)
/// and whatever configs and fake tools the test adds.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_yum_config(configs::TWO_REPOS)
///     .with_fake_tool("repoman", "exit 0");
///
/// let mut cmd = cargo_bin_cmd!("mkrepo");
/// cmd.args(fixture.reposetup_args())
///     .assert()
///     .success();
/// ```
#[allow(dead_code)]
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Root of the fixture.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Target repository directory.
    pub fn dest(&self) -> PathBuf {
        self.path().join("dest")
    }

    /// RPM cache directory.
    pub fn sync_dir(&self) -> PathBuf {
        self.path().join("cache")
    }

    /// Path of the yum config written by [`Self::with_yum_config`].
    pub fn yum_config(&self) -> PathBuf {
        self.path().join("yum.conf")
    }

    /// File the fake tools append their arguments to.
    pub fn call_log(&self) -> PathBuf {
        self.path().join("calls.log")
    }

    /// Lines of the call log, one per fake tool invocation.
    pub fn logged_calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.call_log())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Write the yum config.
    pub fn with_yum_config(self, content: &str) -> Self {
        self.temp_dir
            .child("yum.conf")
            .write_str(content)
            .expect("Failed to write yum config");
        self
    }

    /// Create a directory of RPMs usable as a custom source.
    pub fn with_custom_source(self, name: &str, rpms: &[&str]) -> Self {
        let dir = self.temp_dir.child(name);
        dir.create_dir_all().expect("Failed to create custom source");
        for rpm in rpms {
            dir.child(rpm).write_str("rpm").expect("Failed to write rpm");
        }
        self
    }

    /// Install an executable shell script named `name` in `bin/`.
    ///
    /// Every invocation first appends `<name> <args>` to the call log, then
    /// runs `body`.
    #[cfg(unix)]
    pub fn with_fake_tool(self, name: &str, body: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let script = self.temp_dir.child("bin").child(name);
        script
            .write_str(&format!(
                "#!/bin/sh\necho \"{} $*\" >> \"{}\"\n{}\n",
                name,
                self.call_log().display(),
                body
            ))
            .expect("Failed to write fake tool");
        std::fs::set_permissions(script.path(), std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make fake tool executable");
        self
    }

    /// Path of a fake tool installed with [`Self::with_fake_tool`].
    pub fn tool(&self, name: &str) -> PathBuf {
        self.path().join("bin").join(name)
    }

    /// `reposetup` arguments pointing at this fixture's dest, cache and tools.
    pub fn reposetup_args(&self) -> Vec<String> {
        vec![
            "reposetup".to_string(),
            "--dest".to_string(),
            self.dest().display().to_string(),
            "--sync-dir".to_string(),
            self.sync_dir().display().to_string(),
            "--reposync-bin".to_string(),
            self.tool("reposync").display().to_string(),
            "--repoman-bin".to_string(),
            self.tool("repoman").display().to_string(),
        ]
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
