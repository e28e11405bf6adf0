//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for
//! `mkrepo`. It uses the `thiserror` library to create an `Error` enum that
//! covers every failure the coordination layer can observe, and a separate
//! [`ReposetupError`] that is the only error a caller of the top-level flow
//! ever sees.
//!
//! ## Key Components
//!
//! - **`Error`**: The internal error taxonomy. Lock contention
//!   (`WouldBlock`), lock timeouts, sync and merge tool failures, missing or
//!   malformed configuration, and I/O failures each get their own variant.
//!
//! - **`ReposetupError`**: The coarse-grained error raised at the
//!   orchestration boundary. It names the destination repository and carries
//!   a human-readable summary of whatever went wrong underneath.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for mkrepo operations
#[derive(Error, Debug)]
pub enum Error {
    /// A lock file is currently held by another process.
    ///
    /// Only surfaced from a non-blocking acquire; the lock coordinator
    /// recovers from it by polling.
    #[error("Lock is held elsewhere: {}", path.display())]
    WouldBlock { path: PathBuf },

    /// Not every requested path could be locked before the timeout expired.
    #[error("Failed to lock {paths} after {timeout_secs} seconds")]
    LockTimeout { paths: String, timeout_secs: f64 },

    /// The sync tool kept failing after every recovery step was exhausted.
    #[error("Reposync command failed for {repoid}\nstdout:\n\t{stdout}\nstderr:\n\t{stderr}")]
    SyncFailure {
        repoid: String,
        stdout: String,
        stderr: String,
    },

    /// The merge tool returned a nonzero exit code.
    #[error("Failed merging repoman sources: {sources:?} into directory: {}\n{stderr}", dest.display())]
    MergeFailure {
        sources: Vec<String>,
        dest: PathBuf,
        stderr: String,
    },

    /// A configuration file that is required at this point does not exist.
    #[error("Configuration file not found: {}", path.display())]
    ConfigurationMissing { path: PathBuf },

    /// A configuration file exists but could not be parsed.
    #[error("Configuration parsing error in {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// An external command could not be started at all.
    #[error("Failed to run {command}: {message}")]
    CommandSpawn { command: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The single error reported by [`crate::orchestrator::reposetup`].
///
/// Internal error kinds are flattened into `message`; callers only need to
/// know that building `dest` failed and why.
#[derive(Error, Debug)]
#[error("Failed to create repo {}: {message}", dest.display())]
pub struct ReposetupError {
    pub dest: PathBuf,
    pub message: String,
}
