//! # External Process Execution
//!
//! Every external tool mkrepo drives (`reposync`, `repoman`) is started
//! through this module. Commands are spawned directly from an argument
//! vector, never through a shell, and a nonzero exit code is *not* an
//! error here: the caller gets a [`CommandStatus`] and decides what the exit
//! code means.
//!
//! ## Design
//!
//! The [`CommandRunner`] trait is the seam between the coordination logic and
//! the operating system. [`SystemRunner`] is the real implementation; tests
//! substitute scripted runners to simulate tool failures without installing
//! the tools.

use std::collections::HashMap;
use std::env;
use std::ffi::{OsStr, OsString};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use log::debug;

use crate::error::{Error, Result};

/// Result of one finished external process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code, `-1` if the process was killed by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandStatus {
    /// `true` when the process exited with status zero
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Trait for running external commands - allows scripting tool results in tests
pub trait CommandRunner {
    /// Runs `command` (program followed by its arguments) to completion.
    ///
    /// Returns `Err` only when the process could not be run at all.
    fn run(&self, command: &[String]) -> Result<CommandStatus>;
}

/// Runs commands on the host with the ambient environment
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &[String]) -> Result<CommandStatus> {
        run_command(command, None, None)
    }
}

/// Run a command and wait for it to exit
///
/// * `input` - fed to the process through stdin when given
/// * `env` - replaces the process environment when given; its `PATH` is
///   merged with the ambient `PATH` so the tool can still be resolved
pub fn run_command(
    command: &[String],
    input: Option<&[u8]>,
    env: Option<&HashMap<String, String>>,
) -> Result<CommandStatus> {
    let command_line = command.join(" ");
    let (program, args) = command.split_first().ok_or_else(|| Error::CommandSpawn {
        command: command_line.clone(),
        message: "empty command".to_string(),
    })?;

    debug!("Run command: {}", command_line);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

    if let Some(env) = env {
        cmd.env_clear().envs(env);
        let ambient = env::var_os("PATH");
        if let Some(path) = merge_path(env.get("PATH").map(String::as_str), ambient.as_deref()) {
            cmd.env("PATH", path);
        }
    }

    let mut child = cmd.spawn().map_err(|e| Error::CommandSpawn {
        command: command_line.clone(),
        message: e.to_string(),
    })?;

    // Written from a separate thread so a chatty child can't deadlock us
    let writer = match (input, child.stdin.take()) {
        (Some(data), Some(mut stdin)) => {
            let data = data.to_vec();
            Some(thread::spawn(move || stdin.write_all(&data)))
        }
        _ => None,
    };

    let output = child.wait_with_output()?;

    if let Some(handle) = writer {
        if let Ok(Err(e)) = handle.join() {
            if e.kind() != ErrorKind::BrokenPipe {
                debug!("{}: failed to write stdin: {}", command_line, e);
            }
        }
    }

    let status = CommandStatus {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    debug!(
        "{}: command exit with return code: {}",
        command_line, status.code
    );
    if !status.stdout.is_empty() {
        debug!("{}: command stdout: {}", command_line, status.stdout);
    }
    if !status.stderr.is_empty() {
        debug!("{}: command stderr: {}", command_line, status.stderr);
    }

    Ok(status)
}

/// Caller's PATH entries first, then ambient entries not already present
fn merge_path(custom: Option<&str>, ambient: Option<&OsStr>) -> Option<OsString> {
    let mut entries: Vec<PathBuf> = Vec::new();
    let custom_entries = custom.into_iter().flat_map(|p| env::split_paths(p));
    let ambient_entries = ambient.into_iter().flat_map(|p| env::split_paths(p));

    for entry in custom_entries.chain(ambient_entries) {
        if !entry.as_os_str().is_empty() && !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    if entries.is_empty() {
        return None;
    }
    env::join_paths(entries).ok()
}
