//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `mkrepo`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! Each command module contains an `execute` function that takes the parsed
//! arguments and performs the command's logic, calling into the `mkrepo`
//! library for the actual work.

pub mod reposetup;
pub mod version;
