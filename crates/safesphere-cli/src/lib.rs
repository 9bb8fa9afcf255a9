//! SafeSphere CLI - command line access to zones, alerts and routes.
//!
//! The `safesphere` binary parses [`Cli`], opens the database and runs one
//! command, printing its result as JSON on stdout. Logs go to stderr.

pub mod commands;
pub mod logging;

pub use commands::{run, Cli, Command};
