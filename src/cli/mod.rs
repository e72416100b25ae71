//! CLI module for filedepot
//!
//! Provides command-line interface for:
//! - serve: Run the HTTP server
//! - list: Print the stored files
//! - token: Mint a bearer token for local use

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{list, load_config, run, run_command, serve, token};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_response;
