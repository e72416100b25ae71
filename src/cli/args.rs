//! CLI argument definitions using clap
//!
//! Commands:
//! - filedepot serve --config <path> [--port <port>]
//! - filedepot list --config <path>
//! - filedepot token --config <path> --subject <id>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::observability::LogFormat;

/// filedepot - shared file storage over HTTP
#[derive(Parser, Debug)]
#[command(name = "filedepot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./filedepot.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the stored files as JSON and exit
    List {
        /// Path to configuration file
        #[arg(long, default_value = "./filedepot.json")]
        config: PathBuf,
    },

    /// Mint a bearer token signed with the configured secret
    Token {
        /// Path to configuration file
        #[arg(long, default_value = "./filedepot.json")]
        config: PathBuf,

        /// Subject the token is issued to
        #[arg(long)]
        subject: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
