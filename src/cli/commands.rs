//! CLI command implementations
//!
//! Commands load the JSON configuration, then either run the server or do
//! one thing against the store and exit.

use std::fs;
use std::io;
use std::path::Path;

use serde_json::json;

use crate::auth::JwtManager;
use crate::file_storage::{format_bytes, FileStorage};
use crate::http_server::{HttpServer, HttpServerConfig};
use crate::observability::init_logging;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Load configuration from file.
///
/// A missing file means defaults; anything unreadable or invalid is an error.
pub fn load_config(path: &Path) -> CliResult<HttpServerConfig> {
    let config = match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str::<HttpServerConfig>(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => HttpServerConfig::default(),
        Err(e) => return Err(CliError::config_error(format!("Failed to read config: {}", e))),
    };

    config.validate().map_err(CliError::config_error)?;
    Ok(config)
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_logging(cli.log_format).map_err(CliError::io_error)?;
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(&config, port),
        Command::List { config } => list(&config),
        Command::Token { config, subject } => token(&config, &subject),
    }
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::io_error(format!("Failed to create tokio runtime: {}", e)))
}

/// Run the HTTP server until interrupted
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.port = port;
    }
    if !config.auth.enabled {
        tracing::warn!("authentication disabled, every request is anonymous");
    }

    let server = HttpServer::with_config(config);
    runtime()?.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::serve_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Print the catalog of the configured store
pub fn list(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let storage = FileStorage::new(&config.storage_dir);

    let files = runtime()?.block_on(storage.list())?;
    let entries: Vec<_> = files
        .iter()
        .map(|f| {
            json!({
                "name": f.name,
                "size": format_bytes(f.size),
                "bytes": f.size,
                "modified": f.modified_at.to_rfc3339(),
                "extension": f.extension,
            })
        })
        .collect();

    write_response(json!({
        "store": config.storage_dir.display().to_string(),
        "count": entries.len(),
        "files": entries,
    }))
}

/// Print a bearer token for `subject`
pub fn token(config_path: &Path, subject: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    if !config.auth.enabled {
        return Err(CliError::config_error("auth is disabled in this configuration"));
    }

    let jwt = JwtManager::new(config.auth.jwt_config());
    let access_token = jwt.issue_token(subject)?;

    write_response(json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": config.auth.token_ttl_minutes * 60,
    }))
}
