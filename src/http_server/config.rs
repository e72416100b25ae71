//! HTTP Server Configuration
//!
//! Host, port, CORS, the store root and the transfer limits, plus the bearer
//! token settings shared with the identity provider.

use std::path::PathBuf;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::{Authenticator, JwtConfig, JwtManager};

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins (default: none, which allows any origin)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Directory holding the stored files (default: "./uploads")
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Most file parts accepted by one upload (default: 10)
    #[serde(default = "default_max_files_per_upload")]
    pub max_files_per_upload: usize,

    /// Request body ceiling in bytes (default: 100 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Bytes an archive export may buffer ahead of the client (default: 64 KiB)
    #[serde(default = "default_archive_buffer_bytes")]
    pub archive_buffer_bytes: usize,

    #[serde(default)]
    pub auth: AuthSettings,
}

/// Bearer token verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Require a valid bearer token on file routes (default: true)
    #[serde(default = "default_auth_enabled")]
    pub enabled: bool,

    /// HS256 secret shared with the identity provider
    #[serde(default = "default_secret")]
    pub secret: String,

    #[serde(default = "default_issuer")]
    pub issuer: String,

    #[serde(default = "default_issuer")]
    pub audience: String,

    /// Lifetime of tokens minted by `filedepot token` (default: 60)
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_max_files_per_upload() -> usize {
    10
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

fn default_archive_buffer_bytes() -> usize {
    64 * 1024
}

fn default_auth_enabled() -> bool {
    true
}

fn default_secret() -> String {
    JwtConfig::default().secret
}

fn default_issuer() -> String {
    "filedepot".to_string()
}

fn default_token_ttl_minutes() -> i64 {
    60
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            enabled: default_auth_enabled(),
            secret: default_secret(),
            issuer: default_issuer(),
            audience: default_issuer(),
            token_ttl_minutes: default_token_ttl_minutes(),
        }
    }
}

impl AuthSettings {
    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.secret.clone(),
            access_token_ttl: Duration::minutes(self.token_ttl_minutes),
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
        }
    }

    pub fn authenticator(&self) -> Authenticator {
        if self.enabled {
            Authenticator::new(JwtManager::new(self.jwt_config()))
        } else {
            Authenticator::disabled()
        }
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            storage_dir: default_storage_dir(),
            max_files_per_upload: default_max_files_per_upload(),
            max_upload_bytes: default_max_upload_bytes(),
            archive_buffer_bytes: default_archive_buffer_bytes(),
            auth: AuthSettings::default(),
        }
    }
}

impl HttpServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check limits and secrets. Returns a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_files_per_upload == 0 {
            return Err("max_files_per_upload must be > 0".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be > 0".to_string());
        }
        if self.archive_buffer_bytes == 0 {
            return Err("archive_buffer_bytes must be > 0".to_string());
        }
        if self.auth.enabled && self.auth.secret.is_empty() {
            return Err("auth.secret must not be empty when auth is enabled".to_string());
        }
        if self.auth.token_ttl_minutes <= 0 {
            return Err("auth.token_ttl_minutes must be > 0".to_string());
        }
        Ok(())
    }
}
