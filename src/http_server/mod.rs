//! # HTTP Server Module
//!
//! Transport for the file storage core. Everything except `/health` sits
//! behind bearer token authentication.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `POST /upload/files` - Multipart upload (field `fileOrFiles`)
//! - `GET /download/list` - File catalog
//! - `GET /download?filenames=` - Single file or ZIP export
//! - `DELETE /download` - Batch deletion

pub mod config;
pub mod download_routes;
pub mod errors;
pub mod health_routes;
pub mod params;
pub mod server;
pub mod state;
pub mod upload_routes;

pub use config::{AuthSettings, HttpServerConfig};
pub use errors::{ApiError, ErrorResponse};
pub use server::HttpServer;
pub use state::FilesState;
