//! filedepot - shared file storage over HTTP
//!
//! Authenticated users upload files into one flat store, list them, export
//! one file or a ZIP of several, and delete them in batches.

pub mod auth;
pub mod cli;
pub mod file_storage;
pub mod http_server;
pub mod observability;
