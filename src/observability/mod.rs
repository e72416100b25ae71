//! Observability
//!
//! Structured logging for the server and the CLI.

pub mod logger;

pub use logger::{init_logging, LogFormat};
