//! http-echo: a minimal HTTP server for liveness and routing tests
//!
//! Answers every request with a fixed text payload and a configurable status
//! code, plus a fixed `/health` endpoint. Shuts down gracefully on
//! SIGINT/SIGTERM.

pub mod config;
pub mod error;
pub mod server;
pub mod version;

pub use config::{Config, ConfigError, Startup};
pub use error::Error;
