//! Top-level error and process exit codes

use crate::config::ConfigError;
use crate::server::{ListenerError, ServerError};
use thiserror::Error;

/// `-version` was requested
pub const EXIT_VERSION: u8 = 0;

/// Listener creation failed, or the server failed fatally
pub const EXIT_FAILURE: u8 = 1;

/// Normal termination after SIGINT/SIGTERM
pub const EXIT_INTERRUPTED: u8 = 2;

/// Missing text or extra arguments
pub const EXIT_CONFIG: u8 = 127;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create listener: {0}")]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

impl Error {
    /// Exit code the process terminates with for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) => EXIT_CONFIG,
            Error::Listener(_) | Error::Server(_) => EXIT_FAILURE,
        }
    }
}
