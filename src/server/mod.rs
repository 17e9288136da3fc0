//! HTTP echo server
//!
//! - `listener` - TCP listener construction (optionally IP_TRANSPARENT)
//! - `routes` - Echo and health handlers, header and access-log wrappers
//! - `lifecycle` - Serve task and bounded graceful shutdown
//! - `shutdown` - Shutdown channel and SIGTERM/SIGINT handling

mod lifecycle;
mod listener;
mod routes;
pub mod shutdown;

pub use lifecycle::{serve_until, ServerError, ShutdownOutcome};
pub use listener::{create_listener, resolve_addr, ListenerError, ListenerOptions};
pub use routes::{
    access_log, build_router, echo, health, with_app_headers, AppStatus, APP_VERSION_HEADER,
    TEXT_CONTENT_TYPE,
};
pub use shutdown::{shutdown_channel, TerminationSignals, SHUTDOWN_TIMEOUT};

use crate::config::Config;
use crate::error::Error;
use tracing::info;

/// Create the listener and serve until SIGINT/SIGTERM
///
/// Returns once the server has shut down. There is no clean exit path:
/// a returned outcome always means a signal was received.
pub async fn run(config: &Config) -> Result<ShutdownOutcome, Error> {
    let signals = TerminationSignals::register().map_err(ServerError::Signal)?;

    let listener = create_listener(
        &config.listen,
        ListenerOptions {
            transparent: config.transparent,
        },
    )?;

    info!(
        listen = %config.listen,
        status = config.status_code,
        transparent = config.transparent,
        "Starting http-echo"
    );

    let router = build_router(config);
    let outcome = serve_until(listener, router, signals.recv(), SHUTDOWN_TIMEOUT).await?;
    Ok(outcome)
}

#[cfg(test)]
#[path = "listener_test.rs"]
mod listener_tests;

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_tests;

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod lifecycle_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
