//! Graceful shutdown handling
//!
//! Handles SIGTERM and SIGINT signals for clean shutdown:
//! - Stops accepting new connections
//! - Gives in-flight requests a bounded grace period
//! - Drops whatever is still open once the grace period elapses

use std::io;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Grace period for in-flight requests once shutdown starts
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Receiving half of the shutdown channel
///
/// Handed to the serve task as its graceful-shutdown trigger.
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait for shutdown signal
    pub async fn wait(&mut self) {
        while !*self.receiver.borrow() {
            if self.receiver.changed().await.is_err() {
                // Sender dropped, treat as shutdown
                break;
            }
        }
    }
}

/// Sending half of the shutdown channel
pub struct ShutdownController {
    sender: watch::Sender<bool>,
}

impl ShutdownController {
    /// Trigger shutdown
    pub fn shutdown(&self) {
        let _ = self.sender.send(true);
        info!("Shutdown signal sent");
    }
}

/// Create a new shutdown signal pair
///
/// Returns (controller, signal) where:
/// - controller: Used to trigger shutdown
/// - signal: Awaited by the serve task
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownController { sender }, ShutdownSignal { receiver })
}

/// Registered SIGTERM/SIGINT handlers (Ctrl+C on non-Unix)
///
/// Registering before the listener exists means a signal can never hit the
/// default disposition once the port is accepting connections.
pub struct TerminationSignals {
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
}

impl TerminationSignals {
    /// Install the signal handlers
    #[cfg(unix)]
    pub fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Install the signal handlers
    #[cfg(not(unix))]
    pub fn register() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for SIGTERM or SIGINT, returning the signal name
    #[cfg(unix)]
    pub async fn recv(mut self) -> io::Result<&'static str> {
        let name = tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        };
        info!(signal = name, "Received signal");
        Ok(name)
    }

    /// Wait for Ctrl+C
    #[cfg(not(unix))]
    pub async fn recv(self) -> io::Result<&'static str> {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
        Ok("CTRL_C")
    }
}

