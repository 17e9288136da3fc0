//! Serve loop and bounded graceful shutdown
//!
//! Starting -> Listening -> ShuttingDown -> Terminated
//!
//! The serve task runs independently of the caller, which waits for a stop
//! request. The serve task finishing on its own before that is fatal.

use super::shutdown::shutdown_channel;
use axum::Router;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tracing::{info, warn};

/// How the server reached `Terminated`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// All in-flight requests finished within the grace period
    Drained,
    /// Grace period elapsed; the serve task was aborted and open
    /// connections are dropped with the runtime
    TimedOut,
}

/// Fatal serve or shutdown failures
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to register listener with the runtime: {0}")]
    Register(#[source] io::Error),

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] io::Error),

    #[error("server exited unexpectedly")]
    Exited,

    #[error("server exited with: {0}")]
    Serve(#[source] io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] JoinError),

    #[error("failed to shutdown server: {0}")]
    Shutdown(#[source] io::Error),
}

/// Serve `router` on `listener` until `stop` resolves, then shut down gracefully
///
/// After `stop` resolves no new connections are accepted and in-flight
/// requests get up to `grace` to complete. An error from `stop` (signal
/// handler registration) aborts the server and is returned as
/// [`ServerError::Signal`].
pub async fn serve_until<S>(
    listener: std::net::TcpListener,
    router: Router,
    stop: S,
    grace: Duration,
) -> Result<ShutdownOutcome, ServerError>
where
    S: Future<Output = io::Result<&'static str>>,
{
    let listener = TcpListener::from_std(listener).map_err(ServerError::Register)?;
    let local_addr = listener.local_addr().map_err(ServerError::Register)?;

    let (controller, mut signal) = shutdown_channel();
    let app = router.into_make_service_with_connect_info::<SocketAddr>();

    let mut serve = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.wait().await })
            .await
    });
    info!(addr = %local_addr, "server is listening");

    let reason = tokio::select! {
        result = &mut serve => {
            return Err(match result {
                Ok(Ok(())) => ServerError::Exited,
                Ok(Err(e)) => ServerError::Serve(e),
                Err(e) => ServerError::Task(e),
            });
        }
        reason = stop => reason,
    };

    let reason = match reason {
        Ok(reason) => reason,
        Err(e) => {
            serve.abort();
            return Err(ServerError::Signal(e));
        }
    };

    info!(reason, grace = ?grace, "received interrupt, shutting down");
    controller.shutdown();

    match tokio::time::timeout(grace, &mut serve).await {
        Ok(Ok(Ok(()))) => {
            info!("server drained");
            Ok(ShutdownOutcome::Drained)
        }
        Ok(Ok(Err(e))) => Err(ServerError::Shutdown(e)),
        Ok(Err(e)) => Err(ServerError::Task(e)),
        Err(_) => {
            serve.abort();
            warn!(
                grace = ?grace,
                "grace period elapsed, closing remaining connections"
            );
            Ok(ShutdownOutcome::TimedOut)
        }
    }
}
