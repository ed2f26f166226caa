//! Signal handling for graceful shutdown

use tracing::debug;

/// Handles shutdown signals (SIGTERM/SIGINT on Unix, Ctrl-C elsewhere)
///
/// The signal itself is not teardown: the caller turns it into a shutdown
/// message on the session's control channel, so in-flight key-event
/// processing completes before the subscription closes.
pub struct ShutdownSignal;

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self
    }

    /// Wait for a shutdown signal
    #[cfg(unix)]
    pub async fn wait(&self) {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt())
            .expect("failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                debug!("received SIGTERM");
            }
            _ = sigint.recv() => {
                debug!("received SIGINT");
            }
        }
    }

    /// Wait for a shutdown signal
    #[cfg(not(unix))]
    pub async fn wait(&self) {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("received Ctrl-C");
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
