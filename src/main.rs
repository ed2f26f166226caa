//! layswitchd: background daemon that cycles keyboard input layouts
//!
//! The daemon provides:
//! - A global low-level keyboard listener feeding a two-key chord detector
//! - Layout rotation through the OS keyboard-layout registry
//! - An IPC server for the settings UI (trigger-pair updates, status,
//!   switch notifications)
//!
//! The listener session processes key events, configuration updates, and
//! shutdown through one serialized stream; chord evaluation never races a
//! configuration change.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use layswitch::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; level is overridden by RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "layswitchd starting"
    );

    let config = Config::load()?;
    run(config).await
}

#[cfg(target_os = "windows")]
async fn run(config: Config) -> Result<()> {
    use anyhow::Context;
    use tokio::sync::{broadcast, mpsc};
    use tracing::warn;

    use layswitch::events::SwitcherEvent;
    use layswitch::hotkey::HookListener;
    use layswitch::ipc::Server;
    use layswitch::layout::{LayoutRegistry, WindowsLayoutRegistry};
    use layswitch::lifecycle::ShutdownSignal;
    use layswitch::session::{ListenerSession, SessionControl};

    // Control messages into the session's serialized stream
    let (ctrl_tx, mut ctrl_rx) = mpsc::channel(16);
    // Session -> IPC fan-out for status updates and subscriber pushes
    let (event_tx, _event_rx) = broadcast::channel::<SwitcherEvent>(64);

    let registry = WindowsLayoutRegistry::new();
    let layout_count = registry.enumerate().len();

    let mut session = ListenerSession::new(registry, config.trigger_pair, event_tx.clone());
    let source = HookListener::new();

    let server = Server::bind(config.ipc_addr, ctrl_tx.clone(), event_tx.clone()).await?;
    server.seed_status(config.trigger_pair, layout_count).await;

    // Shutdown becomes a message on the control channel, so in-flight
    // key-event processing completes before the session tears down.
    let shutdown = ShutdownSignal::new();
    let signal_ctrl = ctrl_tx.clone();
    tokio::spawn(async move {
        shutdown.wait().await;
        info!("shutdown signal received");
        let _ = signal_ctrl.send(SessionControl::Shutdown).await;
    });

    let mut status_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    let result = tokio::select! {
        // Run the listener session (chord detection and rotation)
        session_result = session.run(&source, &mut ctrl_rx) => {
            match session_result {
                Ok(()) => {
                    info!("listener session exited");
                    Ok(())
                }
                Err(e) => Err(e).context("listener session failed"),
            }
        }

        // Run the IPC server (accepts settings-UI connections)
        server_result = server.run() => {
            server_result.context("IPC server failed")
        }

        // Keep the IPC status snapshot in sync with session events
        _ = async {
            loop {
                match status_rx.recv().await {
                    Ok(event) => {
                        info!(%event, "session event");
                        server.apply_event(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "status event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            Ok(())
        }
    };

    info!("shutting down...");
    server.shutdown().await;
    info!("layswitchd stopped");

    result
}

#[cfg(not(target_os = "windows"))]
async fn run(_config: Config) -> Result<()> {
    anyhow::bail!("layswitchd requires the Windows low-level keyboard hook and layout APIs")
}
