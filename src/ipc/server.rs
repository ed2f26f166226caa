//! Loopback TCP server for IPC
//!
//! Provides request-response communication for the settings UI and streams
//! switcher events to subscribed clients. Binding is loopback-only; the
//! daemon exposes nothing beyond the local machine.
//!
//! Trigger-pair updates are never applied here: they are forwarded into the
//! listener session's control channel so configuration changes ride the same
//! serialized stream as key events.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::SwitcherEvent;
use crate::hotkey::TriggerPair;
use crate::session::SessionControl;

use super::protocol::{DaemonStatus, Notification, Request, Response};

/// Upper bound on a single IPC frame
const MAX_FRAME_LEN: usize = 64 * 1024;

/// IPC server handling settings-UI connections
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<RwLock<ServerState>>,
    ctrl_tx: mpsc::Sender<SessionControl>,
    event_tx: broadcast::Sender<SwitcherEvent>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Shared server state
struct ServerState {
    status: DaemonStatus,
    start_time: Instant,
}

impl Server {
    /// Bind the IPC listener on a loopback address
    pub async fn bind(
        addr: SocketAddr,
        ctrl_tx: mpsc::Sender<SessionControl>,
        event_tx: broadcast::Sender<SwitcherEvent>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .context("failed to bind IPC listener")?;
        let local_addr = listener.local_addr().context("failed to read local addr")?;

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: DaemonStatus::default(),
            start_time: Instant::now(),
        }));

        info!(%local_addr, "IPC server listening");

        Ok(Self {
            listener,
            local_addr,
            state,
            ctrl_tx,
            event_tx,
            shutdown_tx,
        })
    }

    /// Address the server actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Seed the status snapshot once the session is wired up
    pub async fn seed_status(&self, pair: TriggerPair, layout_count: usize) {
        let mut state = self.state.write().await;
        state.status.trigger_pair = pair;
        state.status.layout_count = layout_count;
        state.status.hook_active = true;
    }

    /// Fold a session event into the status snapshot
    pub async fn apply_event(&self, event: &SwitcherEvent) {
        let mut state = self.state.write().await;
        match event {
            SwitcherEvent::LayoutSwitched { to, .. } => {
                state.status.current_layout = Some(*to);
            }
            SwitcherEvent::TriggerPairChanged { pair } => {
                state.status.trigger_pair = *pair;
            }
        }
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "client connected");
                    let state = Arc::clone(&self.state);
                    let ctrl_tx = self.ctrl_tx.clone();
                    let event_rx = self.event_tx.subscribe();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, ctrl_tx, event_rx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        mut stream: TcpStream,
        state: Arc<RwLock<ServerState>>,
        ctrl_tx: mpsc::Sender<SessionControl>,
        event_rx: broadcast::Receiver<SwitcherEvent>,
    ) -> Result<()> {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match stream.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_FRAME_LEN {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            // Read message body
            let mut msg_buf = vec![0u8; len];
            stream.read_exact(&mut msg_buf).await?;

            let request: Request =
                serde_json::from_slice(&msg_buf).context("failed to parse request")?;
            debug!(?request, "received request");

            let (response, subscribe) = Self::process_request(request, &state, &ctrl_tx).await;
            Self::send_message(&mut stream, &response).await?;

            if subscribe {
                debug!("client subscribed to notifications");
                return Self::stream_notifications(stream, event_rx).await;
            }
        }
    }

    /// Push switcher events to a subscribed client until it disconnects
    async fn stream_notifications(
        mut stream: TcpStream,
        mut event_rx: broadcast::Receiver<SwitcherEvent>,
    ) -> Result<()> {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    if Self::send_message(&mut stream, &Notification::Event { event })
                        .await
                        .is_err()
                    {
                        debug!("subscribed client disconnected");
                        return Ok(());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "notification receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Ok(());
                }
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<T: serde::Serialize>(stream: &mut TcpStream, msg: &T) -> Result<()> {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        stream.write_all(&msg_len).await?;
        stream.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return (response, should_subscribe)
    async fn process_request(
        request: Request,
        state: &Arc<RwLock<ServerState>>,
        ctrl_tx: &mpsc::Sender<SessionControl>,
    ) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let mut state = state.write().await;
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                (Response::Status(state.status.clone()), false)
            }

            Request::SetTriggerPair { pair } => {
                match ctrl_tx.send(SessionControl::SetTriggerPair(pair)).await {
                    Ok(()) => {
                        info!(%pair, "trigger-pair change forwarded to session");
                        (Response::PairChange { pair }, false)
                    }
                    Err(_) => (
                        Response::Error {
                            code: "session_unavailable".to_string(),
                            message: "listener session is not running".to_string(),
                        },
                        false,
                    ),
                }
            }

            Request::Subscribe => (Response::Subscribed, true),
        }
    }

    /// Gracefully shut down client handlers
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("IPC server shutdown complete");
    }
}
