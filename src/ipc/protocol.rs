//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian
//! length. A connection serves request/response traffic until the client
//! sends `Subscribe`; from then on the daemon streams notifications and
//! reads no further requests on that connection.

use serde::{Deserialize, Serialize};

use crate::events::SwitcherEvent;
use crate::hotkey::TriggerPair;
use crate::layout::LayoutHandle;

/// Requests from the settings UI to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current daemon status
    GetStatus,

    /// Replace the trigger-key pair
    ///
    /// Routed into the listener session's control stream; the change takes
    /// effect between key events, never during an evaluation.
    SetTriggerPair { pair: TriggerPair },

    /// Ping to check connectivity
    Ping,

    /// Switch this connection to notification streaming
    Subscribe,
}

/// Responses from daemon to UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Trigger-pair change accepted and forwarded to the session
    PairChange { pair: TriggerPair },

    /// Pong response to ping
    Pong,

    /// Subscription confirmed; notifications follow
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Push notification for subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A session event occurred
    Event { event: SwitcherEvent },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Trigger-key pair currently evaluated
    pub trigger_pair: TriggerPair,

    /// Whether the keyboard hook is installed
    pub hook_active: bool,

    /// Number of layouts enumerated at startup
    pub layout_count: usize,

    /// Layout most recently requested by a switch, if any
    ///
    /// Best effort: the platform never confirms that the focused window
    /// honored the request.
    pub current_layout: Option<LayoutHandle>,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            trigger_pair: TriggerPair::default(),
            hook_active: false,
            layout_count: 0,
            current_layout: None,
            uptime_secs: 0,
        }
    }
}
