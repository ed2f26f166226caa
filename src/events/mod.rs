//! Events broadcast by the listener session
//!
//! Consumed by the IPC layer to keep its status snapshot current and to
//! notify subscribed clients.

use serde::{Deserialize, Serialize};

use crate::hotkey::TriggerPair;
use crate::layout::LayoutHandle;

/// Events emitted by the listener session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SwitcherEvent {
    /// A chord fired and a layout activation was requested
    ///
    /// `to` is the requested layout; the platform gives no confirmation
    /// that the focused window honored the request.
    LayoutSwitched {
        from: LayoutHandle,
        to: LayoutHandle,
    },

    /// The trigger-key pair was replaced at runtime
    TriggerPairChanged { pair: TriggerPair },
}

impl std::fmt::Display for SwitcherEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwitcherEvent::LayoutSwitched { from, to } => {
                write!(f, "LAYOUT_SWITCHED ({from} -> {to})")
            }
            SwitcherEvent::TriggerPairChanged { pair } => {
                write!(f, "TRIGGER_PAIR_CHANGED ({pair})")
            }
        }
    }
}
