//! Configuration loading and management

use std::net::SocketAddr;

use anyhow::{Context, Result};

use crate::hotkey::TriggerPair;

/// Default port for the settings-UI IPC server
pub const DEFAULT_IPC_PORT: u16 = 46611;

/// Daemon configuration
///
/// The trigger pair set here is the startup value; at runtime it is owned
/// and mutated solely by the listener session.
#[derive(Debug, Clone)]
pub struct Config {
    /// Trigger-key pair evaluated by the chord detector
    pub trigger_pair: TriggerPair,

    /// Loopback address for the settings-UI IPC server
    pub ipc_addr: SocketAddr,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let trigger_pair = match std::env::var("LAYSWITCH_TRIGGER_PAIR") {
            Ok(raw) => raw.parse().context("invalid LAYSWITCH_TRIGGER_PAIR")?,
            Err(_) => TriggerPair::default(),
        };

        let port = match std::env::var("LAYSWITCH_IPC_PORT") {
            Ok(raw) => raw.parse::<u16>().context("invalid LAYSWITCH_IPC_PORT")?,
            Err(_) => DEFAULT_IPC_PORT,
        };

        Ok(Self {
            trigger_pair,
            ipc_addr: SocketAddr::from(([127, 0, 0, 1], port)),
        })
    }
}
