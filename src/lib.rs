//! layswitch library entry point
//!
//! Re-exports the daemon's modules so the binary in `main.rs` and the unit
//! tests share one module tree.

pub mod config;
pub mod events;
pub mod hotkey;
pub mod ipc;
pub mod layout;
pub mod lifecycle;
pub mod session;
