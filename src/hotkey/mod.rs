//! Hotkey module: global key-event feed and chord detection
//!
//! The platform hook bridges raw key transitions into a channel; the chord
//! detector decides when the two configured trigger keys were pressed
//! together within the 50 ms window.

pub mod chord;
pub mod keys;
pub mod listener;
pub mod mock;

pub use chord::{ChordState, ChordTriggered, CHORD_WINDOW};
pub use keys::{TriggerKey, TriggerPair};
pub use listener::{HookError, KeyEvent, KeyEventSource, KeyTransition};

#[cfg(target_os = "windows")]
pub use listener::HookListener;
