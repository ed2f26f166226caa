//! Listener session module
//!
//! The session is the single point that owns and mutates the trigger-pair
//! configuration and the chord state. It subscribes to the platform key
//! feed, merges key events, configuration updates, and shutdown into one
//! serialized stream, and drives the layout rotator on each chord.
//!
//! Lifecycle: Idle (not subscribed) -> Active (subscribed, evaluating)
//! -> Terminated (unsubscribed, terminal).

mod machine;

pub use machine::{ListenerSession, Phase, SessionControl, SessionError};
