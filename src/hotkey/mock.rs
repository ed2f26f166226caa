//! Mock key-event source for unit testing
//!
//! Lets tests inject synthetic [`KeyEvent`]s without installing an OS hook,
//! and records whether the subscription was ever opened so fail-fast paths
//! can assert it was not.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc;

use super::listener::{HookError, KeyEvent, KeyEventSource, KeyTransition};

/// A [`KeyEventSource`] driven by the test instead of the OS
#[derive(Clone)]
pub struct MockKeySource {
    sender: Arc<Mutex<Option<mpsc::Sender<KeyEvent>>>>,
    started: Arc<AtomicBool>,
    fail_start: bool,
}

impl MockKeySource {
    pub fn new() -> Self {
        Self {
            sender: Arc::new(Mutex::new(None)),
            started: Arc::new(AtomicBool::new(false)),
            fail_start: false,
        }
    }

    /// A source whose `start` fails, as if the hook could not be installed
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::new()
        }
    }

    /// Whether `start` was ever called
    pub fn was_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Inject a synthetic event, as if captured by the platform hook
    ///
    /// Panics if the source was not started or was stopped.
    pub fn inject(&self, event: KeyEvent) {
        let guard = self.sender.lock().expect("lock poisoned");
        let sender = guard
            .as_ref()
            .expect("MockKeySource::inject called before start()");
        sender.try_send(event).expect("key-event channel closed or full");
    }

    /// Inject a down-transition for `vk_code`, stamped now
    pub fn press(&self, vk_code: u32) {
        self.inject(KeyEvent {
            vk_code,
            transition: KeyTransition::Down,
            at: Instant::now(),
        });
    }

    /// Inject an up-transition for `vk_code`, stamped now
    pub fn release(&self, vk_code: u32) {
        self.inject(KeyEvent {
            vk_code,
            transition: KeyTransition::Up,
            at: Instant::now(),
        });
    }

    /// Drop the sender, simulating loss of the platform feed
    pub fn sever(&self) {
        *self.sender.lock().expect("lock poisoned") = None;
    }
}

impl Default for MockKeySource {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyEventSource for MockKeySource {
    fn start(&self, event_tx: mpsc::Sender<KeyEvent>) -> Result<(), HookError> {
        if self.fail_start {
            return Err(HookError::Install("mock install failure".to_string()));
        }
        self.started.store(true, Ordering::SeqCst);
        *self.sender.lock().expect("lock poisoned") = Some(event_tx);
        Ok(())
    }

    fn stop(&self) {
        self.sever();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::keys::vk;

    #[test]
    fn test_mock_source_delivers_injected_events() {
        let source = MockKeySource::new();
        let (tx, mut rx) = mpsc::channel(8);
        source.start(tx).expect("start should succeed");
        assert!(source.was_started());

        source.press(vk::LMENU);
        let event = rx.try_recv().expect("should receive event");
        assert_eq!(event.vk_code, vk::LMENU);
        assert_eq!(event.transition, KeyTransition::Down);
    }

    #[test]
    fn test_mock_source_sever_closes_channel() {
        let source = MockKeySource::new();
        let (tx, mut rx) = mpsc::channel(8);
        source.start(tx).expect("start should succeed");

        source.sever();
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_failing_mock_source_does_not_start() {
        let source = MockKeySource::failing();
        let (tx, _rx) = mpsc::channel(8);
        assert!(source.start(tx).is_err());
        assert!(!source.was_started());
    }
}
