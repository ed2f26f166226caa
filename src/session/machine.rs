//! Listener session implementation
//!
//! Owns the key-event subscription, the configured trigger pair, and the
//! chord state. Key events, configuration updates, and shutdown are
//! multiplexed through one `select!` loop, so at most one input is handled
//! at a time and the chord logic always sees down/up transitions in
//! delivery order.

use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use crate::events::SwitcherEvent;
use crate::hotkey::chord::{self, ChordState};
use crate::hotkey::{HookError, KeyEvent, KeyEventSource, TriggerPair};
use crate::layout::{LayoutRegistry, LayoutRotator};

/// Capacity of the hook-thread-to-session key-event queue
const KEY_EVENT_QUEUE: usize = 256;

/// Lifecycle phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not yet subscribed to the key-event feed
    Idle,
    /// Subscribed and evaluating events
    Active,
    /// Unsubscribed; terminal
    Terminated,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Active => write!(f, "Active"),
            Phase::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Control messages merged into the session's serialized stream
///
/// Configuration updates ride the same stream as key events rather than a
/// lock, so an update can never land mid-evaluation.
#[derive(Debug, Clone, Copy)]
pub enum SessionControl {
    /// Replace the trigger pair and reset chord state
    SetTriggerPair(TriggerPair),
    /// Cooperative shutdown; in-flight event processing completes first
    Shutdown,
}

/// Errors terminating a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Rotation is meaningless with zero or one layouts; checked before
    /// the key-event feed is opened
    #[error("fewer than two keyboard layouts installed (found {found})")]
    TooFewLayouts { found: usize },

    #[error(transparent)]
    Hook(#[from] HookError),

    /// The platform feed closed while active; not retried
    #[error("key-event feed closed while active")]
    FeedClosed,
}

/// The listener session: single owner of `TriggerPair` and `ChordState`
pub struct ListenerSession<R> {
    phase: Phase,
    pair: TriggerPair,
    chord: ChordState,
    rotator: LayoutRotator<R>,
    event_tx: broadcast::Sender<SwitcherEvent>,
}

impl<R: LayoutRegistry> ListenerSession<R> {
    pub fn new(registry: R, pair: TriggerPair, event_tx: broadcast::Sender<SwitcherEvent>) -> Self {
        Self {
            phase: Phase::Idle,
            pair,
            chord: ChordState::default(),
            rotator: LayoutRotator::new(registry),
            event_tx,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn trigger_pair(&self) -> TriggerPair {
        self.pair
    }

    /// Run the session until shutdown or a terminal error
    ///
    /// Refuses to subscribe when fewer than two layouts are installed, then
    /// opens the key-event feed and enters the serialized processing loop.
    pub async fn run<S: KeyEventSource>(
        &mut self,
        source: &S,
        ctrl_rx: &mut mpsc::Receiver<SessionControl>,
    ) -> Result<(), SessionError> {
        let found = self.rotator.registry().enumerate().len();
        if found < 2 {
            self.phase = Phase::Terminated;
            return Err(SessionError::TooFewLayouts { found });
        }

        let (key_tx, mut key_rx) = mpsc::channel(KEY_EVENT_QUEUE);
        if let Err(e) = source.start(key_tx) {
            self.phase = Phase::Terminated;
            return Err(e.into());
        }
        self.phase = Phase::Active;
        info!(pair = %self.pair, layouts = found, "listener session active");

        let result = loop {
            tokio::select! {
                key = key_rx.recv() => match key {
                    Some(event) => self.handle_key_event(&event),
                    None => {
                        warn!("key-event feed closed while active");
                        break Err(SessionError::FeedClosed);
                    }
                },
                ctrl = ctrl_rx.recv() => match ctrl {
                    Some(SessionControl::SetTriggerPair(pair)) => self.apply_trigger_pair(pair),
                    Some(SessionControl::Shutdown) | None => break Ok(()),
                },
            }
        };

        self.phase = Phase::Terminated;
        source.stop();
        info!("listener session terminated");
        result
    }

    fn handle_key_event(&mut self, event: &KeyEvent) {
        if chord::evaluate(&mut self.chord, self.pair, event).is_none() {
            return;
        }
        match self.rotator.switch() {
            Ok(switched) => {
                info!(
                    from = %switched.from,
                    to = %switched.to,
                    "chord triggered, layout switch requested"
                );
                let _ = self.event_tx.send(SwitcherEvent::LayoutSwitched {
                    from: switched.from,
                    to: switched.to,
                });
            }
            Err(e) => {
                // The session stays active; the next chord tries again.
                error!(?e, "layout switch failed");
            }
        }
    }

    /// Replace the trigger pair; held flags recorded for the old keys are
    /// meaningless under the new ones, so chord state starts over
    fn apply_trigger_pair(&mut self, pair: TriggerPair) {
        info!(old = %self.pair, new = %pair, "trigger pair updated");
        self.pair = pair;
        self.chord = ChordState::default();
        let _ = self.event_tx.send(SwitcherEvent::TriggerPairChanged { pair });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::hotkey::keys::vk;
    use crate::hotkey::mock::MockKeySource;
    use crate::layout::mock::MockLayoutRegistry;
    use crate::layout::LayoutHandle;

    fn session(
        registry: MockLayoutRegistry,
        pair: TriggerPair,
    ) -> (
        ListenerSession<MockLayoutRegistry>,
        broadcast::Receiver<SwitcherEvent>,
    ) {
        let (event_tx, event_rx) = broadcast::channel(16);
        (ListenerSession::new(registry, pair, event_tx), event_rx)
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within 1s");
    }

    #[tokio::test]
    async fn test_refuses_to_start_with_one_layout() {
        let registry = MockLayoutRegistry::new(&[1]);
        let (mut session, _event_rx) = session(registry, TriggerPair::AltShift);
        let source = MockKeySource::new();
        let (_ctrl_tx, mut ctrl_rx) = mpsc::channel(4);

        let result = session.run(&source, &mut ctrl_rx).await;
        assert!(matches!(
            result,
            Err(SessionError::TooFewLayouts { found: 1 })
        ));
        // Fail-fast: the key-event feed was never opened
        assert!(!source.was_started());
        assert_eq!(session.phase(), Phase::Terminated);
    }

    #[tokio::test]
    async fn test_hook_install_failure_is_fatal() {
        let registry = MockLayoutRegistry::new(&[1, 2]);
        let (mut session, _event_rx) = session(registry, TriggerPair::AltShift);
        let source = MockKeySource::failing();
        let (_ctrl_tx, mut ctrl_rx) = mpsc::channel(4);

        let result = session.run(&source, &mut ctrl_rx).await;
        assert!(matches!(result, Err(SessionError::Hook(_))));
        assert_eq!(session.phase(), Phase::Terminated);
    }

    #[tokio::test]
    async fn test_chord_rotates_layout() {
        let registry = MockLayoutRegistry::new(&[10, 20, 30]);
        let (mut session, _event_rx) = session(registry.clone(), TriggerPair::AltShift);
        let source = MockKeySource::new();
        let keys = source.clone();
        let (ctrl_tx, mut ctrl_rx) = mpsc::channel(4);

        let handle = tokio::spawn(async move {
            let result = session.run(&source, &mut ctrl_rx).await;
            (result, session)
        });
        wait_until(|| keys.was_started()).await;

        keys.press(vk::LMENU);
        keys.press(vk::LSHIFT);
        wait_until(|| registry.activations().len() == 1).await;
        assert_eq!(registry.activations(), vec![LayoutHandle::new(20)]);

        ctrl_tx.send(SessionControl::Shutdown).await.unwrap();
        let (result, session) = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(session.phase(), Phase::Terminated);
    }

    #[tokio::test]
    async fn test_trigger_pair_change_resets_chord_state() {
        let registry = MockLayoutRegistry::new(&[1, 2]);
        let (mut session, mut event_rx) = session(registry.clone(), TriggerPair::AltShift);
        let source = MockKeySource::new();
        let keys = source.clone();
        let (ctrl_tx, mut ctrl_rx) = mpsc::channel(4);

        let handle = tokio::spawn(async move {
            let result = session.run(&source, &mut ctrl_rx).await;
            (result, session)
        });
        wait_until(|| keys.was_started()).await;

        // Chord under the initial pair; Shift stays physically down
        keys.press(vk::LSHIFT);
        keys.press(vk::LMENU);
        wait_until(|| registry.activations().len() == 1).await;

        ctrl_tx
            .send(SessionControl::SetTriggerPair(TriggerPair::CtrlShift))
            .await
            .unwrap();
        loop {
            if let SwitcherEvent::TriggerPairChanged { pair } = event_rx.recv().await.unwrap() {
                assert_eq!(pair, TriggerPair::CtrlShift);
                break;
            }
        }

        // Ctrl down alone must not fire: the stale Shift hold was cleared
        keys.press(vk::LCONTROL);
        // A fresh Shift down completes the new chord (Ctrl is held)
        keys.press(vk::LSHIFT);
        wait_until(|| registry.activations().len() == 2).await;

        // LeftAlt no longer participates
        keys.press(vk::LMENU);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(registry.activations().len(), 2);

        ctrl_tx.send(SessionControl::Shutdown).await.unwrap();
        let (result, _session) = handle.await.unwrap();
        assert!(result.is_ok());
        // Without the reset, the lone Ctrl down would have fired a third switch
        assert_eq!(registry.activations().len(), 2);
    }

    #[tokio::test]
    async fn test_activation_failure_keeps_session_alive() {
        let registry = MockLayoutRegistry::new(&[1, 2]);
        registry.fail_activation();
        let (mut session, mut event_rx) = session(registry.clone(), TriggerPair::AltShift);
        let source = MockKeySource::new();
        let keys = source.clone();
        let (ctrl_tx, mut ctrl_rx) = mpsc::channel(4);

        let handle = tokio::spawn(async move {
            let result = session.run(&source, &mut ctrl_rx).await;
            (result, session)
        });
        wait_until(|| keys.was_started()).await;

        keys.press(vk::LMENU);
        keys.press(vk::LSHIFT);

        // The failed switch is logged, not fatal: the loop still answers
        ctrl_tx
            .send(SessionControl::SetTriggerPair(TriggerPair::CtrlShift))
            .await
            .unwrap();
        loop {
            if let SwitcherEvent::TriggerPairChanged { .. } = event_rx.recv().await.unwrap() {
                break;
            }
        }
        assert!(registry.activations().is_empty());

        ctrl_tx.send(SessionControl::Shutdown).await.unwrap();
        let (result, _session) = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_feed_loss_is_terminal() {
        let registry = MockLayoutRegistry::new(&[1, 2]);
        let (mut session, _event_rx) = session(registry.clone(), TriggerPair::AltShift);
        let source = MockKeySource::new();
        let keys = source.clone();
        let (_ctrl_tx, mut ctrl_rx) = mpsc::channel(4);

        let handle = tokio::spawn(async move {
            let result = session.run(&source, &mut ctrl_rx).await;
            (result, session)
        });
        wait_until(|| keys.was_started()).await;

        keys.sever();
        let (result, session) = handle.await.unwrap();
        assert!(matches!(result, Err(SessionError::FeedClosed)));
        assert_eq!(session.phase(), Phase::Terminated);
    }

    #[tokio::test]
    async fn test_dropped_control_channel_shuts_down() {
        let registry = MockLayoutRegistry::new(&[1, 2]);
        let (mut session, _event_rx) = session(registry, TriggerPair::AltShift);
        let source = MockKeySource::new();
        let keys = source.clone();
        let (ctrl_tx, mut ctrl_rx) = mpsc::channel::<SessionControl>(4);

        let handle = tokio::spawn(async move {
            let result = session.run(&source, &mut ctrl_rx).await;
            (result, session)
        });
        wait_until(|| keys.was_started()).await;

        drop(ctrl_tx);
        let (result, session) = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(session.phase(), Phase::Terminated);
    }
}
