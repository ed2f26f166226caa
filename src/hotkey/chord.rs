//! Chord detection over the serialized key-event stream
//!
//! Decides when the two configured trigger keys count as "pressed together":
//! a down-transition on one key fires the chord when the other key is
//! currently held, or went down within [`CHORD_WINDOW`] of this event.
//! Up-transitions only clear held state and never fire.
//!
//! Evaluation is pure over the event's own timestamp, so the detector is
//! deterministic under synthetic event sequences. Correctness depends on the
//! caller feeding events one at a time, in delivery order.

use std::time::{Duration, Instant};

use super::keys::TriggerPair;
use super::listener::{KeyEvent, KeyTransition};

/// Two down-transitions at most this far apart count as simultaneous
pub const CHORD_WINDOW: Duration = Duration::from_millis(50);

/// Held flag and most recent down-transition time for one trigger key
#[derive(Debug, Clone, Copy, Default)]
struct KeyState {
    held: bool,
    last_down: Option<Instant>,
}

impl KeyState {
    fn press(&mut self, at: Instant) {
        self.held = true;
        self.last_down = Some(at);
    }

    fn release(&mut self) {
        self.held = false;
    }

    /// Held right now, or pressed within the window ending at `now`
    fn active_at(&self, now: Instant) -> bool {
        self.held
            || self
                .last_down
                .is_some_and(|down| now.saturating_duration_since(down) <= CHORD_WINDOW)
    }
}

/// Chord detector state: one [`KeyState`] per configured trigger key
///
/// Owned by the listener session and replaced with `Default` whenever the
/// trigger pair changes, since held flags recorded for the old keys mean
/// nothing under the new ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChordState {
    first: KeyState,
    second: KeyState,
}

/// Marker returned when a chord press was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordTriggered;

/// Feed one key event through the detector
///
/// Events for keys outside the configured pair leave the state untouched.
/// While both keys stay held, OS key-repeat delivers further down-transitions
/// and each one fires again; callers that want a single switch per physical
/// press must debounce downstream.
pub fn evaluate(
    state: &mut ChordState,
    pair: TriggerPair,
    event: &KeyEvent,
) -> Option<ChordTriggered> {
    let is_first = pair.first().matches(event.vk_code);
    let is_second = pair.second().matches(event.vk_code);
    if !is_first && !is_second {
        return None;
    }

    match event.transition {
        KeyTransition::Down => {
            let (pressed, other) = if is_first {
                (&mut state.first, &state.second)
            } else {
                (&mut state.second, &state.first)
            };
            let other = *other;
            pressed.press(event.at);
            other.active_at(event.at).then_some(ChordTriggered)
        }
        KeyTransition::Up => {
            if is_first {
                state.first.release();
            } else {
                state.second.release();
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::keys::vk;

    fn down(vk_code: u32, base: Instant, ms: u64) -> KeyEvent {
        KeyEvent {
            vk_code,
            transition: KeyTransition::Down,
            at: base + Duration::from_millis(ms),
        }
    }

    fn up(vk_code: u32, base: Instant, ms: u64) -> KeyEvent {
        KeyEvent {
            vk_code,
            transition: KeyTransition::Up,
            at: base + Duration::from_millis(ms),
        }
    }

    fn feed(state: &mut ChordState, pair: TriggerPair, events: &[KeyEvent]) -> usize {
        events
            .iter()
            .filter(|ev| evaluate(state, pair, ev).is_some())
            .count()
    }

    #[test]
    fn test_both_down_within_window_triggers() {
        let base = Instant::now();
        let mut state = ChordState::default();
        let events = [down(vk::LMENU, base, 0), down(vk::LSHIFT, base, 30)];
        assert_eq!(feed(&mut state, TriggerPair::AltShift, &events), 1);
    }

    #[test]
    fn test_release_before_second_down_does_not_trigger() {
        let base = Instant::now();
        let mut state = ChordState::default();
        let events = [
            down(vk::LMENU, base, 0),
            up(vk::LMENU, base, 10),
            down(vk::LSHIFT, base, 80),
        ];
        assert_eq!(feed(&mut state, TriggerPair::AltShift, &events), 0);
    }

    #[test]
    fn test_second_down_while_first_held_triggers_beyond_window() {
        let base = Instant::now();
        let mut state = ChordState::default();
        // First key still held, so the window does not matter
        let events = [down(vk::LMENU, base, 0), down(vk::LSHIFT, base, 500)];
        assert_eq!(feed(&mut state, TriggerPair::AltShift, &events), 1);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let base = Instant::now();
        let mut state = ChordState::default();
        let events = [
            down(vk::LSHIFT, base, 0),
            up(vk::LSHIFT, base, 5),
            down(vk::LMENU, base, 50),
        ];
        assert_eq!(feed(&mut state, TriggerPair::AltShift, &events), 1);

        let mut state = ChordState::default();
        let events = [
            down(vk::LSHIFT, base, 0),
            up(vk::LSHIFT, base, 5),
            down(vk::LMENU, base, 51),
        ];
        assert_eq!(feed(&mut state, TriggerPair::AltShift, &events), 0);
    }

    #[test]
    fn test_order_is_symmetric() {
        let base = Instant::now();
        let mut state = ChordState::default();
        let events = [down(vk::RSHIFT, base, 0), down(vk::LMENU, base, 20)];
        assert_eq!(feed(&mut state, TriggerPair::AltShift, &events), 1);
    }

    #[test]
    fn test_up_transition_never_triggers() {
        let base = Instant::now();
        let mut state = ChordState::default();
        let events = [
            down(vk::LMENU, base, 0),
            down(vk::LSHIFT, base, 10),
            up(vk::LSHIFT, base, 20),
            up(vk::LMENU, base, 25),
        ];
        // Only the second down fires; the two ups do not
        assert_eq!(feed(&mut state, TriggerPair::AltShift, &events), 1);
    }

    #[test]
    fn test_key_repeat_refires_while_both_held() {
        let base = Instant::now();
        let mut state = ChordState::default();
        let events = [
            down(vk::LMENU, base, 0),
            down(vk::LSHIFT, base, 10),
            // OS auto-repeat while both keys stay down
            down(vk::LSHIFT, base, 510),
            down(vk::LSHIFT, base, 1010),
        ];
        assert_eq!(feed(&mut state, TriggerPair::AltShift, &events), 3);
    }

    #[test]
    fn test_non_trigger_keys_are_ignored() {
        let base = Instant::now();
        let mut state = ChordState::default();
        let events = [
            down(vk::LMENU, base, 0),
            down(0x41, base, 5), // 'A'
            up(0x41, base, 8),
            down(vk::LSHIFT, base, 10),
        ];
        assert_eq!(feed(&mut state, TriggerPair::AltShift, &events), 1);
    }

    #[test]
    fn test_pair_selects_which_keys_count() {
        let base = Instant::now();
        let mut state = ChordState::default();
        // LeftAlt is not part of Ctrl+Shift
        let events = [down(vk::LMENU, base, 0), down(vk::LSHIFT, base, 10)];
        assert_eq!(feed(&mut state, TriggerPair::CtrlShift, &events), 0);

        let mut state = ChordState::default();
        let events = [down(vk::RCONTROL, base, 0), down(vk::SHIFT, base, 10)];
        assert_eq!(feed(&mut state, TriggerPair::CtrlShift, &events), 1);
    }

    #[test]
    fn test_generic_and_sided_codes_mix() {
        let base = Instant::now();
        let mut state = ChordState::default();
        // Generic VK_SHIFT down, sided VK_RSHIFT up still clears the hold
        let events = [
            down(vk::SHIFT, base, 0),
            up(vk::RSHIFT, base, 10),
            down(vk::LMENU, base, 100),
        ];
        assert_eq!(feed(&mut state, TriggerPair::AltShift, &events), 0);
    }
}
