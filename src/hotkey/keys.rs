//! Trigger key definitions and virtual-key matching
//!
//! Provides the logical key vocabulary for the chord, the mapping from
//! logical keys to their physical virtual-key code aliases, and the
//! supported trigger-key pairs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Windows virtual-key codes for the modifier keys we match against
pub mod vk {
    /// Generic Shift (VK_SHIFT)
    pub const SHIFT: u32 = 0x10;
    /// Generic Control (VK_CONTROL)
    pub const CONTROL: u32 = 0x11;
    /// Left Shift (VK_LSHIFT)
    pub const LSHIFT: u32 = 0xA0;
    /// Right Shift (VK_RSHIFT)
    pub const RSHIFT: u32 = 0xA1;
    /// Left Control (VK_LCONTROL)
    pub const LCONTROL: u32 = 0xA2;
    /// Right Control (VK_RCONTROL)
    pub const RCONTROL: u32 = 0xA3;
    /// Left Alt (VK_LMENU)
    pub const LMENU: u32 = 0xA4;
}

/// A logical key that can participate in the chord
///
/// One logical key matches several physical virtual-key codes: the low-level
/// hook reports side-specific codes, while synthesized input can carry the
/// generic ones. `LeftAlt` matches only the left-side code, since the right
/// Alt key doubles as AltGr on many layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKey {
    LeftAlt,
    Shift,
    Ctrl,
}

impl TriggerKey {
    /// Check whether a physical virtual-key code is an alias of this key
    pub fn matches(self, vk_code: u32) -> bool {
        match self {
            TriggerKey::LeftAlt => vk_code == vk::LMENU,
            TriggerKey::Shift => {
                matches!(vk_code, vk::SHIFT | vk::LSHIFT | vk::RSHIFT)
            }
            TriggerKey::Ctrl => {
                matches!(vk_code, vk::CONTROL | vk::LCONTROL | vk::RCONTROL)
            }
        }
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKey::LeftAlt => write!(f, "LeftAlt"),
            TriggerKey::Shift => write!(f, "Shift"),
            TriggerKey::Ctrl => write!(f, "Ctrl"),
        }
    }
}

/// The two-key combinations selectable as the chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPair {
    /// LeftAlt + Shift
    AltShift,
    /// Ctrl + Shift
    CtrlShift,
}

impl TriggerPair {
    /// First key of the pair
    pub fn first(self) -> TriggerKey {
        match self {
            TriggerPair::AltShift => TriggerKey::LeftAlt,
            TriggerPair::CtrlShift => TriggerKey::Ctrl,
        }
    }

    /// Second key of the pair
    pub fn second(self) -> TriggerKey {
        match self {
            TriggerPair::AltShift | TriggerPair::CtrlShift => TriggerKey::Shift,
        }
    }
}

impl Default for TriggerPair {
    fn default() -> Self {
        Self::AltShift
    }
}

impl fmt::Display for TriggerPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.first(), self.second())
    }
}

impl FromStr for TriggerPair {
    type Err = UnknownTriggerPair;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alt_shift" => Ok(TriggerPair::AltShift),
            "ctrl_shift" => Ok(TriggerPair::CtrlShift),
            other => Err(UnknownTriggerPair(other.to_string())),
        }
    }
}

/// Error for an unrecognized trigger-pair name
#[derive(Debug, thiserror::Error)]
#[error("unknown trigger pair {0:?}, expected \"alt_shift\" or \"ctrl_shift\"")]
pub struct UnknownTriggerPair(pub String);
