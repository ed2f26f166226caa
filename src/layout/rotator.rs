//! Layout rotation
//!
//! Picks the next layout in the OS enumeration order, wrapping after the
//! last, and issues one activation request per chord trigger. The layout
//! list is re-fetched on every switch since the OS is the source of truth
//! and layouts can be added or removed between switches.

use tracing::debug;

use super::registry::{LayoutHandle, LayoutRegistry, RegistryError};

/// Next layout after `current` in `available`, wrapping to the first
///
/// When `current` is not in `available` (stale focus, transient OS state),
/// falls back to the first entry. `available` must be non-empty.
pub fn next_layout(current: LayoutHandle, available: &[LayoutHandle]) -> LayoutHandle {
    debug_assert!(!available.is_empty());
    available
        .iter()
        .position(|&handle| handle == current)
        .map(|i| available[(i + 1) % available.len()])
        .unwrap_or(available[0])
}

/// Outcome of one switch: which layout was active and which was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSwitch {
    pub from: LayoutHandle,
    pub to: LayoutHandle,
}

/// Errors from a switch operation
#[derive(Debug, thiserror::Error)]
pub enum RotateError {
    /// The OS reported no layouts at switch time
    #[error("no keyboard layouts enumerated")]
    NoLayouts,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Drives one rotation step against a [`LayoutRegistry`]
pub struct LayoutRotator<R> {
    registry: R,
}

impl<R: LayoutRegistry> LayoutRotator<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Re-fetch the layout list, compute the next layout, request activation
    ///
    /// The activation request is fire-and-forget; a returned [`LayoutSwitch`]
    /// records what was requested, not a confirmed change.
    pub fn switch(&self) -> Result<LayoutSwitch, RotateError> {
        let available = self.registry.enumerate();
        if available.is_empty() {
            return Err(RotateError::NoLayouts);
        }

        let current = self.registry.current();
        let next = next_layout(current, &available);
        debug!(%current, %next, count = available.len(), "rotating layout");

        self.registry.activate(next)?;
        Ok(LayoutSwitch {
            from: current,
            to: next,
        })
    }
}
