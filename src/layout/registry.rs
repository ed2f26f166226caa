//! Layout registry access
//!
//! The operating system owns the set of installed input layouts; this module
//! only reads it and posts activation requests. Every window/thread can carry
//! its own active layout, so "current" always follows the focused window.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for an installed input layout
///
/// Wraps the raw HKL value. The enumeration order reported by the OS is the
/// rotation order; handles are only ever compared, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutHandle(isize);

impl LayoutHandle {
    pub const fn new(raw: isize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> isize {
        self.0
    }
}

impl fmt::Display for LayoutHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Errors from layout registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to post layout activation request: {0}")]
    ActivationFailed(String),
}

/// Trait abstracting the OS layout registry
///
/// The production implementation is [`WindowsLayoutRegistry`]; tests use
/// [`crate::layout::mock::MockLayoutRegistry`].
pub trait LayoutRegistry {
    /// Installed layouts in OS enumeration order; empty when the query fails
    fn enumerate(&self) -> Vec<LayoutHandle>;

    /// Layout active in the focused window
    ///
    /// The returned handle may be absent from [`enumerate`]'s result (stale
    /// focus, transient OS state); callers fall back rather than fail.
    ///
    /// [`enumerate`]: LayoutRegistry::enumerate
    fn current(&self) -> LayoutHandle;

    /// Post a layout-change request targeted at the focused window
    ///
    /// Fire-and-forget: `Ok` means the request was posted, not that the
    /// layout changed. The target window is free to ignore it and the
    /// platform offers no confirmation either way.
    fn activate(&self, next: LayoutHandle) -> Result<(), RegistryError>;
}

#[cfg(target_os = "windows")]
pub use windows_registry::WindowsLayoutRegistry;

#[cfg(target_os = "windows")]
mod windows_registry {
    use tracing::debug;
    use windows::Win32::Foundation::{LPARAM, WPARAM};
    use windows::Win32::UI::Input::KeyboardAndMouse::{GetKeyboardLayout, GetKeyboardLayoutList};
    use windows::Win32::UI::TextServices::HKL;
    use windows::Win32::UI::WindowsAndMessaging::{
        GetForegroundWindow, GetWindowThreadProcessId, PostMessageW, WM_INPUTLANGCHANGEREQUEST,
    };

    use super::{LayoutHandle, LayoutRegistry, RegistryError};

    /// Layout registry backed by the Win32 keyboard-layout APIs
    pub struct WindowsLayoutRegistry;

    impl WindowsLayoutRegistry {
        pub fn new() -> Self {
            Self
        }
    }

    impl Default for WindowsLayoutRegistry {
        fn default() -> Self {
            Self::new()
        }
    }

    impl LayoutRegistry for WindowsLayoutRegistry {
        fn enumerate(&self) -> Vec<LayoutHandle> {
            // SAFETY: the first call sizes the buffer, the second fills it.
            unsafe {
                let count = GetKeyboardLayoutList(None);
                if count <= 0 {
                    return Vec::new();
                }
                let mut handles = vec![HKL::default(); count as usize];
                let filled = GetKeyboardLayoutList(Some(&mut handles));
                handles.truncate(filled.max(0) as usize);
                handles
                    .into_iter()
                    .map(|hkl| LayoutHandle::new(hkl.0 as isize))
                    .collect()
            }
        }

        fn current(&self) -> LayoutHandle {
            // SAFETY: plain handle queries; a null foreground window yields
            // thread id 0, for which GetKeyboardLayout reports the current
            // thread's layout.
            unsafe {
                let hwnd = GetForegroundWindow();
                let thread_id = GetWindowThreadProcessId(hwnd, None);
                let hkl = GetKeyboardLayout(thread_id);
                LayoutHandle::new(hkl.0 as isize)
            }
        }

        fn activate(&self, next: LayoutHandle) -> Result<(), RegistryError> {
            // SAFETY: posts a message to the focused window's queue; the
            // request is asynchronous and unconfirmed.
            unsafe {
                let hwnd = GetForegroundWindow();
                debug!(target_hwnd = ?hwnd, layout = %next, "posting WM_INPUTLANGCHANGEREQUEST");
                PostMessageW(
                    Some(hwnd),
                    WM_INPUTLANGCHANGEREQUEST,
                    WPARAM(0),
                    LPARAM(next.raw()),
                )
                .map_err(|e| RegistryError::ActivationFailed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display_is_hex() {
        assert_eq!(LayoutHandle::new(0x4090409).to_string(), "0x4090409");
    }

    #[test]
    fn test_handle_serde_is_transparent() {
        let handle = LayoutHandle::new(0x4090409);
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, "67699721");
        let back: LayoutHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handle);
    }
}
