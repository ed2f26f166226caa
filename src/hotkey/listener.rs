//! Platform key-event feed
//!
//! Defines the key-transition events consumed by the chord detector and the
//! [`KeyEventSource`] trait that abstracts the global keyboard subscription.
//! The production implementation installs a Windows `WH_KEYBOARD_LL` hook on
//! a dedicated thread running a Win32 message loop; the hook callback bridges
//! each transition into a channel instead of touching any shared state, so
//! the session loop stays the single point of evaluation.

use std::time::Instant;

use tokio::sync::mpsc;

/// One observed key transition at the platform boundary
#[derive(Debug, Clone, Copy)]
pub struct KeyEvent {
    /// Physical virtual-key code as reported by the hook
    pub vk_code: u32,
    /// Press or release
    pub transition: KeyTransition,
    /// Monotonic capture time, recorded on the hook thread
    pub at: Instant,
}

/// Direction of a key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransition {
    Down,
    Up,
}

/// Errors opening or running the key-event subscription
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("key-event source is already running")]
    AlreadyRunning,

    #[error("failed to install keyboard hook: {0}")]
    Install(String),

    #[error("failed to spawn hook thread: {0}")]
    ThreadSpawn(String),
}

/// Trait abstracting the global key-event subscription
///
/// The production implementation is [`HookListener`] (Windows); tests inject
/// synthetic events through [`crate::hotkey::mock::MockKeySource`]. `start`
/// surfaces subscription failure synchronously — the caller treats it as
/// fatal and never retries.
pub trait KeyEventSource {
    /// Open the subscription and deliver events into `event_tx`
    fn start(&self, event_tx: mpsc::Sender<KeyEvent>) -> Result<(), HookError>;

    /// Close the subscription and release platform resources
    fn stop(&self);
}

#[cfg(target_os = "windows")]
pub use windows_hook::HookListener;

#[cfg(target_os = "windows")]
mod windows_hook {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::{Arc, OnceLock};
    use std::thread;
    use std::time::Instant;

    use tokio::sync::mpsc;
    use tracing::{info, warn};
    use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetMessageW, PostThreadMessageW, SetWindowsHookExW,
        UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, MSG, WH_KEYBOARD_LL, WM_KEYDOWN,
        WM_KEYUP, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
    };

    use super::{HookError, KeyEvent, KeyEventSource, KeyTransition};

    /// Global sender used by the hook callback to deliver events.
    /// Set once by [`HookListener::start`]; only one hook may run per process.
    static EVENT_SENDER: OnceLock<mpsc::Sender<KeyEvent>> = OnceLock::new();

    /// Global low-level keyboard hook
    ///
    /// `WH_KEYBOARD_LL` callbacks are delivered to the thread that installed
    /// the hook, so installation and the message loop share one dedicated
    /// thread. The callback must return quickly or Windows silently removes
    /// the hook; all work beyond capture is deferred through the channel.
    pub struct HookListener {
        running: Arc<AtomicBool>,
        hook_thread_id: Arc<AtomicU32>,
    }

    impl HookListener {
        pub fn new() -> Self {
            Self {
                running: Arc::new(AtomicBool::new(false)),
                hook_thread_id: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    impl Default for HookListener {
        fn default() -> Self {
            Self::new()
        }
    }

    impl KeyEventSource for HookListener {
        fn start(&self, event_tx: mpsc::Sender<KeyEvent>) -> Result<(), HookError> {
            if self.running.swap(true, Ordering::SeqCst) {
                return Err(HookError::AlreadyRunning);
            }

            EVENT_SENDER.set(event_tx).map_err(|_| {
                HookError::Install("only one keyboard hook may run per process".to_string())
            })?;

            // The hook thread reports install success or failure back here so
            // a permission problem surfaces as a startup error.
            let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), HookError>>();

            let running = Arc::clone(&self.running);
            let hook_thread_id = Arc::clone(&self.hook_thread_id);

            thread::Builder::new()
                .name("keyboard-hook".to_string())
                .spawn(move || run_hook_message_loop(ready_tx, running, hook_thread_id))
                .map_err(|e| HookError::ThreadSpawn(e.to_string()))?;

            match ready_rx.recv() {
                Ok(Ok(())) => {
                    info!("keyboard hook installed");
                    Ok(())
                }
                Ok(Err(e)) => {
                    self.running.store(false, Ordering::SeqCst);
                    Err(e)
                }
                Err(_) => {
                    self.running.store(false, Ordering::SeqCst);
                    Err(HookError::Install(
                        "hook thread exited before reporting".to_string(),
                    ))
                }
            }
        }

        fn stop(&self) {
            if !self.running.swap(false, Ordering::SeqCst) {
                return;
            }
            let thread_id = self.hook_thread_id.load(Ordering::SeqCst);
            if thread_id != 0 {
                // SAFETY: posts WM_QUIT to our own hook thread, ending its
                // message loop so the hook is unhooked.
                unsafe {
                    PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)).ok();
                }
            }
        }
    }

    /// Entry point for the dedicated hook thread
    fn run_hook_message_loop(
        ready_tx: std::sync::mpsc::Sender<Result<(), HookError>>,
        running: Arc<AtomicBool>,
        hook_thread_id: Arc<AtomicU32>,
    ) {
        // SAFETY: plain FFI call, no arguments.
        let thread_id = unsafe { GetCurrentThreadId() };
        hook_thread_id.store(thread_id, Ordering::SeqCst);

        // SAFETY: SetWindowsHookExW requires the calling thread to run a
        // message loop, which this thread does below.
        let hook: HHOOK =
            match unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) } {
                Ok(hook) => hook,
                Err(e) => {
                    let _ = ready_tx.send(Err(HookError::Install(e.to_string())));
                    return;
                }
            };
        let _ = ready_tx.send(Ok(()));

        let mut msg = MSG::default();
        // SAFETY: standard Win32 GetMessage/DispatchMessage loop; exits when
        // WM_QUIT arrives via stop().
        unsafe {
            while GetMessageW(&mut msg, None, 0, 0).as_bool() {
                DispatchMessageW(&msg);
            }
            UnhookWindowsHookEx(hook).ok();
        }

        running.store(false, Ordering::SeqCst);
        info!("keyboard hook removed");
    }

    /// Low-level keyboard hook callback
    ///
    /// # Safety
    ///
    /// Called by Windows on the hook thread; must return quickly.
    unsafe extern "system" fn keyboard_hook_proc(
        n_code: i32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        if n_code != HC_ACTION as i32 {
            // SAFETY: must call CallNextHookEx when n_code < 0.
            return CallNextHookEx(None, n_code, w_param, l_param);
        }

        // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
        let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);

        let transition = match w_param.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(KeyTransition::Down),
            WM_KEYUP | WM_SYSKEYUP => Some(KeyTransition::Up),
            _ => None,
        };

        if let Some(transition) = transition {
            if let Some(sender) = EVENT_SENDER.get() {
                let event = KeyEvent {
                    vk_code: kbs.vkCode,
                    transition,
                    at: Instant::now(),
                };
                // Never block inside the hook callback; a full queue loses
                // the event rather than stalling input delivery.
                if sender.try_send(event).is_err() {
                    warn!(vk_code = kbs.vkCode, "key-event queue full, dropping event");
                }
            }
        }

        // SAFETY: forward the event to the next hook in the chain.
        CallNextHookEx(None, n_code, w_param, l_param)
    }
}
