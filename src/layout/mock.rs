//! Mock layout registry for unit testing
//!
//! Behaves like a foreground window that honors every activation request:
//! each accepted request is recorded and becomes the current layout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::registry::{LayoutHandle, LayoutRegistry, RegistryError};

/// An in-memory [`LayoutRegistry`] with scripted contents
#[derive(Clone)]
pub struct MockLayoutRegistry {
    layouts: Arc<Mutex<Vec<LayoutHandle>>>,
    current: Arc<Mutex<LayoutHandle>>,
    activated: Arc<Mutex<Vec<LayoutHandle>>>,
    fail_activation: Arc<AtomicBool>,
}

impl MockLayoutRegistry {
    /// Registry enumerating the given raw handles, first one current
    pub fn new(raw: &[isize]) -> Self {
        let layouts: Vec<LayoutHandle> = raw.iter().copied().map(LayoutHandle::new).collect();
        let current = layouts.first().copied().unwrap_or(LayoutHandle::new(0));
        Self {
            layouts: Arc::new(Mutex::new(layouts)),
            current: Arc::new(Mutex::new(current)),
            activated: Arc::new(Mutex::new(Vec::new())),
            fail_activation: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_current(&self, handle: LayoutHandle) {
        *self.current.lock().expect("lock poisoned") = handle;
    }

    /// All activation requests seen so far, in order
    pub fn activations(&self) -> Vec<LayoutHandle> {
        self.activated.lock().expect("lock poisoned").clone()
    }

    /// Make every subsequent activation request fail
    pub fn fail_activation(&self) {
        self.fail_activation.store(true, Ordering::SeqCst);
    }
}

impl LayoutRegistry for MockLayoutRegistry {
    fn enumerate(&self) -> Vec<LayoutHandle> {
        self.layouts.lock().expect("lock poisoned").clone()
    }

    fn current(&self) -> LayoutHandle {
        *self.current.lock().expect("lock poisoned")
    }

    fn activate(&self, next: LayoutHandle) -> Result<(), RegistryError> {
        if self.fail_activation.load(Ordering::SeqCst) {
            return Err(RegistryError::ActivationFailed(
                "mock activation failure".to_string(),
            ));
        }
        self.activated.lock().expect("lock poisoned").push(next);
        *self.current.lock().expect("lock poisoned") = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_registry_records_and_applies_activations() {
        let registry = MockLayoutRegistry::new(&[1, 2]);
        assert_eq!(registry.current(), LayoutHandle::new(1));

        registry.activate(LayoutHandle::new(2)).unwrap();
        assert_eq!(registry.current(), LayoutHandle::new(2));
        assert_eq!(registry.activations(), vec![LayoutHandle::new(2)]);
    }

    #[test]
    fn test_mock_registry_activation_failure() {
        let registry = MockLayoutRegistry::new(&[1, 2]);
        registry.fail_activation();
        assert!(registry.activate(LayoutHandle::new(2)).is_err());
        assert!(registry.activations().is_empty());
    }
}
