//! Layout module: OS layout registry access and rotation
//!
//! The OS enumeration order is treated as a fixed cyclic sequence for the
//! duration of one switch; the list is re-fetched on every switch.

pub mod mock;
pub mod registry;
pub mod rotator;

pub use registry::{LayoutHandle, LayoutRegistry, RegistryError};
pub use rotator::{next_layout, LayoutRotator, LayoutSwitch, RotateError};

#[cfg(target_os = "windows")]
pub use registry::WindowsLayoutRegistry;
