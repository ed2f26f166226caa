//! Lifecycle module for process shutdown handling

mod shutdown;

pub use shutdown::ShutdownSignal;
