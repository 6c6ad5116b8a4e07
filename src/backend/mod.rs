//! Input subsystem backends
//!
//! A backend owns the process-wide input subsystem and at most one open device.
//! The [`DeviceSession`](crate::controller::session::DeviceSession) moves the backend into
//! the reader thread while a device is open and takes it back on join, so the
//! device handle is never touched from two threads at once.
//!
//! - [`gilrs_backend`] - physical gamepads through `gilrs`
//! - [`virtual_backend`] - simulated devices fed from code

pub mod gilrs_backend;
pub mod virtual_backend;

pub use gilrs_backend::GilrsBackend;
pub use virtual_backend::{EventInjector, VirtualBackend};

use crate::controller::event::{DeviceInfo, InputEvent};

/// Backend errors
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to initialize input subsystem: {0}")]
    InitializationError(String),

    #[error("Input subsystem not initialized")]
    NotInitialized,

    #[error("No device at index {0}")]
    NoSuchDevice(i32),

    #[error("Device {0} unavailable: {1}")]
    DeviceUnavailable(i32, String),
}

/// Collaborator wrapping an input library.
///
/// `init` and `shutdown` bracket the process-wide subsystem state. All other
/// calls are only meaningful between the two.
pub trait InputBackend: Send + 'static {
    /// Bring up the subsystem and report the number of connected devices.
    fn init(&mut self) -> Result<usize, BackendError>;

    /// Tear down the subsystem, closing any open device first.
    fn shutdown(&mut self);

    /// Devices currently connected, 0 when not initialized.
    fn device_count(&self) -> usize;

    /// Open the device at `index`, replacing any device that is already open.
    fn open_device(&mut self, index: i32) -> Result<DeviceInfo, BackendError>;

    /// Release the open device. No-op when nothing is open.
    fn close_device(&mut self);

    fn is_open(&self) -> bool;

    /// Next pending event for the open device, without blocking.
    fn poll_event(&mut self) -> Option<InputEvent>;
}
