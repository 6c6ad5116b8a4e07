//! Device Session - lifecycle of one device handle and its reader thread
//!
//! The session guarantees that a reader thread runs if and only if a device is
//! open. The backend, which holds the device handle, is owned either by the
//! session (idle) or by the reader thread (running). Every transition goes
//! through a full join first, so a handle is never closed or replaced while
//! the reader can still poll it.
//!
//! ```text
//!   Idle(backend) ──open ok──► Running(reader)
//!        ▲                         │
//!        └──── close / reopen ─────┘  (stop flag, join, backend handed back)
//! ```
//!
//! Consumer getters never fail: out-of-range ids and "no device" are reported
//! as `false`, `-1` or an empty string.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::event::DeviceInfo;
use super::mirror::StateMirror;
use super::reader::{ReaderError, ReaderHandle, ReaderSettings, SpawnFailure};
use crate::backend::{BackendError, InputBackend};

/// Errors surfaced by [`DeviceSession::try_open`]
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Backend error: {0}")]
    BackendError(#[from] BackendError),

    #[error("Reader error: {0}")]
    ReaderError(#[from] ReaderError),

    /// A previous reader thread panicked and took the backend with it.
    #[error("Input backend lost")]
    BackendLost,
}

enum ReaderSlot<B: InputBackend> {
    Idle(B),
    Running(ReaderHandle<B>),
    Lost,
}

/// Owns one input backend, at most one open device and its reader thread.
pub struct DeviceSession<B: InputBackend> {
    reader: ReaderSlot<B>,
    mirror: Arc<StateMirror>,
    device: Option<DeviceInfo>,
    settings: ReaderSettings,
    device_count: usize,
}

impl<B: InputBackend> DeviceSession<B> {
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, ReaderSettings::default())
    }

    pub fn with_settings(backend: B, settings: ReaderSettings) -> Self {
        debug!("Creating device session with settings: {:?}", settings);
        Self {
            reader: ReaderSlot::Idle(backend),
            mirror: Arc::new(StateMirror::new()),
            device: None,
            settings,
            device_count: 0,
        }
    }

    /// Bring up the input subsystem and return the number of connected
    /// devices, 0 when none are found or initialization fails.
    ///
    /// While a device is open the backend belongs to the reader thread; the
    /// count from the last initialization is returned instead.
    pub fn initialize(&mut self) -> usize {
        let backend = match &mut self.reader {
            ReaderSlot::Idle(backend) => backend,
            ReaderSlot::Running(_) => {
                warn!("initialize() called while a device is open, returning last known count");
                return self.device_count;
            }
            ReaderSlot::Lost => {
                error!("initialize() called after the input backend was lost");
                return 0;
            }
        };

        self.device_count = match backend.init() {
            Ok(count) => count,
            Err(e) => {
                error!("Input subsystem initialization failed: {}", e);
                0
            }
        };
        info!("Input subsystem initialized, {} devices", self.device_count);
        self.device_count
    }

    /// Close any open device and tear down the input subsystem.
    pub fn shutdown(&mut self) {
        self.close();
        if let ReaderSlot::Idle(backend) = &mut self.reader {
            backend.shutdown();
        }
        self.device_count = 0;
    }

    /// Open the device at `index`, replacing whatever was open before.
    ///
    /// Returns `false` on any failure; the session is then closed. The mirror
    /// is cleared only once the new device is open, so a failed open leaves
    /// the last known values in place.
    pub fn open(&mut self, index: i32) -> bool {
        match self.try_open(index) {
            Ok(info) => {
                info!(
                    "Device {} open: {} ({} buttons, {} axes, {} hats)",
                    index, info.name, info.buttons, info.axes, info.hats
                );
                true
            }
            Err(e) => {
                warn!("Failed to open device {}: {}", index, e);
                false
            }
        }
    }

    /// [`open`](Self::open) with the failure reason.
    pub fn try_open(&mut self, index: i32) -> Result<&DeviceInfo, SessionError> {
        let mut backend = self.take_backend()?;
        backend.close_device();

        let info = match backend.open_device(index) {
            Ok(info) => info,
            Err(e) => {
                self.reader = ReaderSlot::Idle(backend);
                return Err(e.into());
            }
        };

        // No reader is running, so the reset cannot race with a writer.
        self.mirror.reset();
        match ReaderHandle::spawn(backend, Arc::clone(&self.mirror), self.settings.clone()) {
            Ok(handle) => self.reader = ReaderSlot::Running(handle),
            Err(SpawnFailure { error, mut backend }) => {
                backend.close_device();
                self.reader = ReaderSlot::Idle(backend);
                return Err(error.into());
            }
        }
        Ok(&*self.device.insert(info))
    }

    /// Stop and join the reader, then release the device. No-op when closed.
    pub fn close(&mut self) {
        if !matches!(self.reader, ReaderSlot::Running(_)) {
            return;
        }
        match self.take_backend() {
            Ok(mut backend) => {
                backend.close_device();
                self.reader = ReaderSlot::Idle(backend);
                info!("Device closed");
            }
            Err(e) => error!("Failed to close device cleanly: {}", e),
        }
    }

    /// Whether a device is open and its reader thread running.
    pub fn is_open(&self) -> bool {
        matches!(self.reader, ReaderSlot::Running(_))
    }

    /// Whether the reader thread is still polling. `false` after a panic.
    pub fn is_reading(&self) -> bool {
        match &self.reader {
            ReaderSlot::Running(handle) => !handle.is_finished(),
            _ => false,
        }
    }

    /// Info of the open device.
    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    /// Device name, empty when no device is open.
    pub fn name(&self) -> String {
        self.device
            .as_ref()
            .map(|d| d.name.clone())
            .unwrap_or_default()
    }

    /// Button count of the open device, `-1` when none is open.
    pub fn button_count(&self) -> i32 {
        self.count_of(|d| d.buttons)
    }

    /// Axis count of the open device, `-1` when none is open.
    pub fn axis_count(&self) -> i32 {
        self.count_of(|d| d.axes)
    }

    /// Hat count of the open device, `-1` when none is open.
    pub fn hat_count(&self) -> i32 {
        self.count_of(|d| d.hats)
    }

    /// See [`StateMirror::button_state`].
    pub fn button_state(&self, button_id: i32, reset_after_read: bool) -> bool {
        self.mirror.button_state(button_id, reset_after_read)
    }

    pub fn axis_value(&self, axis_id: i32) -> i32 {
        self.mirror.axis_value(axis_id)
    }

    pub fn hat_value(&self) -> i32 {
        self.mirror.hat_value()
    }

    /// Shared handle on the mirror for consumers on other threads.
    pub fn mirror(&self) -> Arc<StateMirror> {
        Arc::clone(&self.mirror)
    }

    fn count_of(&self, field: impl Fn(&DeviceInfo) -> usize) -> i32 {
        self.device
            .as_ref()
            .map_or(-1, |d| i32::try_from(field(d)).unwrap_or(i32::MAX))
    }

    // Stops and joins a running reader. Leaves the slot `Lost` until the
    // caller puts the backend back.
    fn take_backend(&mut self) -> Result<B, SessionError> {
        self.device = None;
        match std::mem::replace(&mut self.reader, ReaderSlot::Lost) {
            ReaderSlot::Idle(backend) => Ok(backend),
            ReaderSlot::Running(handle) => Ok(handle.stop()?),
            ReaderSlot::Lost => Err(SessionError::BackendLost),
        }
    }
}

impl<B: InputBackend> Drop for DeviceSession<B> {
    fn drop(&mut self) {
        self.close();
    }
}
