//! Simulated devices for tests and hardware-free embedding
//!
//! Events are queued through an [`EventInjector`] from any thread and handed
//! out one per poll, the same way a real subsystem drains its queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use super::{BackendError, InputBackend};
use crate::controller::event::{DeviceInfo, InputEvent};

#[derive(Debug, Default)]
struct Shared {
    queue: VecDeque<InputEvent>,
    initialized: bool,
    open_index: Option<i32>,
    open_handles: usize,
    opens: usize,
    polls: u64,
}

/// Backend serving a fixed list of simulated devices.
#[derive(Debug)]
pub struct VirtualBackend {
    devices: Vec<DeviceInfo>,
    shared: Arc<Mutex<Shared>>,
}

/// Cloneable handle feeding events to a [`VirtualBackend`] and observing it.
#[derive(Debug, Clone)]
pub struct EventInjector {
    shared: Arc<Mutex<Shared>>,
}

impl VirtualBackend {
    pub fn new(devices: Vec<DeviceInfo>) -> Self {
        Self {
            devices,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// A backend with `count` identical test devices.
    pub fn with_devices(count: usize) -> Self {
        Self::new(
            (0..count)
                .map(|i| DeviceInfo::new(format!("Virtual Joystick {}", i), 12, 6, 1))
                .collect(),
        )
    }

    pub fn injector(&self) -> EventInjector {
        EventInjector {
            shared: Arc::clone(&self.shared),
        }
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        lock(&self.shared)
    }
}

impl InputBackend for VirtualBackend {
    fn init(&mut self) -> Result<usize, BackendError> {
        self.shared().initialized = true;
        info!("Virtual input subsystem up with {} devices", self.devices.len());
        Ok(self.devices.len())
    }

    fn shutdown(&mut self) {
        self.close_device();
        self.shared().initialized = false;
        info!("Virtual input subsystem shut down");
    }

    fn device_count(&self) -> usize {
        if self.shared().initialized {
            self.devices.len()
        } else {
            0
        }
    }

    fn open_device(&mut self, index: i32) -> Result<DeviceInfo, BackendError> {
        self.close_device();

        let mut shared = self.shared();
        if !shared.initialized {
            return Err(BackendError::NotInitialized);
        }
        let info = usize::try_from(index)
            .ok()
            .and_then(|i| self.devices.get(i))
            .cloned()
            .ok_or(BackendError::NoSuchDevice(index))?;

        shared.open_index = Some(index);
        shared.open_handles += 1;
        shared.opens += 1;
        debug!("Virtual device {} opened", index);
        Ok(info)
    }

    fn close_device(&mut self) {
        let mut shared = self.shared();
        if let Some(index) = shared.open_index.take() {
            shared.open_handles -= 1;
            debug!("Virtual device {} closed", index);
        }
    }

    fn is_open(&self) -> bool {
        self.shared().open_index.is_some()
    }

    fn poll_event(&mut self) -> Option<InputEvent> {
        let mut shared = self.shared();
        shared.polls += 1;
        if shared.open_index.is_none() {
            return None;
        }
        shared.queue.pop_front()
    }
}

impl EventInjector {
    pub fn push(&self, event: InputEvent) {
        lock(&self.shared).queue.push_back(event);
    }

    pub fn press_button(&self, button: usize) {
        self.push(InputEvent::ButtonDown { button });
    }

    pub fn release_button(&self, button: usize) {
        self.push(InputEvent::ButtonUp { button });
    }

    pub fn move_axis(&self, axis: usize, value: i32) {
        self.push(InputEvent::AxisMotion { axis, value });
    }

    pub fn move_hat(&self, value: i32) {
        self.push(InputEvent::HatMotion { value });
    }

    /// Events queued but not yet polled.
    pub fn pending(&self) -> usize {
        lock(&self.shared).queue.len()
    }

    /// Index of the currently open device.
    pub fn open_index(&self) -> Option<i32> {
        lock(&self.shared).open_index
    }

    /// Device handles currently held open. Never exceeds 1.
    pub fn open_handles(&self) -> usize {
        lock(&self.shared).open_handles
    }

    /// Successful opens since creation.
    pub fn opens(&self) -> usize {
        lock(&self.shared).opens
    }

    /// Total poll calls, used to observe whether a reader is still running.
    pub fn polls(&self) -> u64 {
        lock(&self.shared).polls
    }
}

// A panicking test thread must not wedge the other handles.
fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
