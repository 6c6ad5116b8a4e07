//! Backend-neutral input events and device metadata
//!
//! Every [`InputBackend`](crate::backend::InputBackend) translates its native
//! events into [`InputEvent`] before they reach the reader thread, so the
//! classification in [`StateMirror::apply`](super::mirror::StateMirror::apply)
//! never sees library-specific types.


/// Number of button slots held by the mirror.
pub const MAX_BUTTONS: usize = 100;

/// Number of axis slots held by the mirror.
pub const MAX_AXES: usize = 100;

/// Hat value before any hat event was observed.
pub const HAT_NO_INPUT: i32 = -1;

// Hat direction bits, SDL compatible
pub const HAT_CENTERED: i32 = 0x00;
pub const HAT_UP: i32 = 0x01;
pub const HAT_RIGHT: i32 = 0x02;
pub const HAT_DOWN: i32 = 0x04;
pub const HAT_LEFT: i32 = 0x08;

/// One discrete event polled from the input subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    AxisMotion { axis: usize, value: i32 },
    ButtonDown { button: usize },
    ButtonUp { button: usize },
    HatMotion { value: i32 },
    /// Anything the mirror does not track (connection changes, etc.)
    Other,
}

/// Static description of an opened device.
///
/// Captured once when the device is opened; counts are whatever the backend
/// reports and may exceed the mirror capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub buttons: usize,
    pub axes: usize,
    pub hats: usize,
}

impl DeviceInfo {
    pub fn new(name: impl Into<String>, buttons: usize, axes: usize, hats: usize) -> Self {
        Self {
            name: name.into(),
            buttons,
            axes,
            hats,
        }
    }
}
