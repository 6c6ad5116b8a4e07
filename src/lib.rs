//! Polling interface over one joystick's buttons, axes and hat.
//!
//! A [`DeviceSession`] opens a device through an [`InputBackend`] and runs a
//! reader thread that keeps the last known state in atomic slots. Getters read
//! those slots without locking.
//!
//! ```no_run
//! use joystick_mirror::{backend::GilrsBackend, DeviceSession};
//!
//! let mut session = DeviceSession::new(GilrsBackend::new());
//! if session.initialize() > 0 && session.open(0) {
//!     println!("{}: A pressed = {}", session.name(), session.button_state(0, false));
//! }
//! ```

pub mod backend;
pub mod config;
pub mod controller;

pub use backend::{BackendError, InputBackend};
pub use controller::{DeviceInfo, DeviceSession, InputEvent, SessionError, StateMirror};
