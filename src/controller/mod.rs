//! Joystick state subsystem
//!
//! 1. [`session`] - device handle and reader thread lifecycle
//! 2. [`reader`] - background loop draining the backend's event queue
//! 3. [`mirror`] - lock-free last known state served to consumers
//!
//! # Architecture
//!
//! ```text
//! Backend ──poll──► Reader thread ──store──► StateMirror ◄──load── consumers
//!    ▲
//!    └── open / close (DeviceSession, only while no reader runs)
//! ```

pub mod event;
pub mod mirror;
pub mod reader;
pub mod session;

pub use event::{DeviceInfo, InputEvent, HAT_NO_INPUT, MAX_AXES, MAX_BUTTONS};
pub use mirror::StateMirror;
pub use reader::{ReaderError, ReaderHandle, ReaderSettings, SpawnFailure};
pub use session::{DeviceSession, SessionError};
