//! Physical gamepads through `gilrs`
//!
//! gilrs reports named buttons and normalised axes. This backend translates
//! them to the numbered, raw-valued joystick model the mirror stores:
//!
//! - buttons use SDL game controller numbering
//! - axis values are scaled to the signed 16-bit range
//! - D-pad buttons and D-pad axes are folded into one hat with SDL hat bits

use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs, GilrsBuilder};
use tracing::{debug, error, info, trace, warn};

use super::{BackendError, InputBackend};
use crate::controller::event::{
    DeviceInfo, InputEvent, HAT_CENTERED, HAT_DOWN, HAT_LEFT, HAT_RIGHT, HAT_UP,
};

// Buttons that occupy a numbered slot, in slot order
const NUMBERED_BUTTONS: [Button; 15] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::Select,
    Button::Mode,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::C,
    Button::Z,
];

const NUMBERED_AXES: [Axis; 6] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::LeftZ,
    Axis::RightZ,
];

const DPAD_BUTTONS: [Button; 4] = [
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
];

// D-pad axis deflection that counts as a pressed direction
const DPAD_AXIS_THRESHOLD: f32 = 0.5;

/// Backend over a process-wide [`Gilrs`] context.
pub struct GilrsBackend {
    gilrs: Option<Gilrs>,
    active_gamepad: Option<(i32, GamepadId)>,
    hat: i32,
}

impl Default for GilrsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GilrsBackend {
    /// Create the backend. No gilrs context exists until [`InputBackend::init`].
    pub fn new() -> Self {
        Self {
            gilrs: None,
            active_gamepad: None,
            hat: HAT_CENTERED,
        }
    }

    fn translate(&mut self, event: EventType) -> InputEvent {
        match event {
            EventType::AxisChanged(axis, value, _) => self.translate_axis(axis, value),
            EventType::ButtonPressed(button, _) => self.translate_button(button, true),
            EventType::ButtonReleased(button, _) => self.translate_button(button, false),
            EventType::Disconnected => {
                warn!("Active gamepad disconnected");
                InputEvent::Other
            }
            _ => {
                trace!("Unhandled event type: {:?}", event);
                InputEvent::Other
            }
        }
    }

    fn translate_axis(&mut self, axis: Axis, value: f32) -> InputEvent {
        if let Some((mask, set)) = dpad_axis_bits(axis, value) {
            return self.update_hat((self.hat & !mask) | set);
        }
        match axis_index(axis) {
            Some(index) => InputEvent::AxisMotion {
                axis: index,
                value: scale_axis(value),
            },
            None => {
                trace!("Ignoring unmapped axis: {:?}", axis);
                InputEvent::Other
            }
        }
    }

    fn translate_button(&mut self, button: Button, pressed: bool) -> InputEvent {
        if let Some(bit) = dpad_bit(button) {
            let next = if pressed { self.hat | bit } else { self.hat & !bit };
            return self.update_hat(next);
        }
        match (button_index(button), pressed) {
            (Some(index), true) => InputEvent::ButtonDown { button: index },
            (Some(index), false) => InputEvent::ButtonUp { button: index },
            (None, _) => {
                trace!("Ignoring unmapped button: {:?}", button);
                InputEvent::Other
            }
        }
    }

    fn update_hat(&mut self, next: i32) -> InputEvent {
        if next == self.hat {
            return InputEvent::Other;
        }
        debug!("Hat changed: {:#04x} -> {:#04x}", self.hat, next);
        self.hat = next;
        InputEvent::HatMotion { value: next }
    }
}

impl InputBackend for GilrsBackend {
    fn init(&mut self) -> Result<usize, BackendError> {
        if self.gilrs.is_none() {
            info!("Initializing gilrs controller interface");
            let gilrs = match unfiltered_context() {
                Ok(g) => {
                    info!("Successfully initialized gilrs");
                    g
                }
                Err(e) => {
                    error!("Failed to initialize gilrs: {}", e);
                    return Err(BackendError::InitializationError(e.to_string()));
                }
            };
            self.gilrs = Some(gilrs);
        }

        let count = self.device_count();
        info!("Found {} gamepads", count);
        Ok(count)
    }

    fn shutdown(&mut self) {
        self.close_device();
        if self.gilrs.take().is_some() {
            info!("gilrs controller interface shut down");
        }
    }

    fn device_count(&self) -> usize {
        self.gilrs.as_ref().map_or(0, |g| g.gamepads().count())
    }

    fn open_device(&mut self, index: i32) -> Result<DeviceInfo, BackendError> {
        self.close_device();

        let gilrs = self.gilrs.as_ref().ok_or(BackendError::NotInitialized)?;
        let position = usize::try_from(index).map_err(|_| BackendError::NoSuchDevice(index))?;
        let (id, gamepad) = gilrs
            .gamepads()
            .nth(position)
            .ok_or(BackendError::NoSuchDevice(index))?;

        if !gamepad.is_connected() {
            return Err(BackendError::DeviceUnavailable(
                index,
                "gamepad is not connected".to_string(),
            ));
        }

        let info = describe(&gamepad);
        info!(
            "Opened gamepad [{}] ID: {}, Name: {}, UUID: {:?}",
            index,
            id,
            info.name,
            gamepad.uuid()
        );
        self.active_gamepad = Some((index, id));
        self.hat = HAT_CENTERED;
        Ok(info)
    }

    fn close_device(&mut self) {
        if let Some((index, id)) = self.active_gamepad.take() {
            info!("Closed gamepad [{}] ID: {}", index, id);
        }
    }

    fn is_open(&self) -> bool {
        self.active_gamepad.is_some()
    }

    fn poll_event(&mut self) -> Option<InputEvent> {
        let (_, active_id) = self.active_gamepad?;
        let Event { id, event, .. } = self.gilrs.as_mut()?.next_event()?;

        if id != active_id {
            trace!("Skipping event from non-active gamepad: {:?}", id);
            return Some(InputEvent::Other);
        }

        Some(self.translate(event))
    }
}

fn describe(gamepad: &Gamepad<'_>) -> DeviceInfo {
    let buttons = NUMBERED_BUTTONS
        .iter()
        .filter(|&&b| gamepad.button_code(b).is_some())
        .count();
    let axes = NUMBERED_AXES
        .iter()
        .filter(|&&a| gamepad.axis_code(a).is_some())
        .count();
    let has_dpad = DPAD_BUTTONS.iter().any(|&b| gamepad.button_code(b).is_some())
        || gamepad.axis_code(Axis::DPadX).is_some()
        || gamepad.axis_code(Axis::DPadY).is_some();

    DeviceInfo::new(gamepad.name(), buttons, axes, usize::from(has_dpad))
}

pub(crate) fn button_index(button: Button) -> Option<usize> {
    NUMBERED_BUTTONS.iter().position(|&b| b == button)
}

pub(crate) fn axis_index(axis: Axis) -> Option<usize> {
    NUMBERED_AXES.iter().position(|&a| a == axis)
}

fn dpad_bit(button: Button) -> Option<i32> {
    match button {
        Button::DPadUp => Some(HAT_UP),
        Button::DPadDown => Some(HAT_DOWN),
        Button::DPadLeft => Some(HAT_LEFT),
        Button::DPadRight => Some(HAT_RIGHT),
        _ => None,
    }
}

// Returns (mask of the axis' direction bits, bits set by this deflection).
fn dpad_axis_bits(axis: Axis, value: f32) -> Option<(i32, i32)> {
    let (negative, positive) = match axis {
        Axis::DPadX => (HAT_LEFT, HAT_RIGHT),
        Axis::DPadY => (HAT_DOWN, HAT_UP),
        _ => return None,
    };
    let set = if value >= DPAD_AXIS_THRESHOLD {
        positive
    } else if value <= -DPAD_AXIS_THRESHOLD {
        negative
    } else {
        HAT_CENTERED
    };
    Some((negative | positive, set))
}

/// Normalised `[-1.0, 1.0]` value to the raw signed 16-bit joystick range.
// Axis slots hold the device's raw values, so the jitter and deadzone
// filters `Gilrs::new` installs stay off.
fn unfiltered_context() -> Result<Gilrs, gilrs::Error> {
    GilrsBuilder::new().with_default_filters(false).build()
}

pub(crate) fn scale_axis(value: f32) -> i32 {
    let value = value.clamp(-1.0, 1.0);
    if value < 0.0 {
        (value * 32768.0).round() as i32
    } else {
        (value * 32767.0).round() as i32
    }
}
