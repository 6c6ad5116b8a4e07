//! Lock-free mirror of the last known device state
//!
//! The reader thread is the only writer. Consumers read any slot at any time
//! without blocking it. Each slot is atomic on its own; reading axis 0 and then
//! axis 1 may observe values from two different event batches.
//!
//! # Reset-on-read
//!
//! [`StateMirror::button_state`] with `reset_after_read` gives "pressed since
//! last check" semantics on top of the level state. Two presses that land
//! within one poll interval collapse into a single observation.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use tracing::trace;

use super::event::{InputEvent, HAT_NO_INPUT, MAX_AXES, MAX_BUTTONS};

// Slots carry no cross-slot ordering, relaxed loads and stores are enough.
const SLOT_ORDER: Ordering = Ordering::Relaxed;

#[derive(Debug)]
pub struct StateMirror {
    buttons: [AtomicBool; MAX_BUTTONS],
    axes: [AtomicI32; MAX_AXES],
    hat: AtomicI32,
}

impl Default for StateMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMirror {
    pub fn new() -> Self {
        Self {
            buttons: std::array::from_fn(|_| AtomicBool::new(false)),
            axes: std::array::from_fn(|_| AtomicI32::new(0)),
            hat: AtomicI32::new(HAT_NO_INPUT),
        }
    }

    /// Button level state, `false` for ids outside `[0, MAX_BUTTONS)`.
    ///
    /// With `reset_after_read` the slot is swapped to `false` in the same
    /// atomic operation that reads it.
    pub fn button_state(&self, button_id: i32, reset_after_read: bool) -> bool {
        let Some(slot) = slot_index(button_id, MAX_BUTTONS).map(|i| &self.buttons[i]) else {
            return false;
        };

        if reset_after_read {
            slot.swap(false, SLOT_ORDER)
        } else {
            slot.load(SLOT_ORDER)
        }
    }

    /// Raw axis value, `-1` for ids outside `[0, MAX_AXES)`.
    pub fn axis_value(&self, axis_id: i32) -> i32 {
        match slot_index(axis_id, MAX_AXES) {
            Some(i) => self.axes[i].load(SLOT_ORDER),
            None => -1,
        }
    }

    /// Last hat value, [`HAT_NO_INPUT`] until the first hat event.
    pub fn hat_value(&self) -> i32 {
        self.hat.load(SLOT_ORDER)
    }

    /// Write one event into its slot.
    ///
    /// Returns `false` when the event was ignored, either because its type is
    /// not tracked or because its index is outside the mirror capacity.
    pub fn apply(&self, event: &InputEvent) -> bool {
        match *event {
            InputEvent::AxisMotion { axis, value } => match self.axes.get(axis) {
                Some(slot) => {
                    slot.store(value, SLOT_ORDER);
                    true
                }
                None => {
                    trace!("Axis {} outside mirror capacity, ignored", axis);
                    false
                }
            },
            InputEvent::ButtonDown { button } => self.store_button(button, true),
            InputEvent::ButtonUp { button } => self.store_button(button, false),
            InputEvent::HatMotion { value } => {
                self.hat.store(value, SLOT_ORDER);
                true
            }
            InputEvent::Other => false,
        }
    }

    /// Return every slot to its initial value.
    ///
    /// Only called by the session while no reader thread is running.
    pub fn reset(&self) {
        for button in &self.buttons {
            button.store(false, SLOT_ORDER);
        }
        for axis in &self.axes {
            axis.store(0, SLOT_ORDER);
        }
        self.hat.store(HAT_NO_INPUT, SLOT_ORDER);
    }

    fn store_button(&self, button: usize, pressed: bool) -> bool {
        match self.buttons.get(button) {
            Some(slot) => {
                slot.store(pressed, SLOT_ORDER);
                true
            }
            None => {
                trace!("Button {} outside mirror capacity, ignored", button);
                false
            }
        }
    }
}

fn slot_index(id: i32, capacity: usize) -> Option<usize> {
    usize::try_from(id).ok().filter(|&i| i < capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::event::HAT_UP;
    use std::sync::Arc;

    #[test]
    fn out_of_range_ids_return_sentinels() {
        let mirror = StateMirror::new();
        for id in [-1, -100, MAX_BUTTONS as i32, i32::MAX, i32::MIN] {
            assert!(!mirror.button_state(id, false));
            assert!(!mirror.button_state(id, true));
        }
        for id in [-1, MAX_AXES as i32, 1000, i32::MIN] {
            assert_eq!(mirror.axis_value(id), -1);
        }
    }

    #[test]
    fn fresh_mirror_has_no_hat_input() {
        let mirror = StateMirror::new();
        assert_eq!(mirror.hat_value(), HAT_NO_INPUT);
        assert_eq!(mirror.axis_value(0), 0);
        assert!(!mirror.button_state(0, false));
    }

    #[test]
    fn button_down_then_reset_on_read() {
        let mirror = StateMirror::new();
        assert!(mirror.apply(&InputEvent::ButtonDown { button: 3 }));

        assert!(mirror.button_state(3, false));
        assert!(mirror.button_state(3, true));
        assert!(!mirror.button_state(3, false));
    }

    #[test]
    fn button_up_clears_slot() {
        let mirror = StateMirror::new();
        mirror.apply(&InputEvent::ButtonDown { button: 7 });
        mirror.apply(&InputEvent::ButtonUp { button: 7 });
        assert!(!mirror.button_state(7, false));
    }

    #[test]
    fn axis_value_is_stored_verbatim() {
        let mirror = StateMirror::new();
        for value in [i32::MIN, -32768, -1, 0, 12345, 32767, i32::MAX] {
            mirror.apply(&InputEvent::AxisMotion { axis: 5, value });
            assert_eq!(mirror.axis_value(5), value);
        }
    }

    #[test]
    fn out_of_capacity_events_are_ignored() {
        let mirror = StateMirror::new();
        assert!(!mirror.apply(&InputEvent::ButtonDown {
            button: MAX_BUTTONS
        }));
        assert!(!mirror.apply(&InputEvent::AxisMotion {
            axis: MAX_AXES,
            value: 9
        }));
        assert!(!mirror.apply(&InputEvent::Other));
        assert!((0..MAX_BUTTONS as i32).all(|b| !mirror.button_state(b, false)));
    }

    #[test]
    fn hat_motion_overwrites_and_reset_restores_sentinel() {
        let mirror = StateMirror::new();
        mirror.apply(&InputEvent::HatMotion { value: HAT_UP });
        assert_eq!(mirror.hat_value(), HAT_UP);

        mirror.apply(&InputEvent::AxisMotion { axis: 1, value: -400 });
        mirror.apply(&InputEvent::ButtonDown { button: 0 });
        mirror.reset();
        assert_eq!(mirror.hat_value(), HAT_NO_INPUT);
        assert_eq!(mirror.axis_value(1), 0);
        assert!(!mirror.button_state(0, false));
    }

    #[test]
    fn concurrent_readers_see_complete_values() {
        let mirror = Arc::new(StateMirror::new());
        let writer = {
            let mirror = Arc::clone(&mirror);
            std::thread::spawn(move || {
                for i in 0..10_000 {
                    let value = if i % 2 == 0 { i32::MIN } else { i32::MAX };
                    mirror.apply(&InputEvent::AxisMotion { axis: 0, value });
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let mirror = Arc::clone(&mirror);
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        let v = mirror.axis_value(0);
                        assert!(v == 0 || v == i32::MIN || v == i32::MAX);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
