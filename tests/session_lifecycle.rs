use joystick_mirror::backend::{EventInjector, VirtualBackend};
use joystick_mirror::controller::{ReaderSettings, HAT_NO_INPUT, MAX_AXES, MAX_BUTTONS};
use joystick_mirror::DeviceSession;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

fn opened_session(devices: usize) -> (DeviceSession<VirtualBackend>, EventInjector) {
    let backend = VirtualBackend::with_devices(devices);
    let injector = backend.injector();
    let mut session = DeviceSession::new(backend);
    assert_eq!(session.initialize(), devices);
    assert!(session.open(0));
    (session, injector)
}

#[test]
fn press_then_reset_on_read_scenario() {
    let (session, injector) = opened_session(1);

    injector.press_button(3);
    assert!(wait_for(|| session.button_state(3, false)));
    assert!(session.button_state(3, true));
    assert!(!session.button_state(3, false));
}

#[test]
fn axis_value_is_reported_verbatim() {
    let (session, injector) = opened_session(1);

    injector.move_axis(1, -32768);
    injector.move_axis(4, 31000);
    assert!(wait_for(|| session.axis_value(4) == 31000));
    assert_eq!(session.axis_value(1), -32768);
}

#[test]
fn release_clears_button_and_hat_updates() {
    let (session, injector) = opened_session(1);
    assert_eq!(session.hat_value(), HAT_NO_INPUT);

    injector.press_button(0);
    injector.release_button(0);
    injector.move_hat(8);
    assert!(wait_for(|| session.hat_value() == 8));
    assert!(!session.button_state(0, false));
}

#[test]
fn out_of_range_ids_are_sentinels_while_open() {
    let (session, injector) = opened_session(1);
    injector.press_button(MAX_BUTTONS);
    injector.move_axis(MAX_AXES, 77);
    injector.move_hat(1);
    assert!(wait_for(|| session.hat_value() == 1));

    assert!(!session.button_state(MAX_BUTTONS as i32, false));
    assert!(!session.button_state(-1, true));
    assert_eq!(session.axis_value(MAX_AXES as i32), -1);
    assert_eq!(session.axis_value(-5), -1);
}

#[test]
fn reopen_leaves_single_reader_on_second_device() {
    let (mut session, injector) = opened_session(2);
    assert!(session.open(1));

    assert_eq!(injector.open_handles(), 1);
    assert_eq!(injector.open_index(), Some(1));
    assert_eq!(injector.opens(), 2);
    assert_eq!(session.name(), "Virtual Joystick 1");
    assert!(session.is_reading());

    // the live reader is bound to the new device
    injector.press_button(9);
    assert!(wait_for(|| session.button_state(9, false)));
}

#[test]
fn reopen_discards_previous_device_state() {
    let (mut session, injector) = opened_session(2);
    injector.move_hat(4);
    injector.move_axis(0, 500);
    assert!(wait_for(|| session.axis_value(0) == 500));

    assert!(session.open(1));
    assert_eq!(session.hat_value(), HAT_NO_INPUT);
    assert_eq!(session.axis_value(0), 0);
}

#[test]
fn close_joins_reader_and_stops_polling() {
    let (mut session, injector) = opened_session(1);
    assert!(wait_for(|| injector.polls() > 0));

    session.close();
    assert!(!session.is_open());
    assert!(!session.is_reading());
    assert_eq!(injector.open_handles(), 0);

    let polls = injector.polls();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(injector.polls(), polls);

    // closing twice is harmless
    session.close();
    assert_eq!(session.name(), "");
}

#[test]
fn drop_closes_device() {
    let (session, injector) = opened_session(1);
    drop(session);
    assert_eq!(injector.open_handles(), 0);
    assert_eq!(injector.open_index(), None);
}

#[test]
fn close_latency_is_bounded_by_poll_interval() {
    let backend = VirtualBackend::with_devices(1);
    let settings = ReaderSettings {
        poll_interval: Duration::from_millis(10),
        ..ReaderSettings::default()
    };
    let mut session = DeviceSession::with_settings(backend, settings);
    session.initialize();
    assert!(session.open(0));

    let started = Instant::now();
    session.close();
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn many_consumer_threads_read_without_blocking_reader() {
    let (session, injector) = opened_session(1);
    let mirror = session.mirror();

    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let mirror = Arc::clone(&mirror);
            thread::spawn(move || {
                for _ in 0..2_000 {
                    let v = mirror.axis_value(2);
                    assert!((0..=100).contains(&v));
                    let _ = mirror.button_state(5, false);
                }
            })
        })
        .collect();

    for value in 0..=100 {
        injector.move_axis(2, value);
    }
    assert!(wait_for(|| session.axis_value(2) == 100));

    for consumer in consumers {
        consumer.join().unwrap();
    }
}
