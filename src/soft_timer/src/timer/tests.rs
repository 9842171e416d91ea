use super::*;
use crate::test_utils::{advance, fire, MockTimer};

type Timers = SoftTimers<MockTimer, 4>;

fn new_timers() -> Timers {
    let _ = env_logger::try_init();
    SoftTimers::new(MockTimer::default(), 1000)
}

#[test]
fn create_exhausts_pool() {
    let mut timers = new_timers();
    let handles: Vec<_> = (0..4).map(|_| timers.create()).collect();
    assert_eq!(
        handles,
        (0..4).map(|i| Some(TimerHandle::from_id(i))).collect::<Vec<_>>()
    );
    assert_eq!(timers.create(), None);

    for &handle in handles.iter().flatten() {
        assert_eq!(timers.is_stopped(handle), Ok(true));
    }
}

#[test]
fn create_reuses_lowest_free_slot() {
    let mut timers = new_timers();
    let _t0 = timers.create().unwrap();
    let mut t1 = timers.create();
    let _t2 = timers.create().unwrap();

    timers.destroy(&mut t1).unwrap();
    assert_eq!(t1, None);
    assert_eq!(timers.create(), Some(TimerHandle::from_id(1)));
    assert_eq!(timers.create(), Some(TimerHandle::from_id(3)));
    assert_eq!(timers.create(), None);
}

#[test]
fn create_resets_configuration() {
    let mut timers = new_timers();
    let mut t = timers.create();
    timers.set(t.unwrap(), Some(fire), 10, true).unwrap();
    timers.destroy(&mut t).unwrap();

    // The recycled slot must be configured again before starting
    let t = timers.create().unwrap();
    assert_eq!(timers.start(t), Err(TimerError::InvalidState));
}

#[test]
fn destroy_errors() {
    let mut timers = new_timers();

    let mut none = None;
    assert_eq!(timers.destroy(&mut none), Err(TimerError::InvalidParameter));

    let mut out_of_range = Some(TimerHandle::from_id(4));
    assert_eq!(
        timers.destroy(&mut out_of_range),
        Err(TimerError::InvalidParameter)
    );
    assert_eq!(out_of_range, Some(TimerHandle::from_id(4)));

    // Free slot
    let mut free = Some(TimerHandle::from_id(0));
    assert_eq!(timers.destroy(&mut free), Err(TimerError::InvalidState));

    // Running timer
    let mut running = timers.create();
    timers.set(running.unwrap(), None, 10, false).unwrap();
    timers.start(running.unwrap()).unwrap();
    assert_eq!(timers.destroy(&mut running), Err(TimerError::InvalidState));
    assert!(running.is_some());
    assert_eq!(timers.is_stopped(running.unwrap()), Ok(false));

    timers.stop(running.unwrap()).unwrap();
    assert_eq!(timers.destroy(&mut running), Ok(()));
    assert_eq!(running, None);

    // Destroyed twice
    let mut stale = Some(TimerHandle::from_id(0));
    assert_eq!(timers.destroy(&mut stale), Err(TimerError::InvalidState));
}

#[test]
fn set_rejects_bad_reload() {
    let mut timers = new_timers();
    let t = timers.create().unwrap();

    for reload_ms in [0, 1, 1001, u32::MAX] {
        assert_eq!(
            timers.set(t, Some(fire), reload_ms, true),
            Err(TimerError::InvalidParameter),
            "reload_ms = {reload_ms}"
        );
    }

    // The timer is still unconfigured
    assert_eq!(timers.start(t), Err(TimerError::InvalidState));

    assert_eq!(timers.set(t, Some(fire), 2, true), Ok(()));
    assert_eq!(timers.set(t, Some(fire), 1000, true), Ok(()));
}

#[test]
fn set_checks_handle_before_reload() {
    let mut timers = new_timers();
    assert_eq!(
        timers.set(TimerHandle::from_id(200), None, 0, false),
        Err(TimerError::InvalidParameter)
    );
}

#[test]
fn set_rejects_running_timer() {
    let mut timers = new_timers();
    let t = timers.create().unwrap();
    timers.set(t, Some(fire), 10, false).unwrap();
    timers.start(t).unwrap();

    assert_eq!(timers.set(t, None, 20, true), Err(TimerError::InvalidState));

    // The first configuration is still in effect
    advance(&mut timers, 9);
    assert_eq!(timers.hardware().fired, [0]);
    assert_eq!(timers.is_stopped(t), Ok(true));
}

#[test]
fn set_rejects_free_slot() {
    let mut timers = new_timers();
    assert_eq!(
        timers.set(TimerHandle::from_id(2), None, 10, false),
        Err(TimerError::InvalidState)
    );
}

#[test]
fn start_errors() {
    let mut timers = new_timers();
    assert_eq!(
        timers.start(TimerHandle::from_id(4)),
        Err(TimerError::InvalidParameter)
    );
    assert_eq!(
        timers.start(TimerHandle::from_id(0)),
        Err(TimerError::InvalidState)
    );

    let t = timers.create().unwrap();
    assert_eq!(timers.start(t), Err(TimerError::InvalidState));

    timers.set(t, None, 10, false).unwrap();
    assert_eq!(timers.start(t), Ok(()));
    assert_eq!(timers.start(t), Err(TimerError::InvalidState));
    assert_eq!(timers.running_count(), 1);
}

#[test]
fn stop_errors() {
    let mut timers = new_timers();
    assert_eq!(
        timers.stop(TimerHandle::from_id(255)),
        Err(TimerError::InvalidParameter)
    );
    assert_eq!(
        timers.stop(TimerHandle::from_id(0)),
        Err(TimerError::InvalidState)
    );

    let t = timers.create().unwrap();
    assert_eq!(timers.stop(t), Err(TimerError::InvalidState));
}

#[test]
fn is_stopped_reports_state() {
    let mut timers = new_timers();
    assert_eq!(
        timers.is_stopped(TimerHandle::from_id(4)),
        Err(TimerError::InvalidParameter)
    );
    // Free slots are not "stopped"
    assert_eq!(timers.is_stopped(TimerHandle::from_id(0)), Ok(false));

    let t = timers.create().unwrap();
    assert_eq!(timers.is_stopped(t), Ok(true));
    timers.set(t, None, 10, false).unwrap();
    timers.start(t).unwrap();
    assert_eq!(timers.is_stopped(t), Ok(false));
    timers.stop(t).unwrap();
    assert_eq!(timers.is_stopped(t), Ok(true));
}

#[test]
fn stop_clears_repeat() {
    let mut timers = new_timers();
    let t = timers.create().unwrap();
    timers.set(t, Some(fire), 10, true).unwrap();
    timers.start(t).unwrap();
    advance(&mut timers, 5);
    timers.stop(t).unwrap();

    // Restarting without `set` runs the timer as one-shot
    timers.start(t).unwrap();
    advance(&mut timers, 100);
    assert_eq!(timers.hardware().fired, [0]);
    assert_eq!(timers.is_stopped(t), Ok(true));
}

#[test]
fn stop_last_timer_stops_hardware() {
    let mut timers = new_timers();
    let t = timers.create().unwrap();
    timers.set(t, None, 10, true).unwrap();
    timers.start(t).unwrap();
    assert!(timers.hardware().running);

    timers.stop(t).unwrap();
    assert!(!timers.hardware().running);
    assert_eq!(timers.next_expiry_ms(), None);
}

#[test]
fn callback_stops_itself() {
    let mut timers = new_timers();
    let t = timers.create().unwrap();
    timers
        .set(
            t,
            Some(|timers, handle| {
                fire(timers, handle);
                timers.stop(handle).unwrap();
            }),
            10,
            true,
        )
        .unwrap();
    timers.start(t).unwrap();

    advance(&mut timers, 100);
    assert_eq!(timers.hardware().fired, [0]);
    assert_eq!(timers.is_stopped(t), Ok(true));
    assert!(!timers.hardware().running);
}

#[test]
fn callback_restarts_itself() {
    let mut timers = new_timers();
    let t = timers.create().unwrap();
    timers
        .set(
            t,
            Some(|timers, handle| {
                fire(timers, handle);
                // A running timer can't be started
                assert_eq!(timers.start(handle), Err(TimerError::InvalidState));

                // Reconfigure as a repeating timer with a different period
                if timers.hardware().fired.len() == 1 {
                    timers.stop(handle).unwrap();
                    timers.set(handle, Some(fire), 20, true).unwrap();
                    timers.start(handle).unwrap();
                }
            }),
            10,
            false,
        )
        .unwrap();
    timers.start(t).unwrap();

    advance(&mut timers, 9);
    assert_eq!(timers.hardware().fired, [0]);
    assert_eq!(timers.next_expiry_ms(), Some(19));

    advance(&mut timers, 19);
    assert_eq!(timers.hardware().fired, [0, 0]);
    advance(&mut timers, 19);
    assert_eq!(timers.hardware().fired, [0, 0, 0]);
    assert_eq!(timers.is_stopped(t), Ok(false));
}

#[test]
fn callback_starts_other_timers() {
    let mut timers = new_timers();
    let t0 = timers.create().unwrap();
    let t1 = timers.create().unwrap();
    let t2 = timers.create().unwrap();

    // `t1` starts the timers on both sides of it
    timers.set(t0, Some(fire), 50, false).unwrap();
    timers.set(t2, Some(fire), 30, false).unwrap();
    timers
        .set(
            t1,
            Some(|timers, handle| {
                fire(timers, handle);
                timers.start(TimerHandle::from_id(0)).unwrap();
                timers.start(TimerHandle::from_id(2)).unwrap();
            }),
            10,
            false,
        )
        .unwrap();
    timers.start(t1).unwrap();

    advance(&mut timers, 9);
    assert_eq!(timers.hardware().fired, [1]);

    // Neither started timer was charged with the period that expired `t1`
    assert_eq!(timers.running_count(), 2);
    assert_eq!(timers.next_expiry_ms(), Some(29));
    assert_eq!(timers.hardware().reload, 29);

    advance(&mut timers, 29);
    assert_eq!(timers.hardware().fired, [1, 2]);
    advance(&mut timers, 20);
    assert_eq!(timers.hardware().fired, [1, 2, 0]);
    assert!(!timers.hardware().running);
}

#[test]
fn callback_destroys_other_timer() {
    let mut timers = new_timers();
    let t0 = timers.create().unwrap();
    let t1 = timers.create().unwrap();
    timers.set(t1, Some(fire), 100, true).unwrap();
    timers.start(t1).unwrap();
    timers
        .set(
            t0,
            Some(|timers, handle| {
                fire(timers, handle);
                let mut victim = Some(TimerHandle::from_id(1));
                timers.stop(victim.unwrap()).unwrap();
                timers.destroy(&mut victim).unwrap();
            }),
            10,
            false,
        )
        .unwrap();
    timers.start(t0).unwrap();

    advance(&mut timers, 1000);
    assert_eq!(timers.hardware().fired, [0]);
    assert_eq!(timers.is_stopped(t1), Ok(false));
    assert_eq!(timers.create(), Some(t1));
}

#[test]
fn nested_period_elapsed_is_ignored() {
    let mut timers = new_timers();
    let t = timers.create().unwrap();
    timers
        .set(
            t,
            Some(|timers, handle| {
                fire(timers, handle);
                timers.on_period_elapsed();
            }),
            10,
            true,
        )
        .unwrap();
    timers.start(t).unwrap();

    advance(&mut timers, 9);
    assert_eq!(timers.hardware().fired, [0]);
    assert_eq!(timers.next_expiry_ms(), Some(9));
}
