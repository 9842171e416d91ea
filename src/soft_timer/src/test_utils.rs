//! Testing utilities
use crate::{HardTimer, SoftTimers};

/// A `HardTimer` that counts in virtual time and records expirations on behalf
/// of test callbacks.
#[derive(Debug, Default)]
pub(crate) struct MockTimer {
    /// The value passed to `init`.
    pub(crate) init_max_reload_ms: Option<u32>,
    pub(crate) running: bool,
    pub(crate) elapsed: u32,
    pub(crate) reload: u32,
    pub(crate) num_starts: usize,
    pub(crate) num_stops: usize,
    /// The IDs of the timers whose callbacks were called, in order.
    pub(crate) fired: Vec<u8>,
    /// `(virtual time, timer ID)` for each callback call made by
    /// [`fire_at`].
    pub(crate) fired_at: Vec<(u64, u8)>,
    /// The virtual time maintained by [`advance`].
    pub(crate) now: u64,
}

impl HardTimer for MockTimer {
    fn init(&mut self, max_reload_ms: u32) {
        assert!(self.init_max_reload_ms.is_none(), "initialized twice");
        self.init_max_reload_ms = Some(max_reload_ms);
        self.reload = max_reload_ms;
    }

    fn start(&mut self) {
        self.running = true;
        self.elapsed = 0;
        self.num_starts += 1;
    }

    fn stop(&mut self) {
        self.running = false;
        self.elapsed = 0;
        self.num_stops += 1;
    }

    fn elapsed_ms(&self) -> u32 {
        self.elapsed
    }

    fn reload_ms(&self) -> u32 {
        self.reload
    }

    fn set_reload_ms(&mut self, reload_ms: u32) {
        if let Some(max) = self.init_max_reload_ms {
            assert!(reload_ms <= max, "{reload_ms} exceeds the maximum {max}");
        }
        self.reload = reload_ms;
    }
}

/// A timer callback that records the timer ID.
pub(crate) fn fire<const N: usize>(
    timers: &mut SoftTimers<MockTimer, N>,
    handle: crate::TimerHandle,
) {
    timers.hardware_mut().fired.push(handle.id());
}

/// A timer callback that records the timer ID and the virtual time.
pub(crate) fn fire_at<const N: usize>(
    timers: &mut SoftTimers<MockTimer, N>,
    handle: crate::TimerHandle,
) {
    let hw = timers.hardware_mut();
    let now = hw.now;
    hw.fired_at.push((now, handle.id()));
    hw.fired.push(handle.id());
}

/// Let `ms` milliseconds pass in virtual time, delivering every overflow of
/// the mock timer to the engine.
pub(crate) fn advance<const N: usize>(timers: &mut SoftTimers<MockTimer, N>, mut ms: u32) {
    loop {
        let hw = timers.hardware_mut();
        if !hw.running {
            hw.now += u64::from(ms);
            return;
        }

        let until_overflow = hw.reload - hw.elapsed;
        if ms < until_overflow {
            hw.elapsed += ms;
            hw.now += u64::from(ms);
            return;
        }

        ms -= until_overflow;
        hw.now += u64::from(until_overflow);
        hw.elapsed = 0;

        log::trace!("mock overflow at {}", hw.now);
        timers.on_period_elapsed();
    }
}
