//! The step engine and the rescheduler.
//!
//! # Update Passes
//!
//! The hardware timer is always programmed to overflow when the nearest
//! running timer expires. Nothing else needs its attention in between, so the
//! engine only runs when
//!
//!  - the hardware overflows ([`SoftTimers::on_period_elapsed`]), in which
//!    case exactly the programmed reload period has elapsed, or
//!  - a timer is started or stopped, in which case the elapsed time is read
//!    from the hardware counter.
//!
//! Either way, an *update pass* charges the elapsed time to every running
//! timer, fires the callbacks of the timers whose countdown reached zero,
//! re-arms or stops them, and finally reprograms the hardware with the minimum
//! remaining countdown. The number of interrupts is thus bounded by the number
//! of expirations, at the cost of a linear scan over the pool on every update.
//!
//! ```text
//!   countdown
//!  A ████████████████████▏ 0 → callback → re-arm
//!  B ███████████████████████████████████████▏
//!  C (stopped: u32::MAX, excluded from the minimum)
//!    ╚════ reload ═══════╝
//! ```
use crate::{timer::TimerState, HardTimer, SoftTimers};

/// Represents a span of time in milliseconds.
pub(crate) type Time32 = u32;

/// The countdown value of a timer that is not running. Serves as the identity
/// element of the minimum reduction.
pub(crate) const STOPPED_COUNTDOWN: Time32 = u32::MAX;

impl<H: HardTimer, const N: usize> SoftTimers<H, N> {
    /// Notify the engine that the hardware timer has overflowed.
    ///
    /// This is the entry point for the timer interrupt handler. It must be
    /// called once per overflow of the peripheral bound to this engine, after
    /// the interrupt flag has been cleared. The reload value the hardware was
    /// running with is charged to every running timer.
    ///
    /// This method does nothing when called from a timer callback.
    pub fn on_period_elapsed(&mut self) {
        if self.update_in_progress {
            log::warn!("on_period_elapsed: called during an update pass; ignored");
            return;
        }

        let elapsed_ms = self.hw.reload_ms();
        log::trace!("on_period_elapsed: elapsed_ms = {elapsed_ms}");
        self.update(elapsed_ms);
    }

    /// Charge `elapsed_ms` to every running timer and reprogram the hardware.
    ///
    /// Precondition: No update pass in progress
    pub(crate) fn update(&mut self, elapsed_ms: Time32) {
        debug_assert!(!self.update_in_progress);

        let next_ms = self.step_all(elapsed_ms);
        self.reschedule(next_ms);
    }

    /// Apply `elapsed_ms` to every timer in the order of their IDs. Returns
    /// the time until the next expiration, or [`STOPPED_COUNTDOWN`] if no
    /// timers are running.
    fn step_all(&mut self, elapsed_ms: Time32) -> Time32 {
        // Set `update_in_progress`. This will stop the operations called by
        // callbacks from starting nested passes.
        self.update_in_progress = true;

        for i in 0..N {
            self.step(i, elapsed_ms);
        }

        self.update_in_progress = false;

        let mut next_ms = STOPPED_COUNTDOWN;
        for timer_cb in self.slots.iter_mut() {
            timer_cb.armed_in_pass = false;
            next_ms = next_ms.min(timer_cb.countdown_ms);
        }

        // A countdown of zero never survives a pass
        debug_assert_ne!(next_ms, 0);

        next_ms
    }

    /// Apply `elapsed_ms` to the `i`-th timer.
    fn step(&mut self, i: usize, elapsed_ms: Time32) {
        let timer_cb = &mut self.slots[i];

        if timer_cb.state != TimerState::Running || timer_cb.armed_in_pass {
            return;
        }

        // An expiration awaiting its resolution must not be charged again
        if timer_cb.countdown_ms == 0 && elapsed_ms != 0 {
            return;
        }

        // The hardware overflows no later than the nearest expiration, so
        // `elapsed_ms` normally doesn't exceed the countdown. An overdue
        // interrupt is treated as an expiration.
        timer_cb.countdown_ms = timer_cb.countdown_ms.saturating_sub(elapsed_ms);

        if timer_cb.countdown_ms != 0 {
            return;
        }

        let handle = timer_cb.handle();
        let callback = timer_cb.callback;
        log::debug!("{handle:?} expired");

        // Call the callback function. `self` is handed over to the callback,
        // so `timer_cb` must be fetched again afterwards.
        if let Some(callback) = callback {
            callback(self, handle);
        }

        let timer_cb = &mut self.slots[i];

        // The callback may have stopped, destroyed, or restarted the timer.
        // Respect the callback's decision in that case.
        if timer_cb.state != TimerState::Running
            || timer_cb.armed_in_pass
            || timer_cb.countdown_ms != 0
        {
            return;
        }

        if timer_cb.repeat {
            timer_cb.countdown_ms = timer_cb.reload_ms - 1;
        } else {
            timer_cb.stop();
        }
    }

    /// Reprogram the hardware to overflow in `next_ms` milliseconds, or stop it
    /// if `next_ms` is [`STOPPED_COUNTDOWN`].
    fn reschedule(&mut self, next_ms: Time32) {
        if next_ms == STOPPED_COUNTDOWN {
            log::debug!("reschedule: no running timers; stopping the hardware timer");
            self.hw.stop();
            return;
        }

        let reload_ms = next_ms.min(self.max_reload_ms);
        log::debug!("reschedule: next overflow in {reload_ms} ms");

        self.hw.set_reload_ms(reload_ms);
        self.hw.start();
    }

    /// Get the time until the nearest expiration among the running timers,
    /// without charging any elapsed time. Returns `None` if no timers are
    /// running.
    pub fn next_expiry_ms(&self) -> Option<u32> {
        self.slots
            .iter()
            .filter(|timer_cb| timer_cb.state == TimerState::Running)
            .map(|timer_cb| timer_cb.countdown_ms)
            .min()
    }

    /// Get the number of running timers.
    pub fn running_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|timer_cb| timer_cb.state == TimerState::Running)
            .count()
    }
}
