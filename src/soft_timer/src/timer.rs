//! Timers
use core::fmt;

use crate::{
    error::TimerError, sched::Time32, sched::STOPPED_COUNTDOWN, HardTimer, SoftTimers,
    MIN_RELOAD_MS,
};

/// An opaque reference to a timer in a [`SoftTimers`] pool.
///
/// A handle is just the index of the timer's slot. It's validated by
/// bounds-checking on every use, so a handle fabricated by
/// [`TimerHandle::from_id`] or carried over from another pool is rejected with
/// [`TimerError::InvalidParameter`] rather than causing undefined behavior.
/// A handle whose timer was destroyed refers to a free slot and is rejected
/// with [`TimerError::InvalidState`] until the slot is handed out again.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u8);

impl TimerHandle {
    /// Construct a `TimerHandle` from a raw slot index.
    #[inline]
    pub const fn from_id(id: u8) -> Self {
        Self(id)
    }

    /// Get the raw slot index.
    #[inline]
    pub const fn id(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("TimerHandle").field(&self.0).finish()
    }
}

/// Expiration callback function.
///
/// The callback function is called synchronously by an update pass (the
/// timer interrupt or a foreground [`start`]/[`stop`]) when the associated
/// timer's countdown reaches zero. It receives the engine and the handle of
/// the expiring timer and may operate on any timer in the pool, including the
/// expiring one:
///
///  - Stopping the expiring timer prevents a repeating timer from re-arming.
///  - Re-starting the expiring timer (after stopping it) arms it anew; the
///    callback's decision overrides the usual re-arm/stop step.
///  - Timers started by a callback begin counting from the current update,
///    and the hardware is reprogrammed once the whole pass completes.
///
/// Calling [`SoftTimers::on_period_elapsed`] from a callback has no effect.
///
/// The callback function runs in whichever context triggered the pass. It
/// should return quickly.
///
/// [`start`]: SoftTimers::start
/// [`stop`]: SoftTimers::stop
pub type TimerFn<H, const N: usize> = fn(&mut SoftTimers<H, N>, TimerHandle);

/// The state of a timer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerState {
    /// Not allocated.
    Free,
    /// Allocated, not running.
    Stopped,
    /// Allocated, counting down.
    Running,
}

/// *Timer control block* - the state data of a timer slot.
pub(crate) struct TimerCb<H, const N: usize> {
    pub(crate) state: TimerState,

    /// The index of this control block in the pool. Never changes.
    pub(crate) id: u8,

    /// The configured period. `0` means the timer was never configured by
    /// [`SoftTimers::set`].
    pub(crate) reload_ms: Time32,

    /// The remaining time until expiration. [`STOPPED_COUNTDOWN`] unless
    /// the timer is running.
    pub(crate) countdown_ms: Time32,

    pub(crate) repeat: bool,

    pub(crate) callback: Option<TimerFn<H, N>>,

    /// `true` iff the timer was started by a callback during the update pass
    /// currently in progress. Such a timer is excluded from the rest of the
    /// pass.
    pub(crate) armed_in_pass: bool,
}

impl<H, const N: usize> Clone for TimerCb<H, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H, const N: usize> Copy for TimerCb<H, N> {}

impl<H, const N: usize> fmt::Debug for TimerCb<H, N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TimerCb")
            .field("state", &self.state)
            .field("id", &self.id)
            .field("reload_ms", &self.reload_ms)
            .field("countdown_ms", &self.countdown_ms)
            .field("repeat", &self.repeat)
            .field("callback", &self.callback.map(|x| x as *const ()))
            .field("armed_in_pass", &self.armed_in_pass)
            .finish()
    }
}

impl<H, const N: usize> TimerCb<H, N> {
    /// Construct a free control block for the slot `id`.
    pub(crate) const fn new(id: u8) -> Self {
        Self {
            state: TimerState::Free,
            id,
            reload_ms: 0,
            countdown_ms: STOPPED_COUNTDOWN,
            repeat: false,
            callback: None,
            armed_in_pass: false,
        }
    }

    #[inline]
    pub(crate) fn handle(&self) -> TimerHandle {
        TimerHandle(self.id)
    }

    /// Transition to the Stopped state, discarding the countdown and the
    /// repeat setting.
    pub(crate) fn stop(&mut self) {
        self.state = TimerState::Stopped;
        self.countdown_ms = STOPPED_COUNTDOWN;
        self.repeat = false;
    }

    /// Transition to the Running state with a full period.
    ///
    /// The countdown is one millisecond short of the period. The elapsed time
    /// reported by the hardware is charged at the next tick boundary, which
    /// accounts for the missing millisecond.
    pub(crate) fn arm(&mut self) {
        debug_assert!(self.reload_ms >= MIN_RELOAD_MS);
        self.state = TimerState::Running;
        self.countdown_ms = self.reload_ms - 1;
    }
}

impl<H: HardTimer, const N: usize> SoftTimers<H, N> {
    /// Get the control block for `handle`.
    #[inline]
    fn timer_cb(&self, handle: TimerHandle) -> Result<&TimerCb<H, N>, TimerError> {
        self.slots
            .get(handle.0 as usize)
            .ok_or(TimerError::InvalidParameter)
    }

    /// Get the control block for `handle`.
    #[inline]
    fn timer_cb_mut(&mut self, handle: TimerHandle) -> Result<&mut TimerCb<H, N>, TimerError> {
        self.slots
            .get_mut(handle.0 as usize)
            .ok_or(TimerError::InvalidParameter)
    }

    /// Allocate a timer from the pool.
    ///
    /// The lowest-numbered free slot is chosen. The new timer is in the
    /// Stopped state and unconfigured; it must be configured by [`set`]
    /// before it can be started.
    ///
    /// Returns `None` if every slot is in use.
    ///
    /// [`set`]: Self::set
    pub fn create(&mut self) -> Option<TimerHandle> {
        let Some(timer_cb) = self
            .slots
            .iter_mut()
            .find(|timer_cb| timer_cb.state == TimerState::Free)
        else {
            log::debug!("create: no free timer (capacity = {N})");
            return None;
        };

        timer_cb.state = TimerState::Stopped;
        timer_cb.reload_ms = 0;
        timer_cb.countdown_ms = STOPPED_COUNTDOWN;
        timer_cb.repeat = false;
        timer_cb.callback = None;

        let handle = timer_cb.handle();
        log::trace!("create → {handle:?}");
        Some(handle)
    }

    /// Return a timer to the pool.
    ///
    /// The timer must be stopped. On success, `*handle` is reset to `None` so
    /// that it can't be used again by mistake.
    ///
    /// # Errors
    ///
    ///  - [`InvalidParameter`](TimerError::InvalidParameter): `*handle` is
    ///    `None` or out of range.
    ///  - [`InvalidState`](TimerError::InvalidState): The timer is running or
    ///    already free. A running timer is not stopped by this method.
    ///
    pub fn destroy(&mut self, handle: &mut Option<TimerHandle>) -> Result<(), TimerError> {
        let this = handle.ok_or(TimerError::InvalidParameter)?;
        let timer_cb = self.timer_cb_mut(this)?;

        if timer_cb.state != TimerState::Stopped {
            return Err(TimerError::InvalidState);
        }

        timer_cb.state = TimerState::Free;
        timer_cb.reload_ms = 0;
        timer_cb.callback = None;
        *handle = None;

        log::trace!("destroy({this:?})");
        Ok(())
    }

    /// Configure a stopped timer.
    ///
    /// `reload_ms` is the period in milliseconds and must be in range
    /// `2..=`[`max_reload_ms`](Self::max_reload_ms). If `repeat` is `true`, the
    /// timer re-arms itself after every expiration; otherwise it stops after
    /// the first one. The countdown and the state are not affected.
    ///
    /// # Errors
    ///
    ///  - [`InvalidParameter`](TimerError::InvalidParameter): `handle` is out
    ///    of range, or `reload_ms` is out of range.
    ///  - [`InvalidState`](TimerError::InvalidState): The timer is not in the
    ///    Stopped state.
    ///
    pub fn set(
        &mut self,
        handle: TimerHandle,
        callback: Option<TimerFn<H, N>>,
        reload_ms: u32,
        repeat: bool,
    ) -> Result<(), TimerError> {
        let max_reload_ms = self.max_reload_ms;
        let timer_cb = self.timer_cb_mut(handle)?;

        if reload_ms < MIN_RELOAD_MS || reload_ms > max_reload_ms {
            return Err(TimerError::InvalidParameter);
        }

        if timer_cb.state != TimerState::Stopped {
            return Err(TimerError::InvalidState);
        }

        timer_cb.reload_ms = reload_ms;
        timer_cb.repeat = repeat;
        timer_cb.callback = callback;

        log::trace!("set({handle:?}, reload_ms = {reload_ms}, repeat = {repeat})");
        Ok(())
    }

    /// Start a stopped, configured timer.
    ///
    /// The time elapsed since the last update is charged to the running timers
    /// first (which may expire some of them), then the timer is armed with a
    /// full period and the hardware is reprogrammed for the nearest
    /// expiration.
    ///
    /// # Errors
    ///
    ///  - [`InvalidParameter`](TimerError::InvalidParameter): `handle` is out
    ///    of range.
    ///  - [`InvalidState`](TimerError::InvalidState): The timer is not in the
    ///    Stopped state or has never been configured by [`set`](Self::set).
    ///
    pub fn start(&mut self, handle: TimerHandle) -> Result<(), TimerError> {
        self.expect_startable(handle)?;
        log::trace!("start({handle:?})");

        if self.update_in_progress {
            // Called by a callback. Time is already accounted for, and the
            // enclosing pass will reprogram the hardware.
            let timer_cb = self.timer_cb_mut(handle)?;
            timer_cb.arm();
            timer_cb.armed_in_pass = true;
            return Ok(());
        }

        let elapsed_ms = self.hw.elapsed_ms();
        self.update(elapsed_ms);

        // The callbacks called by `update` might have changed the timer's state
        self.expect_startable(handle)?;
        self.timer_cb_mut(handle)?.arm();

        self.update(0);
        Ok(())
    }

    fn expect_startable(&self, handle: TimerHandle) -> Result<(), TimerError> {
        let timer_cb = self.timer_cb(handle)?;
        if timer_cb.state != TimerState::Stopped || timer_cb.reload_ms < MIN_RELOAD_MS {
            Err(TimerError::InvalidState)
        } else {
            Ok(())
        }
    }

    /// Stop a running timer.
    ///
    /// The repeat setting is cleared; [`set`](Self::set) the timer again to
    /// restart it as a repeating timer. The time elapsed since the last update
    /// is charged to the remaining timers, and the hardware is reprogrammed
    /// (or stopped if nothing is running anymore).
    ///
    /// # Errors
    ///
    ///  - [`InvalidParameter`](TimerError::InvalidParameter): `handle` is out
    ///    of range.
    ///  - [`InvalidState`](TimerError::InvalidState): The timer is not in the
    ///    Running state.
    ///
    pub fn stop(&mut self, handle: TimerHandle) -> Result<(), TimerError> {
        let timer_cb = self.timer_cb_mut(handle)?;

        if timer_cb.state != TimerState::Running {
            return Err(TimerError::InvalidState);
        }

        timer_cb.stop();
        log::trace!("stop({handle:?})");

        if !self.update_in_progress {
            let elapsed_ms = self.hw.elapsed_ms();
            self.update(elapsed_ms);
        }

        Ok(())
    }

    /// Return `true` iff the timer is in the Stopped state, i.e., it's
    /// allocated but not running.
    ///
    /// # Errors
    ///
    ///  - [`InvalidParameter`](TimerError::InvalidParameter): `handle` is out
    ///    of range.
    ///
    pub fn is_stopped(&self, handle: TimerHandle) -> Result<bool, TimerError> {
        Ok(self.timer_cb(handle)?.state == TimerState::Stopped)
    }
}

#[cfg(test)]
mod tests;
