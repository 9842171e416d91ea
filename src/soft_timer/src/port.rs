//! The interfaces between the engine and the hardware it runs on.

/// A single hardware timer peripheral that counts whole milliseconds and
/// raises an interrupt when its counter reaches the reload (overflow)
/// threshold.
///
/// The engine owns exactly one `HardTimer` and reprograms it after every
/// update pass. Implementations are thin register shims; they must not call
/// back into the engine. The interrupt handler of the peripheral is expected to
/// clear the peripheral's interrupt flag and then call
/// [`SoftTimers::on_period_elapsed`].
///
/// [`SoftTimers::on_period_elapsed`]: crate::SoftTimers::on_period_elapsed
pub trait HardTimer {
    /// Configure the peripheral for millisecond resolution, clear any pending
    /// interrupt flag, and program `max_reload_ms` as the initial reload
    /// value.
    ///
    /// Called exactly once, when the engine is first constructed.
    /// `max_reload_ms` is already capped at [`MAX_RELOAD_LIMIT`].
    fn init(&mut self, max_reload_ms: u32);

    /// Reset the counter to zero and start counting with the overflow
    /// interrupt enabled.
    fn start(&mut self);

    /// Disable the overflow interrupt and reset the counter to zero.
    fn stop(&mut self);

    /// Get the current counter value, i.e., the number of milliseconds
    /// elapsed since the last [`start`](Self::start).
    fn elapsed_ms(&self) -> u32;

    /// Get the current reload value in milliseconds.
    fn reload_ms(&self) -> u32;

    /// Set the reload value in milliseconds. The engine never passes a value
    /// greater than the `max_reload_ms` it was configured with.
    fn set_reload_ms(&mut self, reload_ms: u32);
}

/// The upper bound of any reload value. `u32::MAX` is reserved as the
/// countdown value of timers that are not running.
pub const MAX_RELOAD_LIMIT: u32 = u32::MAX - 1;

/// Masks the timer interrupt to give [`SharedSoftTimers`] exclusive access to
/// the engine.
///
/// This is typically implemented on a zero-sized "traits" type. The lock only
/// needs to exclude the one interrupt handler that calls into the engine; a
/// global interrupt disable is a valid but coarser implementation.
///
/// # Safety
///
/// While the lock is active, the timer interrupt handler must not run. At most
/// one lock can be active at a time per implementing type.
///
/// [`SharedSoftTimers`]: crate::SharedSoftTimers
pub unsafe trait PortIrqLock: Sized + 'static {
    /// Mask the timer interrupt if it's not masked by the engine already.
    /// Return `true` iff the lock was acquired by this call.
    ///
    /// # Safety
    ///
    /// Only meant to be called by the engine.
    unsafe fn try_enter_irq_lock() -> bool;

    /// Unmask the timer interrupt.
    ///
    /// # Safety
    ///
    /// Only meant to be called by the engine. The lock must be active.
    unsafe fn leave_irq_lock();

    /// Return `true` iff the lock is currently active.
    fn is_irq_lock_active() -> bool;
}
