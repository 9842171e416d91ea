#![doc = include_str!("./lib.md")]
#![cfg_attr(not(test), no_std)] // Link `std` only when building a test (`cfg(test)`)
#![deny(unsafe_op_in_unsafe_fn)]
use core::{fmt, mem};

mod error;
mod klock;
mod port;
mod sched;
mod shared;
mod timer;

#[cfg(test)]
mod test_utils;

pub use self::{
    error::{AccessError, BadContextError, ResultCode, TimerError},
    port::{HardTimer, PortIrqLock, MAX_RELOAD_LIMIT},
    shared::SharedSoftTimers,
    timer::{TimerFn, TimerHandle},
};

use self::timer::TimerCb;

/// The maximum number of timers in one pool. Timer IDs are 8-bit.
pub const MAX_CAPACITY: usize = 256;

/// The minimum reload value accepted by [`SoftTimers::set`].
pub const MIN_RELOAD_MS: u32 = 2;

/// A pool of `N` software timers sharing one hardware timer `H`.
///
/// All operations take `&mut self` and run to completion in time bounded by
/// `N`. To share the engine with an interrupt handler, wrap it with
/// [`SharedSoftTimers`].
pub struct SoftTimers<H, const N: usize> {
    /// The bound hardware timer.
    hw: H,

    /// The upper bound of reload values, capped at [`MAX_RELOAD_LIMIT`].
    max_reload_ms: u32,

    slots: [TimerCb<H, N>; N],

    /// Flag indicating whether an update pass is in progress or not.
    update_in_progress: bool,
}

impl<H, const N: usize> SoftTimers<H, N> {
    const CAPACITY_CHECK: () = assert!(
        N <= MAX_CAPACITY,
        "the capacity of a timer pool must not exceed 256"
    );

    /// Get the number of timer slots.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Get the upper bound of reload values.
    #[inline]
    pub fn max_reload_ms(&self) -> u32 {
        self.max_reload_ms
    }

    /// Get a reference to the bound hardware timer.
    #[inline]
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Get a mutable reference to the bound hardware timer.
    ///
    /// Reprogramming the hardware behind the engine's back desynchronizes
    /// the engine until the next update pass.
    #[inline]
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }
}

impl<H: HardTimer, const N: usize> SoftTimers<H, N> {
    /// Construct an engine with every slot free, and initialize `hw` with the
    /// maximum reload value `max_reload_ms` (capped at [`MAX_RELOAD_LIMIT`]).
    pub fn new(mut hw: H, max_reload_ms: u32) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_CHECK;

        let max_reload_ms = max_reload_ms.min(MAX_RELOAD_LIMIT);
        hw.init(max_reload_ms);
        log::debug!("new: capacity = {N}, max_reload_ms = {max_reload_ms}");

        Self {
            hw,
            max_reload_ms,
            slots: core::array::from_fn(|i| TimerCb::new(i as u8)),
            update_in_progress: false,
        }
    }

    /// Re-initialize the engine after [`new`](Self::new).
    ///
    /// Only the hardware binding and the maximum reload value are replaced;
    /// timers keep their states, so calling this again by accident doesn't
    /// lose running timers. The hardware is neither initialized nor
    /// reprogrammed. Returns the previously bound hardware timer.
    pub fn init(&mut self, hw: H, max_reload_ms: u32) -> H {
        self.max_reload_ms = max_reload_ms.min(MAX_RELOAD_LIMIT);
        log::debug!("init: rebinding, max_reload_ms = {}", self.max_reload_ms);
        mem::replace(&mut self.hw, hw)
    }
}

impl<H: fmt::Debug, const N: usize> fmt::Debug for SoftTimers<H, N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SoftTimers")
            .field("hw", &self.hw)
            .field("max_reload_ms", &self.max_reload_ms)
            .field("slots", &self.slots)
            .field("update_in_progress", &self.update_in_progress)
            .finish()
    }
}
