#![doc = include_str!("./lib.md")]
#![deny(unsafe_op_in_unsafe_fn)]
use std::sync::atomic::{AtomicBool, Ordering};

use soft_timer::{AccessError, PortIrqLock, SharedSoftTimers, SoftTimers};

mod sim;

pub use self::sim::SimTimer;

/// Used by `use_irq_lock!`
#[doc(hidden)]
pub extern crate soft_timer;

/// Initialize the logger from the `RUST_LOG` environment variable. Does nothing
/// if a logger is already installed.
pub fn init_logger() {
    let _ = env_logger::try_init();
}

/// The state of a simulated timer interrupt mask, used by
/// [`use_irq_lock!`].
#[derive(Debug)]
pub struct IrqLockState {
    active: AtomicBool,
}

impl IrqLockState {
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }

    pub fn try_enter(&self) -> bool {
        let acquired = self
            .active
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok();
        log::trace!("try_enter_irq_lock → {acquired}");
        acquired
    }

    pub fn leave(&self) {
        log::trace!("leave_irq_lock");
        let was_active = self.active.swap(false, Ordering::Release);
        assert!(was_active, "IRQ lock is not active");
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

impl Default for IrqLockState {
    fn default() -> Self {
        Self::new()
    }
}

/// Define a type implementing [`PortIrqLock`] backed by a simulated interrupt
/// mask.
///
/// ```rust
/// soft_timer_port_std::use_irq_lock!(unsafe struct IrqTraits);
///
/// static TIMERS: soft_timer::SharedSoftTimers<
///     IrqTraits,
///     soft_timer_port_std::SimTimer,
///     10,
/// > = soft_timer::SharedSoftTimers::new();
/// # fn main() {}
/// ```
///
/// # Safety
///
/// The simulated interrupt is only delivered by [`advance_shared`], which
/// honors the mask. Nothing else may call into the engine from another thread
/// while the lock is active.
#[macro_export]
macro_rules! use_irq_lock {
    (unsafe $vis:vis struct $Traits:ident) => {
        $vis struct $Traits;

        const _: () = {
            use $crate::soft_timer::PortIrqLock;
            use $crate::IrqLockState;

            static IRQ_LOCK_STATE: IrqLockState = IrqLockState::new();

            unsafe impl PortIrqLock for $Traits {
                unsafe fn try_enter_irq_lock() -> bool {
                    IRQ_LOCK_STATE.try_enter()
                }

                unsafe fn leave_irq_lock() {
                    IRQ_LOCK_STATE.leave()
                }

                fn is_irq_lock_active() -> bool {
                    IRQ_LOCK_STATE.is_active()
                }
            }
        };
    };
}

/// Let `ms` milliseconds pass in virtual time, calling
/// [`SoftTimers::on_period_elapsed`] on every overflow of the simulated
/// peripheral.
pub fn advance<const N: usize>(timers: &mut SoftTimers<SimTimer, N>, ms: u32) {
    let mut remaining_ms = ms;
    loop {
        let hw = timers.hardware_mut();
        remaining_ms -= hw.run(remaining_ms);

        if hw.take_interrupt() {
            // The interrupt handler
            timers.on_period_elapsed();
        } else if remaining_ms == 0 {
            return;
        }
    }
}

/// Let `ms` milliseconds pass in virtual time, calling
/// [`SharedSoftTimers::handle_period_elapsed`] on every overflow of the
/// simulated peripheral.
///
/// Unlike [`advance`], the engine is only locked while the peripheral is
/// accessed, so foreground code sees the same interleaving as on hardware.
pub fn advance_shared<Traits: PortIrqLock, const N: usize>(
    timers: &SharedSoftTimers<Traits, SimTimer, N>,
    ms: u32,
) -> Result<(), AccessError> {
    let mut remaining_ms = ms;
    loop {
        let interrupted = timers.with(|timers| {
            let hw = timers.hardware_mut();
            remaining_ms -= hw.run(remaining_ms);
            hw.take_interrupt()
        })?;

        if interrupted {
            timers.handle_period_elapsed()?;
        } else if remaining_ms == 0 {
            return Ok(());
        }
    }
}
