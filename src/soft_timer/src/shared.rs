//! An engine shared between foreground code and the timer interrupt handler
use core::fmt;

use crate::{
    error::{AccessError, BadContextError},
    klock::{lock_irq, IrqLockCell},
    HardTimer, PortIrqLock, SoftTimers,
};

/// A [`SoftTimers`] that can be placed in a `static` and accessed from both
/// foreground code and the timer interrupt handler.
///
/// Every access masks the timer interrupt through `Traits` for its whole
/// duration, so the interrupt handler never observes a half-updated pool.
/// Timer callbacks run inside that critical section and receive the engine
/// directly; they must not access the `SharedSoftTimers` again (doing so fails
/// with [`AccessError::BadContext`]).
///
/// ```rust,ignore
/// static TIMERS: SharedSoftTimers<IrqTraits, Tim2, 10> = SharedSoftTimers::new();
///
/// fn main() {
///     TIMERS.init(Tim2::take(), 0xffff).unwrap();
///     let blink = TIMERS.with(|t| t.create()).unwrap().unwrap();
///     /* ... */
/// }
///
/// #[interrupt]
/// fn TIM2() {
///     Tim2::clear_update_flag();
///     TIMERS.handle_period_elapsed().unwrap();
/// }
/// ```
pub struct SharedSoftTimers<Traits, H, const N: usize> {
    inner: IrqLockCell<Traits, Option<SoftTimers<H, N>>>,
}

impl<Traits, H, const N: usize> SharedSoftTimers<Traits, H, N> {
    /// Construct an uninitialized `SharedSoftTimers`.
    pub const fn new() -> Self {
        Self {
            inner: IrqLockCell::new(None),
        }
    }
}

impl<Traits: PortIrqLock, H: HardTimer, const N: usize> SharedSoftTimers<Traits, H, N> {
    /// Initialize the engine with the hardware timer `hw`.
    ///
    /// The first call constructs the engine ([`SoftTimers::new`]). Subsequent
    /// calls only rebind the hardware and update the maximum reload value
    /// ([`SoftTimers::init`]), returning the previously bound hardware timer;
    /// running timers are unaffected.
    pub fn init(&self, hw: H, max_reload_ms: u32) -> Result<Option<H>, BadContextError> {
        let mut lock = lock_irq::<Traits>()?;
        let engine = self.inner.write(&mut *lock);

        if let Some(timers) = engine {
            return Ok(Some(timers.init(hw, max_reload_ms)));
        }

        *engine = Some(SoftTimers::new(hw, max_reload_ms));
        Ok(None)
    }

    /// Return `true` iff [`init`](Self::init) has been called.
    pub fn is_initialized(&self) -> Result<bool, BadContextError> {
        let lock = lock_irq::<Traits>()?;
        Ok(self.inner.read(&*lock).is_some())
    }

    /// Call the given closure with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut SoftTimers<H, N>) -> R) -> Result<R, AccessError> {
        let mut lock = lock_irq::<Traits>()?;
        let timers = self
            .inner
            .write(&mut *lock)
            .as_mut()
            .ok_or(AccessError::NotInitialized)?;
        Ok(f(timers))
    }

    /// The entry point for the timer interrupt handler. Equivalent to
    /// `self.with(SoftTimers::on_period_elapsed)`.
    #[inline]
    pub fn handle_period_elapsed(&self) -> Result<(), AccessError> {
        self.with(SoftTimers::on_period_elapsed)
    }
}

impl<Traits, H, const N: usize> Default for SharedSoftTimers<Traits, H, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Traits: PortIrqLock, H: fmt::Debug, const N: usize> fmt::Debug
    for SharedSoftTimers<Traits, H, N>
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SharedSoftTimers")
            .field("inner", &self.inner)
            .finish()
    }
}
