//! Engine state locking mechanism
use core::{fmt, ops};
use tokenlock::UnsyncTokenLock;

use crate::{error::BadContextError, PortIrqLock};

pub(crate) struct IrqLockTag<Traits>(Traits);

/// The key that "unlocks" [`IrqLockCell`].
pub(crate) type IrqLockToken<Traits> = tokenlock::UnsyncSingletonToken<IrqLockTag<Traits>>;

/// The keyhole type for [`UnsyncTokenLock`] that can be "unlocked" by
/// [`IrqLockToken`].
pub(crate) type IrqLockKeyhole<Traits> = tokenlock::SingletonTokenId<IrqLockTag<Traits>>;

/// Cell type that can be accessed by [`IrqLockToken`] (which can be obtained
/// by [`lock_irq`]).
pub(crate) struct IrqLockCell<Traits, T: ?Sized>(UnsyncTokenLock<T, IrqLockKeyhole<Traits>>);

impl<Traits, T> IrqLockCell<Traits, T> {
    pub(crate) const fn new(x: T) -> Self {
        Self(UnsyncTokenLock::new(IrqLockKeyhole::new(), x))
    }
}

impl<Traits: PortIrqLock, T: ?Sized> IrqLockCell<Traits, T> {
    /// Return a debug formatting proxy of the cell. The given closure is used
    /// to format the borrowed contents. Note that IRQ Lock is active when the
    /// closure is called.
    pub(crate) fn debug_fmt_with_ref<'a, F: 'a + Fn(&T, &mut fmt::Formatter) -> fmt::Result>(
        &'a self,
        f: F,
    ) -> impl fmt::Debug + 'a {
        struct DebugFmtWithRef<'a, Traits, T: ?Sized, F> {
            cell: &'a IrqLockCell<Traits, T>,
            f: F,
        }

        impl<Traits: PortIrqLock, T: ?Sized, F: Fn(&T, &mut fmt::Formatter) -> fmt::Result>
            fmt::Debug for DebugFmtWithRef<'_, Traits, T, F>
        {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if let Ok(lock) = lock_irq() {
                    f.write_str("IrqLockCell(")?;
                    (self.f)(self.cell.0.read(&*lock), f)?;
                    f.write_str(")")
                } else {
                    f.write_str("IrqLockCell(< locked >)")
                }
            }
        }

        DebugFmtWithRef { cell: self, f }
    }
}

impl<Traits: PortIrqLock, T: fmt::Debug> fmt::Debug for IrqLockCell<Traits, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.debug_fmt_with_ref(|x, f| x.fmt(f)).fmt(f)
    }
}

impl<Traits, T> ops::Deref for IrqLockCell<Traits, T> {
    type Target = UnsyncTokenLock<T, IrqLockKeyhole<Traits>>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Attempt to enter an IRQ Lock state and get an RAII guard.
/// Return `BadContext` if the engine is already in an IRQ Lock state.
pub(crate) fn lock_irq<Traits: PortIrqLock>() -> Result<IrqLockGuard<Traits>, BadContextError> {
    // Safety: `try_enter_irq_lock` is only meant to be called by the engine
    if unsafe { Traits::try_enter_irq_lock() } {
        // Safety: We just entered an IRQ Lock state. This also means there are
        //         no instances of `IrqLockGuard` existing at this point.
        Ok(unsafe { assume_irq_lock() })
    } else {
        log::trace!("lock_irq: already locked");
        Err(BadContextError::BadContext)
    }
}

/// Assume an IRQ Lock state and get `IrqLockGuard`.
///
/// # Safety
///
/// The system must be really in an IRQ Lock state. There must be no instances
/// of `IrqLockGuard` existing at the point of the call.
unsafe fn assume_irq_lock<Traits: PortIrqLock>() -> IrqLockGuard<Traits> {
    debug_assert!(Traits::is_irq_lock_active());

    IrqLockGuard {
        // Safety: There are no other instances of `IrqLockToken`; this is
        //         upheld by the caller.
        token: unsafe { IrqLockToken::new_unchecked() },
    }
}

/// RAII guard for an IRQ Lock state.
///
/// [`IrqLockToken`] can be borrowed from this type.
pub(crate) struct IrqLockGuard<Traits: PortIrqLock> {
    token: IrqLockToken<Traits>,
}

impl<Traits: PortIrqLock> Drop for IrqLockGuard<Traits> {
    fn drop(&mut self) {
        // Safety: IRQ Lock is currently active, and it's us (the engine) who
        // are currently controlling the IRQ Lock state
        unsafe {
            Traits::leave_irq_lock();
        }
    }
}

impl<Traits: PortIrqLock> ops::Deref for IrqLockGuard<Traits> {
    type Target = IrqLockToken<Traits>;
    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

impl<Traits: PortIrqLock> ops::DerefMut for IrqLockGuard<Traits> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.token
    }
}
