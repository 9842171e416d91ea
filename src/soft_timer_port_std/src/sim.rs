//! Simulated timer peripheral
use soft_timer::HardTimer;
use soft_timer_portkit::prescaler::PrescalerCfg;

/// A simulated up-counting timer peripheral with a prescaler, an auto-reload
/// register, and an update (overflow) interrupt.
///
/// The counter advances once per millisecond of virtual time while enabled.
/// When it reaches the reload value, it wraps around to zero and raises the
/// update interrupt flag. Virtual time is driven by [`crate::advance`] or
/// [`crate::advance_shared`].
#[derive(Debug, Clone)]
pub struct SimTimer {
    cfg: PrescalerCfg,

    /// The prescaler register. Written by `init`.
    psc: u32,
    /// The counter register.
    cnt: u32,
    /// The auto-reload register.
    arr: u32,
    /// The counter enable bit.
    counter_enabled: bool,
    /// The update interrupt enable bit.
    irq_enabled: bool,
    /// The update interrupt flag.
    irq_pending: bool,

    /// Virtual time elapsed since the creation of the peripheral.
    now_ms: u64,
    num_overflows: u64,
}

impl SimTimer {
    /// Construct a `SimTimer` clocked as described by `cfg`. The registers are
    /// in their reset state.
    pub const fn new(cfg: PrescalerCfg) -> Self {
        Self {
            cfg,
            psc: 0,
            cnt: 0,
            arr: 0,
            counter_enabled: false,
            irq_enabled: false,
            irq_pending: false,
            now_ms: 0,
            num_overflows: 0,
        }
    }

    /// Get the virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Get the number of overflows so far.
    pub fn num_overflows(&self) -> u64 {
        self.num_overflows
    }

    /// Get the value of the prescaler register.
    pub fn prescaler(&self) -> u32 {
        self.psc
    }

    /// Get the counter enable bit.
    pub fn is_running(&self) -> bool {
        self.counter_enabled
    }

    /// Get the update interrupt enable bit.
    pub fn is_irq_enabled(&self) -> bool {
        self.irq_enabled
    }

    /// Get the update interrupt flag.
    pub fn is_irq_pending(&self) -> bool {
        self.irq_pending
    }

    /// Advance virtual time by up to `ms` milliseconds, stopping early at an
    /// overflow. Returns the number of milliseconds actually advanced.
    pub(crate) fn run(&mut self, ms: u32) -> u32 {
        // A zero reload value stalls the counter
        if !self.counter_enabled || self.arr == 0 {
            self.now_ms += u64::from(ms);
            return ms;
        }

        let until_overflow = self.arr - self.cnt;
        if ms < until_overflow {
            self.cnt += ms;
            self.now_ms += u64::from(ms);
            return ms;
        }

        self.cnt = 0;
        self.irq_pending = true;
        self.now_ms += u64::from(until_overflow);
        self.num_overflows += 1;
        log::trace!("overflow at {} ms", self.now_ms);
        until_overflow
    }

    /// Clear the update interrupt flag and return `true` if the interrupt
    /// should be taken.
    pub(crate) fn take_interrupt(&mut self) -> bool {
        if self.irq_enabled && self.irq_pending {
            self.irq_pending = false;
            true
        } else {
            false
        }
    }
}

impl HardTimer for SimTimer {
    fn init(&mut self, max_reload_ms: u32) {
        if max_reload_ms > self.cfg.max_reload_ms() {
            log::warn!(
                "init: max_reload_ms = {max_reload_ms} exceeds the counter width \
                (max {}); reload values will be truncated",
                self.cfg.max_reload_ms()
            );
        }

        self.psc = self.cfg.prescaler();
        self.arr = max_reload_ms.min(self.cfg.max_reload_ms());
        self.irq_pending = false;
        log::debug!("init: psc = {}, arr = {}", self.psc, self.arr);
    }

    fn start(&mut self) {
        self.cnt = 0;
        self.counter_enabled = true;
        self.irq_enabled = true;
    }

    fn stop(&mut self) {
        self.counter_enabled = false;
        self.irq_enabled = false;
        self.cnt = 0;
    }

    fn elapsed_ms(&self) -> u32 {
        self.cnt
    }

    fn reload_ms(&self) -> u32 {
        self.arr
    }

    fn set_reload_ms(&mut self, reload_ms: u32) {
        self.arr = reload_ms.min(self.cfg.max_reload_ms());
    }
}
