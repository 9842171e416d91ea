//! Calculates the register values for a peripheral counting in milliseconds.
use core::fmt;
use num_rational::Ratio;
use soft_timer::MAX_RELOAD_LIMIT;

/// The parameters of a hardware timer peripheral.
///
/// It can be passed to [`PrescalerCfg::new`] to construct [`PrescalerCfg`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PrescalerOptions {
    /// The numerator of the peripheral's input clock frequency (Hz).
    pub hw_freq_num: u64,
    /// The denominator of the peripheral's input clock frequency (Hz).
    pub hw_freq_denom: u64,
    /// The width of the prescaler register, measured in bits.
    pub prescaler_bits: u32,
    /// The width of the counter and reload registers, measured in bits.
    pub counter_bits: u32,
}

impl PrescalerOptions {
    /// Construct `PrescalerOptions` for an integral input clock frequency and
    /// a 16-bit prescaler register.
    pub const fn new(hw_freq: u64, counter_bits: u32) -> Self {
        Self {
            hw_freq_num: hw_freq,
            hw_freq_denom: 1,
            prescaler_bits: 16,
            counter_bits,
        }
    }
}

/// Error type for [`PrescalerCfg::new`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CfgError {
    /// The numerator of the clock frequency is zero.
    FreqNumZero,
    /// The denominator of the clock frequency is zero.
    FreqDenomZero,
    /// The clock frequency is not an integral multiple of 1 kHz.
    FreqNotMultipleOfKhz,
    /// The prescaler value does not fit in the prescaler register.
    PrescalerOverflow,
    /// The prescaler register width is not in range `1..=32`.
    PrescalerBitsOutOfRange,
    /// The counter width is not in range `1..=32`.
    CounterBitsOutOfRange,
}

impl CfgError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FreqNumZero => "the numerator of the clock frequency must not be zero",
            Self::FreqDenomZero => "the denominator of the clock frequency must not be zero",
            Self::FreqNotMultipleOfKhz => {
                "the clock frequency must be an integral multiple of 1 kHz"
            }
            Self::PrescalerOverflow => {
                "the clock frequency is too high and \
                the prescaler value does not fit in the prescaler register"
            }
            Self::PrescalerBitsOutOfRange => "the prescaler width must be in range `1..=32`",
            Self::CounterBitsOutOfRange => "the counter width must be in range `1..=32`",
        }
    }

    pub const fn panic(self) -> ! {
        panic!("{}", self.as_str());
    }
}

impl fmt::Display for CfgError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The precomputed register values that make a peripheral count whole
/// milliseconds.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PrescalerCfg {
    /// The value for the prescaler register. The counter advances once every
    /// `prescaler + 1` input clock cycles.
    prescaler: u32,
    /// The largest reload value the counter can hold, capped at
    /// [`MAX_RELOAD_LIMIT`].
    max_reload_ms: u32,
}

impl PrescalerCfg {
    /// Construct a `PrescalerCfg`.
    pub const fn new(
        PrescalerOptions {
            hw_freq_num: freq_num,
            hw_freq_denom: freq_denom,
            prescaler_bits,
            counter_bits,
        }: PrescalerOptions,
    ) -> Result<Self, CfgError> {
        if freq_denom == 0 {
            return Err(CfgError::FreqDenomZero);
        } else if freq_num == 0 {
            return Err(CfgError::FreqNumZero);
        } else if prescaler_bits == 0 || prescaler_bits > 32 {
            return Err(CfgError::PrescalerBitsOutOfRange);
        } else if counter_bits == 0 || counter_bits > 32 {
            return Err(CfgError::CounterBitsOutOfRange);
        }

        // `cycles_per_ms = freq_num / freq_denom / 1000`
        // `0 < cycles_per_ms.numer() <= 0xffff_ffff_ffff_ffff`
        // `0 < cycles_per_ms.denom() <= 0x3e7_ffff_ffff_ffff_fc18`
        let cycles_per_ms = Ratio::new_raw(freq_num as u128, freq_denom as u128 * 1000);

        if *cycles_per_ms.numer() % *cycles_per_ms.denom() != 0 {
            return Err(CfgError::FreqNotMultipleOfKhz);
        }

        // `1 <= cycles_per_ms <= 0xffff_ffff_ffff_ffff`
        let cycles_per_ms = *cycles_per_ms.numer() / *cycles_per_ms.denom();
        let prescaler = cycles_per_ms - 1;
        if prescaler >= 1u128 << prescaler_bits {
            return Err(CfgError::PrescalerOverflow);
        }

        let counter_max = (1u64 << counter_bits) - 1;
        let max_reload_ms = if counter_max > MAX_RELOAD_LIMIT as u64 {
            MAX_RELOAD_LIMIT
        } else {
            counter_max as u32
        };

        Ok(Self {
            prescaler: prescaler as u32,
            max_reload_ms,
        })
    }

    /// Get the value for the prescaler register.
    pub const fn prescaler(&self) -> u32 {
        self.prescaler
    }

    /// Get the number of input clock cycles per millisecond.
    pub const fn hw_cycles_per_ms(&self) -> u64 {
        self.prescaler as u64 + 1
    }

    /// Get the maximum reload value to pass to [`soft_timer::SoftTimers::new`].
    pub const fn max_reload_ms(&self) -> u32 {
        self.max_reload_ms
    }
}
