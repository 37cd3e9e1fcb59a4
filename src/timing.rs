//! Bus time slots, expressed in protocol ticks of a quarter microsecond.

use embedded_hal::delay::DelayNs;

/// Ticks per microsecond; the protocol's base unit is 0.25 us.
pub const TICKS_PER_US: u16 = 4;

/// Slot timing profile for one bus speed.
///
/// The letters in the field docs follow the Maxim application note 126
/// naming. All values are in ticks and pre-scaled by [`TICKS_PER_US`], so
/// the floor division in [`tick_delay`] loses nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// `A`: low time starting a write-1 slot and a read slot.
    pub write_one_low: u16,
    /// `B`: write-1 slot completion and recovery.
    pub write_one_rest: u16,
    /// `C`: low time of a write-0 slot.
    pub write_zero_low: u16,
    /// `D`: write-0 slot recovery.
    pub write_zero_rest: u16,
    /// `E`: release-to-sample time of a read slot.
    pub read_sample: u16,
    /// `F`: read slot completion and recovery.
    pub read_rest: u16,
    /// `G`: idle time before a reset pulse.
    pub reset_idle: u16,
    /// `H`: reset pulse hold time.
    pub reset_low: u16,
    /// `I`: release-to-sample time of the presence window.
    pub presence_sample: u16,
    /// `J`: reset sequence recovery.
    pub reset_rest: u16,
}

impl Timing {
    /// Standard speed. Overdrive is not supported; the delay resolution
    /// of the tick primitive is too coarse for it.
    pub const STANDARD: Timing = Timing {
        write_one_low: 6 * TICKS_PER_US,
        write_one_rest: 64 * TICKS_PER_US,
        write_zero_low: 60 * TICKS_PER_US,
        write_zero_rest: 10 * TICKS_PER_US,
        read_sample: 9 * TICKS_PER_US,
        read_rest: 55 * TICKS_PER_US,
        reset_idle: 0,
        reset_low: 480 * TICKS_PER_US,
        presence_sample: 70 * TICKS_PER_US,
        reset_rest: 410 * TICKS_PER_US,
    };
}

impl Default for Timing {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Block for `ticks * 0.25` microseconds.
#[inline]
pub(crate) fn tick_delay(delay: &mut impl DelayNs, ticks: u16) {
    delay.delay_us(u32::from(ticks / TICKS_PER_US));
}
