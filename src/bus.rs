//! Bit-banged master for one shared data line.
//!
//! All operations block the calling context for the full slot time and
//! assume exclusive, non-reentrant access to the line. A non-responding
//! device shows up as a missing presence pulse or a CRC failure in the
//! layers above, never as a hang.

use embedded_hal::delay::DelayNs;

use crate::address::Address;
use crate::command::Command;
use crate::timing::{tick_delay, Timing};
use crate::wire::BusPin;

/// Bus master owning the line and its timing profile.
pub struct Bus<P: BusPin> {
    pin: P,
    timing: Timing,
}

impl<P: BusPin> Bus<P> {
    pub fn new(pin: P) -> Self {
        Self::with_timing(pin, Timing::STANDARD)
    }

    pub fn with_timing(pin: P, timing: Timing) -> Self {
        Bus { pin, timing }
    }

    /// Give the pin back, e.g. to reconfigure it.
    pub fn free(self) -> P {
        self.pin
    }

    /// Generate a reset pulse and listen for a presence pulse.
    ///
    /// Returns `true` iff at least one device pulled the line low during
    /// the presence window. The raw sample is low-active and is inverted
    /// here.
    pub fn reset(&mut self, delay: &mut impl DelayNs) -> Result<bool, P::Error> {
        let t = self.timing;

        tick_delay(delay, t.reset_idle);
        self.pin.set_low()?;
        tick_delay(delay, t.reset_low);
        self.pin.set_high()?;
        tick_delay(delay, t.presence_sample);
        let sampled = self.pin.is_high()?;
        tick_delay(delay, t.reset_rest);

        Ok(!sampled)
    }

    /// Send a single bit. The pulse width encodes the value.
    pub fn write_bit(&mut self, delay: &mut impl DelayNs, bit: bool) -> Result<(), P::Error> {
        let t = self.timing;

        if bit {
            self.pin.set_low()?;
            tick_delay(delay, t.write_one_low);
            self.pin.set_high()?;
            tick_delay(delay, t.write_one_rest);
        } else {
            self.pin.set_low()?;
            tick_delay(delay, t.write_zero_low);
            self.pin.set_high()?;
            tick_delay(delay, t.write_zero_rest);
        }
        Ok(())
    }

    /// Open a read slot and sample the line.
    pub fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool, P::Error> {
        let t = self.timing;

        self.pin.set_low()?;
        tick_delay(delay, t.write_one_low);
        self.pin.set_high()?;
        tick_delay(delay, t.read_sample);
        let bit = self.pin.is_high()?;
        tick_delay(delay, t.read_rest);

        Ok(bit)
    }

    /// Send one byte, least significant bit first.
    pub fn write_byte(&mut self, delay: &mut impl DelayNs, byte: u8) -> Result<(), P::Error> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit(delay, byte & 0x01 != 0)?;
            byte >>= 1;
        }
        Ok(())
    }

    /// Read one byte, least significant bit first.
    pub fn read_byte(&mut self, delay: &mut impl DelayNs) -> Result<u8, P::Error> {
        let mut byte = 0u8;
        for _ in 0..8 {
            byte >>= 1;
            if self.read_bit(delay)? {
                byte |= 0x80;
            }
        }
        Ok(byte)
    }

    /// Send a byte while sensing the line: a 1 bit opens a read slot, a
    /// 0 bit is written out. Returns the composite sampled byte.
    ///
    /// Sending `0xff` is equivalent to [`read_byte`](Self::read_byte).
    pub fn touch_byte(&mut self, delay: &mut impl DelayNs, byte: u8) -> Result<u8, P::Error> {
        let mut byte = byte;
        let mut sampled = 0u8;
        for _ in 0..8 {
            sampled >>= 1;
            if byte & 0x01 != 0 {
                if self.read_bit(delay)? {
                    sampled |= 0x80;
                }
            } else {
                self.write_bit(delay, false)?;
            }
            byte >>= 1;
        }
        Ok(sampled)
    }

    /// [`touch_byte`](Self::touch_byte) over a whole buffer, in place.
    pub fn touch_block(&mut self, delay: &mut impl DelayNs, data: &mut [u8]) -> Result<(), P::Error> {
        for byte in data.iter_mut() {
            *byte = self.touch_byte(delay, *byte)?;
        }
        Ok(())
    }

    /// Address one device by its ROM code.
    pub fn select(&mut self, delay: &mut impl DelayNs, address: &Address) -> Result<(), P::Error> {
        self.write_byte(delay, Command::MatchRom.code())?;
        for byte in address.as_bytes() {
            self.write_byte(delay, *byte)?;
        }
        Ok(())
    }

    /// Address the bus without selecting a device.
    pub fn skip(&mut self, delay: &mut impl DelayNs) -> Result<(), P::Error> {
        self.write_byte(delay, Command::SkipRom.code())
    }
}
