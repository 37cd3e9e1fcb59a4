//! Heating element with thermostat hysteresis.

use embedded_hal::digital::OutputPin;

/// Switched heater behind a digital output.
///
/// Turns on below `on_below_c` and back off above `off_above_c`; inside
/// the dead band it holds its state so the element does not chatter.
pub struct Heater<P: OutputPin> {
    pin: P,
    on_below_c: i16,
    off_above_c: i16,
    active: bool,
}

impl<P: OutputPin> Heater<P> {
    /// Default thresholds suit a tropical terrarium floor.
    pub fn new(pin: P) -> Self {
        Self::with_thresholds(pin, 15, 18)
    }

    pub fn with_thresholds(pin: P, on_below_c: i16, off_above_c: i16) -> Self {
        Heater {
            pin,
            on_below_c,
            off_above_c,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// One thermostat step against the current air temperature.
    pub fn adjust(&mut self, temperature_c: i16) -> Result<(), P::Error> {
        if temperature_c < self.on_below_c && !self.active {
            self.pin.set_high()?;
            self.active = true;
        } else if temperature_c > self.off_above_c && self.active {
            self.pin.set_low()?;
            self.active = false;
        }
        Ok(())
    }

    pub fn free(self) -> P {
        self.pin
    }
}
