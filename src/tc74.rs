//! TC74 digital air-temperature sensor on the I2C bus.
//!
//! The sensor holds whole degrees Celsius, two's complement, in a single
//! register. Transfer shape: write the register index, repeated start,
//! read one byte.

use embedded_hal::i2c::I2c;

/// Factory-programmed bus address of the TC74A2 variant.
pub const DEFAULT_ADDRESS: u8 = 0x4a;

const TEMPERATURE_REGISTER: u8 = 0x00;

/// One TC74 on an I2C bus.
pub struct Tc74<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Tc74<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Tc74 { i2c, address }
    }

    /// Current air temperature in whole degrees Celsius.
    pub fn read_temperature(&mut self) -> Result<i16, I2C::Error> {
        let mut raw = [0u8; 1];
        self.i2c
            .write_read(self.address, &[TEMPERATURE_REGISTER], &mut raw)?;
        Ok(i16::from(raw[0] as i8))
    }

    /// Give the bus back.
    pub fn free(self) -> I2C {
        self.i2c
    }
}
