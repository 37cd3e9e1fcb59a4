//! Soil probes: DS18B20-family temperature devices on the shared bus.
//!
//! Probes are enumerated once at startup with the ROM search and then
//! addressed individually. A conversion is started explicitly and read
//! back after the conversion time has passed; the caller owns that
//! pacing, typically one probe per control-loop cycle.

use byteorder::{ByteOrder, LittleEndian};
use embedded_hal::delay::DelayNs;
use heapless::Vec;

use crate::address::Address;
use crate::bus::Bus;
use crate::command::Command;
use crate::crc::crc8;
use crate::error::Error;
use crate::search::Search;
use crate::wire::BusPin;

/// ROM family code of the DS18B20 temperature sensor.
pub const FAMILY_CODE: u8 = 0x28;

/// Worst-case conversion time at the power-on 12-bit resolution.
pub const CONVERSION_TIME_MS: u16 = 750;

/// Temperature probes identified on one bus, at most `N` of them.
#[derive(Debug, Default)]
pub struct SoilProbes<const N: usize> {
    addresses: Vec<Address, N>,
}

impl<const N: usize> SoilProbes<N> {
    /// Walk the bus and keep every temperature-family device found.
    ///
    /// An empty or faulted bus yields an empty set, not an error; the
    /// caller may re-run discovery on a later cycle.
    pub fn discover<P: BusPin>(
        bus: &mut Bus<P>,
        delay: &mut impl DelayNs,
    ) -> Result<Self, P::Error> {
        let mut search = Search::new();
        let mut addresses: Vec<Address, N> = Vec::new();

        let mut found = bus.first(&mut search, delay)?;
        while let Some(address) = found {
            if address.family_code() == FAMILY_CODE && addresses.push(address).is_err() {
                break; // list full
            }
            found = bus.next(&mut search, delay)?;
        }

        #[cfg(feature = "log")]
        log::info!("soil: discovered {} probe(s)", addresses.len());

        Ok(SoilProbes { addresses })
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Addresses in discovery order, for reporting.
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Kick off a temperature conversion on one probe.
    pub fn start_conversion<P: BusPin>(
        &self,
        index: usize,
        bus: &mut Bus<P>,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<P::Error>> {
        let address = *self.addresses.get(index).ok_or(Error::NoSuchProbe)?;
        if !bus.reset(delay)? {
            return Err(Error::NoPresence);
        }
        bus.select(delay, &address)?;
        bus.write_byte(delay, Command::ConvertTemp.code())?;
        Ok(())
    }

    /// Read the most recent conversion result, in degrees Celsius.
    pub fn read_temperature<P: BusPin>(
        &self,
        index: usize,
        bus: &mut Bus<P>,
        delay: &mut impl DelayNs,
    ) -> Result<f32, Error<P::Error>> {
        let address = *self.addresses.get(index).ok_or(Error::NoSuchProbe)?;
        if !bus.reset(delay)? {
            return Err(Error::NoPresence);
        }
        bus.select(delay, &address)?;
        bus.write_byte(delay, Command::ReadScratchpad.code())?;

        let mut data = [0u8; 9];
        for byte in data.iter_mut() {
            *byte = bus.read_byte(delay)?;
        }

        let computed = crc8(&data[..8]);
        if computed != data[8] {
            return Err(Error::CrcMismatch(computed, data[8]));
        }

        let raw = LittleEndian::read_i16(&data[..2]);
        Ok(f32::from(raw) / 16.0)
    }
}
