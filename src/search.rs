//! ROM discovery on the shared bus.
//!
//! Devices carry no bus addresses up front, so the master enumerates
//! them with the classic binary tree walk (Maxim application note 187):
//! read each address bit and its complement off the wired-AND line,
//! write the chosen direction back so disagreeing devices drop out, and
//! remember the deepest position where 0 was chosen so the next pass can
//! branch the other way. Discovering all N devices costs O(N * 64) bit
//! slots.

use embedded_hal::delay::DelayNs;

use crate::address::Address;
use crate::bus::Bus;
use crate::command::Command;
use crate::crc::crc8_update;
use crate::wire::BusPin;

/// Search progress carried by the caller between passes.
///
/// Reset by [`Bus::first`], advanced in place by every pass, cleared
/// whenever a pass fails or the bus is exhausted. After a bus error the
/// caller restarts from [`Bus::first`]; there is no partial retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    last_discrepancy: u8,
    last_family_discrepancy: u8,
    last_device: bool,
    rom: [u8; Address::BYTES],
}

impl Search {
    pub const fn new() -> Self {
        Search {
            last_discrepancy: 0,
            last_family_discrepancy: 0,
            last_device: false,
            rom: [0; Address::BYTES],
        }
    }

    /// Forget accumulated progress; the next pass starts from scratch.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Deepest bit position where the previous pass chose 0, or 0 when
    /// the last found device closed the tree.
    pub fn last_discrepancy(&self) -> u8 {
        self.last_discrepancy
    }

    /// Like [`last_discrepancy`](Self::last_discrepancy), but within the
    /// family code byte.
    pub fn last_family_discrepancy(&self) -> u8 {
        self.last_family_discrepancy
    }

    /// True once the previous pass returned the final device.
    pub fn is_exhausted(&self) -> bool {
        self.last_device
    }
}

impl Default for Search {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: BusPin> Bus<P> {
    /// Restart discovery and return the first device on the bus.
    pub fn first(
        &mut self,
        search: &mut Search,
        delay: &mut impl DelayNs,
    ) -> Result<Option<Address>, P::Error> {
        search.reset();
        self.search(search, delay)
    }

    /// Continue discovery from the previous pass.
    pub fn next(
        &mut self,
        search: &mut Search,
        delay: &mut impl DelayNs,
    ) -> Result<Option<Address>, P::Error> {
        self.search(search, delay)
    }

    /// One search pass. `Ok(None)` covers both "no more devices" and
    /// recoverable bus errors; either way the state is left reset.
    fn search(
        &mut self,
        state: &mut Search,
        delay: &mut impl DelayNs,
    ) -> Result<Option<Address>, P::Error> {
        let mut id_bit_number: u8 = 1;
        let mut last_zero: u8 = 0;
        let mut rom_byte_number: usize = 0;
        let mut rom_byte_mask: u8 = 0x01;
        let mut found = false;
        let mut crc: u8 = 0;

        if !state.last_device {
            if !self.reset(delay)? {
                // Empty or shorted bus; start over next time.
                state.reset();
                return Ok(None);
            }

            self.write_byte(delay, Command::SearchRom.code())?;

            loop {
                let id_bit = self.read_bit(delay)?;
                let cmp_id_bit = self.read_bit(delay)?;

                // Both high: no device answered this position.
                if id_bit && cmp_id_bit {
                    break;
                }

                let direction = if id_bit != cmp_id_bit {
                    // All remaining devices agree here.
                    id_bit
                } else {
                    // Real discrepancy. Below the previous pass's branch
                    // point, replay the recorded choice; at the branch
                    // point take 1; past it take 0.
                    let direction = if id_bit_number < state.last_discrepancy {
                        state.rom[rom_byte_number] & rom_byte_mask != 0
                    } else {
                        id_bit_number == state.last_discrepancy
                    };

                    if !direction {
                        last_zero = id_bit_number;
                        if last_zero < 9 {
                            state.last_family_discrepancy = last_zero;
                        }
                    }
                    direction
                };

                if direction {
                    state.rom[rom_byte_number] |= rom_byte_mask;
                } else {
                    state.rom[rom_byte_number] &= !rom_byte_mask;
                }

                // Devices whose bit disagrees drop off here.
                self.write_bit(delay, direction)?;

                id_bit_number += 1;
                rom_byte_mask <<= 1;

                if rom_byte_mask == 0 {
                    crc = crc8_update(crc, state.rom[rom_byte_number]);
                    rom_byte_number += 1;
                    rom_byte_mask = 0x01;
                }

                if rom_byte_number == Address::BYTES {
                    break;
                }
            }

            // Success only if all 64 bits went through and the trailing
            // CRC byte folded the code to zero.
            if id_bit_number > Address::BITS as u8 && crc == 0 {
                state.last_discrepancy = last_zero;
                if state.last_discrepancy == 0 {
                    state.last_device = true;
                }
                found = true;
            }
        }

        if !found || state.rom[0] == 0 {
            state.reset();
            Ok(None)
        } else {
            Ok(Some(Address::from(state.rom)))
        }
    }

    /// Convenience wrapper: all devices of one family, in search order.
    pub fn first_of_family(
        &mut self,
        family_code: u8,
        search: &mut Search,
        delay: &mut impl DelayNs,
    ) -> Result<Option<Address>, P::Error> {
        let mut found = self.first(search, delay)?;
        while let Some(address) = found {
            if address.family_code() == family_code {
                return Ok(Some(address));
            }
            found = self.next(search, delay)?;
        }
        Ok(None)
    }
}
