//! Deterministic bus model for driver tests.
//!
//! A [`SimBus`] stands in for the electrical line plus every device on
//! it. The pin and delay handles share one model through a `RefCell`:
//! the delay advances a simulated clock instead of sleeping, and the pin
//! decodes the master's pulses by width, exactly as a real device would.

use core::cell::RefCell;
use core::convert::Infallible;

use embedded_hal::delay::DelayNs;

use crate::crc::crc8;
use crate::wire::BusPin;

/// Build a valid ROM code from a family byte and serial.
pub fn rom(family: u8, serial: [u8; 6]) -> [u8; 8] {
    let mut code = [0u8; 8];
    code[0] = family;
    code[1..7].copy_from_slice(&serial);
    code[7] = crc8(&code[..7]);
    code
}

/// Scratchpad image holding a raw temperature, with a valid CRC.
pub fn scratchpad(raw_temperature: i16) -> [u8; 9] {
    let mut data = [0u8; 9];
    let raw = raw_temperature.to_le_bytes();
    data[0] = raw[0];
    data[1] = raw[1];
    data[8] = crc8(&data[..8]);
    data
}

struct Device {
    rom: [u8; 8],
    scratchpad: [u8; 9],
    /// Still participating in the current search pass.
    active: bool,
}

#[derive(Clone, Copy)]
enum Phase {
    Idle,
    /// Collecting the ROM command byte that follows a reset.
    Command { value: u8, bits: u8 },
    /// Collecting a function command after device selection.
    Function { value: u8, bits: u8 },
    /// Search pass: per address bit, two read slots then one write slot.
    Search { bit_index: u8, step: u8 },
    /// Collecting the 64 address bits of a match-ROM selection.
    MatchRom { rom: [u8; 8], bits: u8 },
    /// Selected device clocking data out through read slots.
    SendBits { data: [u8; 9], len_bits: u16, index: u16 },
    /// Conversion in progress; quiet until the next reset.
    Busy,
}

pub struct SimBus {
    now_us: u64,
    devices: std::vec::Vec<Device>,
    selected: Option<usize>,
    phase: Phase,
    master_low: bool,
    slot_open: bool,
    slot_start: u64,
    released_at: u64,
    presence_from: u64,
    presence_until: u64,
    /// Device holds the line low this long when it outputs a 0.
    output_low_until: u64,
}

impl SimBus {
    pub fn new(roms: &[[u8; 8]]) -> Self {
        SimBus {
            now_us: 0,
            devices: roms
                .iter()
                .map(|code| Device {
                    rom: *code,
                    scratchpad: scratchpad(0),
                    active: true,
                })
                .collect(),
            selected: None,
            phase: Phase::Idle,
            master_low: false,
            slot_open: false,
            slot_start: 0,
            released_at: 0,
            presence_from: 0,
            presence_until: 0,
            output_low_until: 0,
        }
    }

    pub fn set_raw_temperature(&mut self, device: usize, raw: i16) {
        self.devices[device].scratchpad = scratchpad(raw);
    }

    pub fn corrupt_scratchpad(&mut self, device: usize) {
        self.devices[device].scratchpad[8] ^= 0x01;
    }

    fn drive_low(&mut self) {
        let now = self.now_us;
        self.finalize_slot();
        self.master_low = true;
        self.slot_open = true;
        self.slot_start = now;
        self.output_low_until = 0;
        if let Some(bit) = self.current_output_bit() {
            if !bit {
                self.output_low_until = now + 25;
            }
        }
    }

    fn release(&mut self) {
        let now = self.now_us;
        self.master_low = false;
        self.released_at = now;
        if self.slot_open && now - self.slot_start >= 400 {
            // Reset pulse: everyone re-arms and answers with presence.
            self.slot_open = false;
            self.phase = Phase::Command { value: 0, bits: 0 };
            self.selected = None;
            for device in self.devices.iter_mut() {
                device.active = true;
            }
            if self.devices.is_empty() {
                self.presence_from = 0;
                self.presence_until = 0;
            } else {
                self.presence_from = now + 15;
                self.presence_until = now + 300;
            }
        }
    }

    fn sample(&self) -> bool {
        let now = self.now_us;
        if self.master_low {
            return false;
        }
        if self.presence_until != 0 && now >= self.presence_from && now <= self.presence_until {
            return false;
        }
        if now <= self.output_low_until {
            return false;
        }
        true
    }

    fn finalize_slot(&mut self) {
        if !self.slot_open {
            return;
        }
        self.slot_open = false;
        let width = self.released_at.saturating_sub(self.slot_start);
        let device_drives = matches!(
            self.phase,
            Phase::Search { step: 0, .. } | Phase::Search { step: 1, .. } | Phase::SendBits { .. }
        );
        if width > 240 {
            return; // reset, already handled on release
        }
        if device_drives {
            self.close_read_slot();
        } else {
            self.close_write_slot(width <= 15);
        }
    }

    /// Level a reading master would see in the current slot.
    fn current_output_bit(&self) -> Option<bool> {
        match self.phase {
            Phase::Search { bit_index, step: 0 } => Some(self.wired_and(bit_index, false)),
            Phase::Search { bit_index, step: 1 } => Some(self.wired_and(bit_index, true)),
            Phase::SendBits { data, len_bits, index } if index < len_bits => {
                Some(data[(index / 8) as usize] & (1 << (index % 8)) != 0)
            }
            _ => None,
        }
    }

    /// Open-drain composite of every active device's output.
    fn wired_and(&self, bit_index: u8, complement: bool) -> bool {
        let mut line = true;
        for device in self.devices.iter().filter(|d| d.active) {
            let bit = bit_of(&device.rom, bit_index);
            line &= if complement { !bit } else { bit };
        }
        line
    }

    fn close_read_slot(&mut self) {
        match self.phase {
            Phase::Search { bit_index, step } if step < 2 => {
                self.phase = Phase::Search {
                    bit_index,
                    step: step + 1,
                };
            }
            Phase::SendBits { data, len_bits, index } => {
                let index = index + 1;
                self.phase = if index == len_bits {
                    Phase::Idle
                } else {
                    Phase::SendBits { data, len_bits, index }
                };
            }
            _ => {}
        }
    }

    fn close_write_slot(&mut self, bit: bool) {
        match self.phase {
            Phase::Command { value, bits } => {
                let value = value | (u8::from(bit) << bits);
                if bits + 1 == 8 {
                    self.rom_command(value);
                } else {
                    self.phase = Phase::Command {
                        value,
                        bits: bits + 1,
                    };
                }
            }
            Phase::Function { value, bits } => {
                let value = value | (u8::from(bit) << bits);
                if bits + 1 == 8 {
                    self.function_command(value);
                } else {
                    self.phase = Phase::Function {
                        value,
                        bits: bits + 1,
                    };
                }
            }
            Phase::MatchRom { mut rom, bits } => {
                if bit {
                    rom[(bits / 8) as usize] |= 1 << (bits % 8);
                }
                if bits + 1 == 64 {
                    self.selected = self.devices.iter().position(|d| d.rom == rom);
                    self.phase = Phase::Function { value: 0, bits: 0 };
                } else {
                    self.phase = Phase::MatchRom {
                        rom,
                        bits: bits + 1,
                    };
                }
            }
            Phase::Search { bit_index, step: 2 } => {
                for device in self.devices.iter_mut() {
                    if device.active && bit_of(&device.rom, bit_index) != bit {
                        device.active = false;
                    }
                }
                self.phase = if bit_index + 1 == 64 {
                    Phase::Idle
                } else {
                    Phase::Search {
                        bit_index: bit_index + 1,
                        step: 0,
                    }
                };
            }
            _ => {}
        }
    }

    fn rom_command(&mut self, value: u8) {
        self.phase = match value {
            0xf0 => Phase::Search {
                bit_index: 0,
                step: 0,
            },
            0x55 => Phase::MatchRom {
                rom: [0; 8],
                bits: 0,
            },
            0xcc => {
                self.selected = if self.devices.len() == 1 { Some(0) } else { None };
                Phase::Function { value: 0, bits: 0 }
            }
            _ => Phase::Idle,
        };
    }

    fn function_command(&mut self, value: u8) {
        self.phase = match value {
            0x44 => Phase::Busy,
            0xbe => match self.selected {
                Some(index) => Phase::SendBits {
                    data: self.devices[index].scratchpad,
                    len_bits: 72,
                    index: 0,
                },
                None => Phase::Idle,
            },
            _ => Phase::Idle,
        };
    }
}

fn bit_of(code: &[u8; 8], bit_index: u8) -> bool {
    code[(bit_index / 8) as usize] & (1 << (bit_index % 8)) != 0
}

pub struct SimPin<'a>(pub &'a RefCell<SimBus>);

impl BusPin for SimPin<'_> {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().drive_low();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().release();
        Ok(())
    }

    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.borrow().sample())
    }
}

/// RAM stand-in for an EEPROM, erased to 0xff like the real part.
pub struct MemStore {
    bytes: std::vec::Vec<u8>,
}

impl MemStore {
    pub fn new(capacity: usize) -> Self {
        MemStore {
            bytes: std::vec![0xff; capacity],
        }
    }
}

impl crate::store::ByteStore for MemStore {
    type Error = Infallible;

    fn read_byte(&mut self, address: u32) -> Result<u8, Infallible> {
        Ok(self.bytes[address as usize])
    }

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Infallible> {
        self.bytes[address as usize] = value;
        Ok(())
    }
}

pub struct SimDelay<'a>(pub &'a RefCell<SimBus>);

impl DelayNs for SimDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().now_us += u64::from(ns) / 1000;
    }

    fn delay_us(&mut self, us: u32) {
        self.0.borrow_mut().now_us += u64::from(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().now_us += u64::from(ms) * 1000;
    }
}
