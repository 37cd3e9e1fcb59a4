//! Unique 64-bit ROM codes identifying devices on the shared bus.

use crate::crc::crc8;
use core::fmt;

/// Device ROM code: family byte, six serial bytes, trailing CRC8.
///
/// Produced by a successful bus search; otherwise opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address([u8; Self::BYTES]);

impl Address {
    /// Length of a ROM code in bytes.
    pub const BYTES: usize = 8;

    /// Length of a ROM code in bits.
    pub const BITS: usize = Self::BYTES * 8;

    /// Leading byte identifying the device type.
    pub fn family_code(&self) -> u8 {
        self.0[0]
    }

    /// The six-byte unique serial.
    pub fn serial(&self) -> &[u8] {
        &self.0[1..7]
    }

    /// The trailing CRC byte as read off the bus.
    pub fn crc(&self) -> u8 {
        self.0[7]
    }

    /// Whole code folds to zero when the trailing CRC matches.
    pub fn is_valid(&self) -> bool {
        crc8(&self.0) == 0
    }

    pub fn as_bytes(&self) -> &[u8; Self::BYTES] {
        &self.0
    }
}

impl From<[u8; Address::BYTES]> for Address {
    fn from(raw: [u8; Address::BYTES]) -> Self {
        Address(raw)
    }
}

impl From<Address> for [u8; Address::BYTES] {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl From<Address> for u64 {
    fn from(address: Address) -> Self {
        u64::from_le_bytes(address.0)
    }
}

impl From<u64> for Address {
    fn from(raw: u64) -> Self {
        Address(raw.to_le_bytes())
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
