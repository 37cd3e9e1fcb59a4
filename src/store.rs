//! Non-volatile sample log: write cursor, wall clock, record ring.
//!
//! Layout inside the byte store: a 4-byte write cursor at offset 0, the
//! 4-byte running clock at offset 4, then a flat ring of fixed-size
//! records from [`RING_BASE`] up to the store capacity, wrapping back to
//! [`RING_BASE`] when full. Everything is little-endian.

use byteorder::{ByteOrder, LittleEndian};

/// Byte-addressed non-volatile memory, e.g. an EEPROM.
pub trait ByteStore {
    type Error;

    fn read_byte(&mut self, address: u32) -> Result<u8, Self::Error>;

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Self::Error>;
}

/// One persisted measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleRecord {
    /// Unix time of the save cycle.
    pub timestamp: u32,
    /// Filtered air temperature, whole degrees Celsius.
    pub air_temperature: i16,
    /// Filtered soil moisture, percent.
    pub soil_moisture: i16,
    /// Filtered soil temperature, degrees Celsius.
    pub soil_temperature: f32,
}

impl SampleRecord {
    /// Encoded size of one record.
    pub const SIZE: u32 = 12;

    fn encode(&self, buffer: &mut [u8; Self::SIZE as usize]) {
        LittleEndian::write_u32(&mut buffer[0..4], self.timestamp);
        LittleEndian::write_i16(&mut buffer[4..6], self.air_temperature);
        LittleEndian::write_i16(&mut buffer[6..8], self.soil_moisture);
        LittleEndian::write_f32(&mut buffer[8..12], self.soil_temperature);
    }

    fn decode(buffer: &[u8; Self::SIZE as usize]) -> Self {
        SampleRecord {
            timestamp: LittleEndian::read_u32(&buffer[0..4]),
            air_temperature: LittleEndian::read_i16(&buffer[4..6]),
            soil_moisture: LittleEndian::read_i16(&buffer[6..8]),
            soil_temperature: LittleEndian::read_f32(&buffer[8..12]),
        }
    }
}

const CURSOR_ADDRESS: u32 = 0;
const CLOCK_ADDRESS: u32 = 4;

/// First byte of the record ring.
pub const RING_BASE: u32 = 8;

/// Append-only record ring plus the persisted clock, over a byte store.
pub struct SampleLog<S: ByteStore> {
    store: S,
    capacity: u32,
    cursor: u32,
}

impl<S: ByteStore> SampleLog<S> {
    /// Open the log, restoring the write cursor.
    ///
    /// A cursor that is out of range or not record-aligned (a fresh or
    /// damaged store) falls back to an empty ring.
    pub fn open(store: S, capacity: u32) -> Result<Self, S::Error> {
        let mut log = SampleLog {
            store,
            capacity,
            cursor: RING_BASE,
        };

        let stored = log.read_u32(CURSOR_ADDRESS)?;
        let aligned = stored >= RING_BASE && (stored - RING_BASE) % SampleRecord::SIZE == 0;
        // A cursor at exactly `capacity` is a full ring about to wrap.
        if aligned && stored <= capacity {
            log.cursor = stored;
        }
        Ok(log)
    }

    /// Records readable from the ring base up to the cursor.
    pub fn len(&self) -> u32 {
        (self.cursor - RING_BASE) / SampleRecord::SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == RING_BASE
    }

    /// Append one record, wrapping to the ring base when the tail no
    /// longer fits.
    pub fn append(&mut self, record: &SampleRecord) -> Result<(), S::Error> {
        if self.cursor + SampleRecord::SIZE > self.capacity {
            self.cursor = RING_BASE;
        }

        let mut buffer = [0u8; SampleRecord::SIZE as usize];
        record.encode(&mut buffer);
        for (offset, byte) in buffer.iter().enumerate() {
            self.store.write_byte(self.cursor + offset as u32, *byte)?;
        }

        self.cursor += SampleRecord::SIZE;
        self.write_u32(CURSOR_ADDRESS, self.cursor)?;

        #[cfg(feature = "log")]
        log::debug!("store: record appended, cursor {}", self.cursor);

        Ok(())
    }

    /// Read back one record by index, newest last.
    pub fn read(&mut self, index: u32) -> Result<Option<SampleRecord>, S::Error> {
        if index >= self.len() {
            return Ok(None);
        }

        let base = RING_BASE + index * SampleRecord::SIZE;
        let mut buffer = [0u8; SampleRecord::SIZE as usize];
        for (offset, byte) in buffer.iter_mut().enumerate() {
            *byte = self.store.read_byte(base + offset as u32)?;
        }
        Ok(Some(SampleRecord::decode(&buffer)))
    }

    /// Drop every record; the ring starts over.
    pub fn clear(&mut self) -> Result<(), S::Error> {
        self.cursor = RING_BASE;
        self.write_u32(CURSOR_ADDRESS, self.cursor)
    }

    /// Running clock as last persisted.
    pub fn load_clock(&mut self) -> Result<u32, S::Error> {
        self.read_u32(CLOCK_ADDRESS)
    }

    /// Persist the running clock.
    pub fn store_clock(&mut self, seconds: u32) -> Result<(), S::Error> {
        self.write_u32(CLOCK_ADDRESS, seconds)
    }

    /// Give the store back.
    pub fn free(self) -> S {
        self.store
    }

    fn read_u32(&mut self, address: u32) -> Result<u32, S::Error> {
        let mut buffer = [0u8; 4];
        for (offset, byte) in buffer.iter_mut().enumerate() {
            *byte = self.store.read_byte(address + offset as u32)?;
        }
        Ok(LittleEndian::read_u32(&buffer))
    }

    fn write_u32(&mut self, address: u32, value: u32) -> Result<(), S::Error> {
        let mut buffer = [0u8; 4];
        LittleEndian::write_u32(&mut buffer, value);
        for (offset, byte) in buffer.iter().enumerate() {
            self.store.write_byte(address + offset as u32, *byte)?;
        }
        Ok(())
    }
}
