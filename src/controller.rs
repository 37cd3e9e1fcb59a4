//! Control-loop state: filters, running clock, save cadence.
//!
//! The firmware's interrupt handlers only raise flags; its main loop
//! observes them and calls in here, so every mutation happens on one
//! execution context and nothing needs locking. The controller owns no
//! peripherals: the loop reads its sensors, feeds the values in, and
//! acts on the filtered outputs.

use crate::filter::{AverageFilter, MovingAverage};
use crate::moisture::{Calibration, MoistureSensor};
use crate::store::SampleRecord;

/// Window of the soil-temperature moving average.
pub const SOIL_FILTER_LENGTH: usize = 30;

/// Cadence and calibration of the control loop.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// Window of the air-temperature filter, in samples.
    pub air_filter_length: u32,
    /// Window of the moisture filter, in samples.
    pub moisture_filter_length: u32,
    /// Seconds between persisted sample records.
    pub save_interval_s: u16,
    /// Moisture probe calibration.
    pub moisture: Calibration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            air_filter_length: 10,
            moisture_filter_length: 10,
            save_interval_s: 60,
            moisture: Calibration::default(),
        }
    }
}

/// Snapshot of the filtered sensor state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Readings {
    pub air_c: i16,
    pub moisture_pct: i16,
    pub soil_c: f32,
}

/// State carried across control-loop cycles.
pub struct Controller {
    air_filter: AverageFilter,
    moisture_filter: AverageFilter,
    soil_filter: MovingAverage<SOIL_FILTER_LENGTH>,
    moisture: MoistureSensor,
    clock: u32,
    save_interval_s: u16,
    seconds_since_save: u16,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        Controller {
            air_filter: AverageFilter::new(config.air_filter_length),
            moisture_filter: AverageFilter::new(config.moisture_filter_length),
            soil_filter: MovingAverage::new(),
            moisture: MoistureSensor::new(config.moisture),
            clock: 0,
            save_interval_s: config.save_interval_s,
            seconds_since_save: 0,
        }
    }

    /// One second has elapsed. Returns `true` when a save cycle is due.
    pub fn tick(&mut self) -> bool {
        self.clock = self.clock.wrapping_add(1);
        self.seconds_since_save += 1;
        if self.seconds_since_save >= self.save_interval_s {
            self.seconds_since_save = 0;
            return true;
        }
        false
    }

    /// Running clock, seconds of unix time.
    pub fn clock(&self) -> u32 {
        self.clock
    }

    /// Set the clock, e.g. from the console or the persisted value.
    pub fn set_clock(&mut self, seconds: u32) {
        self.clock = seconds;
    }

    /// Feed one air-temperature sample, whole degrees Celsius.
    pub fn record_air(&mut self, temperature_c: i16) {
        self.air_filter.insert(i32::from(temperature_c));
    }

    /// Feed one raw moisture sample from the ADC.
    pub fn record_moisture_millivolts(&mut self, millivolts: i16) {
        let percent = self.moisture.percent(millivolts);
        self.moisture_filter.insert(i32::from(percent));
    }

    /// Feed one soil-temperature sample, degrees Celsius.
    pub fn record_soil(&mut self, temperature_c: f32) {
        self.soil_filter.insert(temperature_c);
    }

    /// Current filtered values.
    pub fn readings(&self) -> Readings {
        Readings {
            air_c: self.air_filter.read() as i16,
            moisture_pct: self.moisture_filter.read() as i16,
            soil_c: self.soil_filter.read(),
        }
    }

    /// Filtered values stamped with the running clock, ready to persist.
    pub fn sample_record(&self) -> SampleRecord {
        let readings = self.readings();
        SampleRecord {
            timestamp: self.clock,
            air_temperature: readings.air_c,
            soil_moisture: readings.moisture_pct,
            soil_temperature: readings.soil_c,
        }
    }
}
