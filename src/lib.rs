#![no_std]
#![doc = include_str!("../README.md")]

#[cfg(test)]
extern crate std;

mod address;
mod bus;
mod command;
mod console;
mod controller;
mod crc;
mod error;
mod filter;
mod hatch;
mod heater;
mod moisture;
mod search;
#[cfg(test)]
mod sim;
#[cfg(feature = "ds18b20")]
pub mod soil;
mod store;
mod tc74;
mod timing;
mod wire;

pub use address::Address;
pub use bus::Bus;
pub use command::Command;
pub use console::{Console, Request, SerialPort};
pub use controller::{Controller, ControllerConfig, Readings, SOIL_FILTER_LENGTH};
pub use crc::{crc8, crc8_update};
pub use error::Error;
pub use filter::{AverageFilter, MovingAverage};
pub use hatch::{Hatch, HatchConfig};
pub use heater::Heater;
pub use moisture::{Calibration, MoistureSensor};
pub use search::Search;
pub use store::{ByteStore, SampleLog, SampleRecord, RING_BASE};
pub use tc74::Tc74;
pub use timing::{Timing, TICKS_PER_US};
pub use wire::BusPin;
