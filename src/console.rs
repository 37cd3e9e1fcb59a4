//! Line-oriented command console over a serial link.
//!
//! Input is echoed and collected into a bounded line buffer; a carriage
//! return or newline ends the line and runs the command. Responses are
//! plain `\r\n`-terminated text. The console is polled from the main
//! loop and never blocks on input.

use core::fmt;

use crate::address::Address;
use crate::controller::Controller;
use crate::store::{ByteStore, SampleLog};

/// Character device carrying the console.
pub trait SerialPort {
    type Error;

    /// Take one received byte if available.
    fn read(&mut self) -> nb::Result<u8, Self::Error>;

    /// Queue one byte for transmit.
    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error>;
}

/// One parsed console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    /// List the available commands.
    Help,
    /// Current filtered readings, probes and clock.
    Status,
    /// Dump the persisted sample records.
    Log,
    /// Show the clock, or set it when an argument is given.
    Time(Option<u32>),
    /// Drop the persisted records.
    Erase,
    /// Anything else; carries the offending token.
    Unknown(&'a str),
}

impl<'a> Request<'a> {
    /// Parse one input line. Blank lines parse to `None`.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let verb = words.next()?;

        Some(match verb {
            "help" => Request::Help,
            "status" => Request::Status,
            "log" => Request::Log,
            "erase" => Request::Erase,
            "time" => match words.next() {
                None => Request::Time(None),
                Some(argument) => match argument.parse() {
                    Ok(seconds) => Request::Time(Some(seconds)),
                    Err(_) => Request::Unknown(argument),
                },
            },
            _ => Request::Unknown(verb),
        })
    }
}

/// Console state: the line being typed.
pub struct Console<const CAP: usize = 64> {
    line: heapless::String<CAP>,
    overflowed: bool,
}

impl<const CAP: usize> Console<CAP> {
    pub const fn new() -> Self {
        Console {
            line: heapless::String::new(),
            overflowed: false,
        }
    }

    /// Drain pending input and run any completed line against the
    /// controller and the sample log.
    ///
    /// Store failures are reported on the console itself; only serial
    /// failures propagate.
    pub fn service<S, St>(
        &mut self,
        serial: &mut S,
        controller: &mut Controller,
        samples: &mut SampleLog<St>,
        probes: &[Address],
    ) -> Result<(), S::Error>
    where
        S: SerialPort,
        St: ByteStore,
    {
        loop {
            let byte = match serial.read() {
                Ok(byte) => byte,
                Err(nb::Error::WouldBlock) => return Ok(()),
                Err(nb::Error::Other(error)) => return Err(error),
            };

            match byte {
                b'\r' | b'\n' => {
                    emit(serial, format_args!("\r\n"))?;
                    if self.overflowed {
                        self.overflowed = false;
                        emit(serial, format_args!("error: line too long\r\n"))?;
                    } else {
                        self.run_line(serial, controller, samples, probes)?;
                    }
                    self.line.clear();
                }
                b' '..=b'~' => {
                    nb::block!(serial.write(byte))?; // echo
                    if self.line.push(byte as char).is_err() {
                        self.overflowed = true;
                    }
                }
                _ => {} // other control bytes are ignored
            }
        }
    }

    fn run_line<S, St>(
        &self,
        serial: &mut S,
        controller: &mut Controller,
        samples: &mut SampleLog<St>,
        probes: &[Address],
    ) -> Result<(), S::Error>
    where
        S: SerialPort,
        St: ByteStore,
    {
        let request = match Request::parse(&self.line) {
            Some(request) => request,
            None => return Ok(()),
        };

        match request {
            Request::Help => {
                emit(
                    serial,
                    format_args!("commands: help status log time [secs] erase\r\n"),
                )?;
            }
            Request::Status => {
                let readings = controller.readings();
                emit(serial, format_args!("air: {} C\r\n", readings.air_c))?;
                emit(
                    serial,
                    format_args!("moisture: {} %\r\n", readings.moisture_pct),
                )?;
                emit(serial, format_args!("soil: {:.2} C\r\n", readings.soil_c))?;
                emit(serial, format_args!("probes: {}\r\n", probes.len()))?;
                for address in probes {
                    emit(serial, format_args!("  {}\r\n", address))?;
                }
                emit(serial, format_args!("clock: {}\r\n", controller.clock()))?;
            }
            Request::Log => {
                let count = samples.len();
                for index in 0..count {
                    match samples.read(index) {
                        Ok(Some(record)) => emit(
                            serial,
                            format_args!(
                                "{}: t={} air={} moist={} soil={:.2}\r\n",
                                index,
                                record.timestamp,
                                record.air_temperature,
                                record.soil_moisture,
                                record.soil_temperature,
                            ),
                        )?,
                        Ok(None) => break,
                        Err(_) => {
                            emit(serial, format_args!("error: store failed\r\n"))?;
                            break;
                        }
                    }
                }
                emit(serial, format_args!("records: {}\r\n", count))?;
            }
            Request::Time(None) => {
                emit(serial, format_args!("clock: {}\r\n", controller.clock()))?;
            }
            Request::Time(Some(seconds)) => {
                controller.set_clock(seconds);
                if samples.store_clock(seconds).is_err() {
                    emit(serial, format_args!("error: store failed\r\n"))?;
                } else {
                    emit(serial, format_args!("clock: {}\r\n", seconds))?;
                }
            }
            Request::Erase => {
                if samples.clear().is_err() {
                    emit(serial, format_args!("error: store failed\r\n"))?;
                } else {
                    emit(serial, format_args!("erased\r\n"))?;
                }
            }
            Request::Unknown(what) => {
                emit(serial, format_args!("error: unknown '{}'\r\n", what))?;
            }
        }
        Ok(())
    }
}

impl<const CAP: usize> Default for Console<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

/// Push formatted text out byte by byte, surfacing the serial error that
/// `core::fmt` would otherwise swallow.
fn emit<S: SerialPort>(serial: &mut S, args: fmt::Arguments) -> Result<(), S::Error> {
    struct Output<'a, S: SerialPort> {
        serial: &'a mut S,
        error: Option<S::Error>,
    }

    impl<S: SerialPort> fmt::Write for Output<'_, S> {
        fn write_str(&mut self, text: &str) -> fmt::Result {
            for byte in text.bytes() {
                if let Err(error) = nb::block!(self.serial.write(byte)) {
                    self.error = Some(error);
                    return Err(fmt::Error);
                }
            }
            Ok(())
        }
    }

    let mut output = Output {
        serial,
        error: None,
    };
    if fmt::Write::write_fmt(&mut output, args).is_err() {
        if let Some(error) = output.error {
            return Err(error);
        }
    }
    Ok(())
}
