//! Electrical access to the shared data line.

use embedded_hal::digital::{Error, ErrorType, InputPin, OutputPin};

/// One bidirectional open-drain line.
///
/// The bus master only ever drives the line low or releases it; an
/// external pull-up keeps it high when idle. Implementations decide how
/// that maps onto their pin hardware.
pub trait BusPin {
    type Error: Error;

    /// Drive the line low.
    fn set_low(&mut self) -> Result<(), Self::Error>;

    /// Release the line to the pull-up.
    fn set_high(&mut self) -> Result<(), Self::Error>;

    /// Sample the line level; `true` is high.
    fn is_high(&mut self) -> Result<bool, Self::Error>;
}

/// A single open-drain pin carrying both directions.
impl<P> BusPin for (P,)
where
    P: InputPin + OutputPin,
{
    type Error = P::Error;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }
}

/// Separate sense and drive pins wired to the same line.
impl<E, I, O> BusPin for (I, O)
where
    E: Error,
    I: InputPin + ErrorType<Error = E>,
    O: OutputPin + ErrorType<Error = E>,
{
    type Error = E;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.1.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.1.set_high()
    }

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }
}
