//! Servo-driven ventilation hatch.
//!
//! The hatch tracks the filtered air temperature linearly between its
//! mechanical end stops. Positions are PWM compare values matching the
//! servo's pulse-width range.

use embedded_hal::pwm::SetDutyCycle;

/// Hatch geometry and response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HatchConfig {
    /// Air temperature at which the hatch starts opening.
    pub open_temp_c: i16,
    /// Compare value with the hatch fully closed.
    pub closed_position: u16,
    /// Compare value with the hatch fully open.
    pub open_position: u16,
    /// Compare units per degree above `open_temp_c`.
    pub step_per_degree: u16,
}

impl Default for HatchConfig {
    fn default() -> Self {
        HatchConfig {
            open_temp_c: 20,
            closed_position: 1000,
            open_position: 2000,
            step_per_degree: 200,
        }
    }
}

/// Hatch servo behind a PWM channel.
pub struct Hatch<P: SetDutyCycle> {
    pwm: P,
    config: HatchConfig,
}

impl<P: SetDutyCycle> Hatch<P> {
    pub fn new(pwm: P) -> Self {
        Self::with_config(pwm, HatchConfig::default())
    }

    pub fn with_config(pwm: P, config: HatchConfig) -> Self {
        Hatch { pwm, config }
    }

    /// Track the air temperature, clamped to the mechanical range so the
    /// linkage cannot be overdriven.
    pub fn adjust(&mut self, temperature_c: i16) -> Result<(), P::Error> {
        let c = self.config;
        let raw = i32::from(c.closed_position)
            + (i32::from(temperature_c) - i32::from(c.open_temp_c)) * i32::from(c.step_per_degree);

        let position = raw.clamp(i32::from(c.closed_position), i32::from(c.open_position)) as u16;
        self.pwm.set_duty_cycle(position)
    }

    pub fn free(self) -> P {
        self.pwm
    }
}
