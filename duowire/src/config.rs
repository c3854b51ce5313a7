//! Bus configuration
//!
//! The SCL frequency of the controller is
//! `CPU / (16 + 2 * divisor * prescaler)`. [`BitRate::compute`] picks the
//! smallest prescaler whose divisor fits the 8-bit rate register, rounding
//! so the bus never runs faster than requested.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use duowire_hal::Prescaler;

use crate::error::Error;

/// Bus configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TwiConfig {
    /// Controller clock in Hz
    pub cpu_hz: u32,
    /// Target SCL frequency in Hz
    pub frequency: u32,
    /// Enable the internal pull-ups on SDA/SCL
    pub pullups: bool,
}

impl Default for TwiConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl TwiConfig {
    /// Standard mode (100 kHz) on a 16 MHz part
    pub const STANDARD: Self = Self {
        cpu_hz: 16_000_000,
        frequency: 100_000,
        pullups: true,
    };

    /// Fast mode (400 kHz) on a 16 MHz part
    pub const FAST: Self = Self {
        cpu_hz: 16_000_000,
        frequency: 400_000,
        pullups: true,
    };

    /// Set the controller clock
    pub const fn with_cpu_hz(mut self, cpu_hz: u32) -> Self {
        self.cpu_hz = cpu_hz;
        self
    }

    /// Set the SCL frequency
    pub const fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }

    /// Enable or disable the internal pull-ups
    pub const fn with_pullups(mut self, pullups: bool) -> Self {
        self.pullups = pullups;
        self
    }
}

/// Rate register settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitRate {
    /// Bit-rate register value
    pub divisor: u8,
    /// Prescaler selection
    pub prescaler: Prescaler,
}

impl BitRate {
    /// Derive register settings for `frequency` on a `cpu_hz` controller
    pub fn compute(cpu_hz: u32, frequency: u32) -> Result<Self, Error> {
        if frequency == 0 {
            return Err(Error::InvalidArg);
        }

        let ratio = cpu_hz.div_ceil(frequency);
        // The controller cannot go faster than CPU / 16
        let span = ratio.checked_sub(16).ok_or(Error::InvalidArg)?;

        Prescaler::ALL
            .into_iter()
            .find_map(|prescaler| {
                let divisor = span.div_ceil(2 * prescaler.factor());
                u8::try_from(divisor)
                    .ok()
                    .map(|divisor| Self { divisor, prescaler })
            })
            .ok_or(Error::InvalidArg)
    }

    /// Register settings for a configuration
    pub fn for_config(config: &TwiConfig) -> Result<Self, Error> {
        Self::compute(config.cpu_hz, config.frequency)
    }

    /// Resulting SCL frequency in Hz
    pub fn scl_frequency(&self, cpu_hz: u32) -> u32 {
        cpu_hz / (16 + 2 * u32::from(self.divisor) * self.prescaler.factor())
    }
}
