//! TWI register interface
//!
//! The driver never touches memory-mapped registers directly; it goes
//! through [`TwiRegisters`], which keeps the protocol engine testable on
//! the host against a simulated controller.

use crate::control::Control;

/// Bit-rate prescaler (TWPS bits of the status register)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    /// Divide by 1
    Div1,
    /// Divide by 4
    Div4,
    /// Divide by 16
    Div16,
    /// Divide by 64
    Div64,
}

impl Prescaler {
    /// All prescalers, smallest first
    pub const ALL: [Prescaler; 4] = [
        Prescaler::Div1,
        Prescaler::Div4,
        Prescaler::Div16,
        Prescaler::Div64,
    ];

    /// Division factor
    pub const fn factor(self) -> u32 {
        match self {
            Prescaler::Div1 => 1,
            Prescaler::Div4 => 4,
            Prescaler::Div16 => 16,
            Prescaler::Div64 => 64,
        }
    }

    /// Value of the TWPS1:0 bits
    pub const fn bits(self) -> u8 {
        match self {
            Prescaler::Div1 => 0,
            Prescaler::Div4 => 1,
            Prescaler::Div16 => 2,
            Prescaler::Div64 => 3,
        }
    }
}

/// Register-level access to a TWI controller running in master mode
///
/// Implementations are called both from task context (inside a critical
/// section) and from the controller's interrupt handler. None of the
/// methods may block.
pub trait TwiRegisters {
    /// Release SDA/SCL as inputs, optionally enabling internal pull-ups
    fn configure_pins(&mut self, pullups: bool);

    /// Program the bit-rate divisor and prescaler
    fn set_bit_rate(&mut self, divisor: u8, prescaler: Prescaler);

    /// Raw status register value (prescaler bits included)
    fn status(&self) -> u8;

    /// Current data register contents
    fn data(&self) -> u8;

    /// Load the data register for the next transmit operation
    fn set_data(&mut self, byte: u8);

    /// Write the control register
    fn set_control(&mut self, control: Control);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prescaler_factors() {
        let factors: [u32; 4] = Prescaler::ALL.map(Prescaler::factor);
        assert_eq!(factors, [1, 4, 16, 64]);
    }

    #[test]
    fn test_prescaler_bits() {
        let bits: [u8; 4] = Prescaler::ALL.map(Prescaler::bits);
        assert_eq!(bits, [0, 1, 2, 3]);
    }
}
