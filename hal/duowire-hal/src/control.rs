//! TWI control register commands
//!
//! Every write to the control register that keeps the peripheral running
//! carries `TWINT | TWEN | TWIE`: writing `TWINT` clears the interrupt
//! flag and starts the next bus operation, `TWIE` keeps the completion
//! interrupt armed.

/// Control register bit layout
pub mod bits {
    /// Interrupt flag (write 1 to clear and start the next operation)
    pub const TWINT: u8 = 0x80;
    /// Enable acknowledge for received bytes
    pub const TWEA: u8 = 0x40;
    /// Generate a START condition
    pub const TWSTA: u8 = 0x20;
    /// Generate a STOP condition
    pub const TWSTO: u8 = 0x10;
    /// Write collision flag
    pub const TWWC: u8 = 0x08;
    /// Peripheral enable
    pub const TWEN: u8 = 0x04;
    /// Interrupt enable
    pub const TWIE: u8 = 0x01;
}

/// A value written to the control register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Control(u8);

impl Control {
    /// Clear the interrupt flag and run the next operation
    pub const CONTINUE: Self = Self(bits::TWINT | bits::TWEN | bits::TWIE);

    /// Continue, acknowledging the next received byte
    pub const CONTINUE_ACK: Self = Self(Self::CONTINUE.0 | bits::TWEA);

    /// Generate a (repeated) START condition
    pub const START: Self = Self(Self::CONTINUE.0 | bits::TWSTA);

    /// Generate a STOP condition and release the bus
    pub const STOP: Self = Self(Self::CONTINUE.0 | bits::TWSTO);

    /// Build a control value from raw register bits
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw register bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether all bits of `mask` are set
    pub const fn contains(self, mask: u8) -> bool {
        self.0 & mask == mask
    }

    /// Whether this write starts a bus operation (clears `TWINT`)
    pub const fn starts_operation(self) -> bool {
        self.contains(bits::TWINT | bits::TWEN)
    }

    /// Whether this write requests a START condition
    pub const fn is_start(self) -> bool {
        self.contains(bits::TWSTA)
    }

    /// Whether this write requests a STOP condition
    pub const fn is_stop(self) -> bool {
        self.contains(bits::TWSTO)
    }

    /// Whether the next received byte will be acknowledged
    pub const fn acknowledges(self) -> bool {
        self.contains(bits::TWEA)
    }
}
