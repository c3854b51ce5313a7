//! TWI status codes
//!
//! The controller reports the outcome of the last bus operation through
//! the upper five bits of the status register. Only the master-mode codes
//! are decoded; anything else is kept as [`Status::Unknown`].

/// Mask selecting the status bits of the status register
pub const STATUS_MASK: u8 = 0xF8;

/// Decoded master-mode status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// Illegal START/STOP detected (0x00)
    BusError,
    /// START condition transmitted (0x08)
    Start,
    /// Repeated START condition transmitted (0x10)
    RepeatedStart,
    /// SLA+W transmitted, ACK received (0x18)
    AddressWriteAck,
    /// SLA+W transmitted, NACK received (0x20)
    AddressWriteNack,
    /// Data byte transmitted, ACK received (0x28)
    DataSentAck,
    /// Data byte transmitted, NACK received (0x30)
    DataSentNack,
    /// Arbitration lost in SLA+R/W, data bytes or NACK bit (0x38)
    ArbitrationLost,
    /// SLA+R transmitted, ACK received (0x40)
    AddressReadAck,
    /// SLA+R transmitted, NACK received (0x48)
    AddressReadNack,
    /// Data byte received, ACK returned (0x50)
    DataReceivedAck,
    /// Data byte received, NACK returned (0x58)
    DataReceivedNack,
    /// No relevant state information, interrupt flag clear (0xF8)
    Idle,
    /// Any other (slave-mode or undefined) code
    Unknown(u8),
}

impl Status {
    /// Decode a raw status register value
    ///
    /// Prescaler bits are masked off before decoding.
    pub const fn from_register(value: u8) -> Self {
        match value & STATUS_MASK {
            0x00 => Status::BusError,
            0x08 => Status::Start,
            0x10 => Status::RepeatedStart,
            0x18 => Status::AddressWriteAck,
            0x20 => Status::AddressWriteNack,
            0x28 => Status::DataSentAck,
            0x30 => Status::DataSentNack,
            0x38 => Status::ArbitrationLost,
            0x40 => Status::AddressReadAck,
            0x48 => Status::AddressReadNack,
            0x50 => Status::DataReceivedAck,
            0x58 => Status::DataReceivedNack,
            0xF8 => Status::Idle,
            other => Status::Unknown(other),
        }
    }

    /// Raw status code (prescaler bits zero)
    pub const fn code(self) -> u8 {
        match self {
            Status::BusError => 0x00,
            Status::Start => 0x08,
            Status::RepeatedStart => 0x10,
            Status::AddressWriteAck => 0x18,
            Status::AddressWriteNack => 0x20,
            Status::DataSentAck => 0x28,
            Status::DataSentNack => 0x30,
            Status::ArbitrationLost => 0x38,
            Status::AddressReadAck => 0x40,
            Status::AddressReadNack => 0x48,
            Status::DataReceivedAck => 0x50,
            Status::DataReceivedNack => 0x58,
            Status::Idle => 0xF8,
            Status::Unknown(code) => code,
        }
    }
}

impl From<u8> for Status {
    fn from(value: u8) -> Self {
        Self::from_register(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_masks_prescaler_bits() {
        assert_eq!(Status::from_register(0x08 | 0x03), Status::Start);
        assert_eq!(Status::from_register(0x58 | 0x01), Status::DataReceivedNack);
        assert_eq!(Status::from_register(0xFB), Status::Idle);
    }

    #[test]
    fn test_decode_master_codes() {
        let codes = [
            0x00u8, 0x08, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38, 0x40, 0x48, 0x50, 0x58, 0xF8,
        ];
        for code in codes {
            let status = Status::from(code);
            assert!(!matches!(status, Status::Unknown(_)));
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn test_slave_codes_are_unknown() {
        // SLA+W received as slave
        assert_eq!(Status::from_register(0x60), Status::Unknown(0x60));
        assert_eq!(Status::from_register(0xA8).code(), 0xA8);
    }
}
