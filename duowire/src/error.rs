//! Driver error taxonomy

use core::fmt;

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// Errors returned by bus operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Empty buffer, zero-length transfer, bad address or bus speed
    InvalidArg,
    /// Transfer does not fit the bus instance's buffer
    InvalidSize,
    /// Bus used before `init`, or initialized twice
    InvalidState,
    /// Address or data byte not acknowledged
    Nack,
    /// Another controller won arbitration
    ArbitrationLost,
    /// Illegal START/STOP or unexpected controller status
    BusFault,
    /// No completion before the timeout elapsed
    Timeout,
}

impl Error {
    /// Whether this is a generic bus failure rather than a rejected request
    /// or an expected NACK
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Error::ArbitrationLost | Error::BusFault | Error::Timeout
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::InvalidArg => "invalid argument",
            Error::InvalidSize => "transfer too large",
            Error::InvalidState => "bus not in a usable state",
            Error::Nack => "not acknowledged",
            Error::ArbitrationLost => "arbitration lost",
            Error::BusFault => "bus error",
            Error::Timeout => "timed out",
        };
        f.write_str(msg)
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Nack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            Error::ArbitrationLost => ErrorKind::ArbitrationLoss,
            Error::BusFault => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}
