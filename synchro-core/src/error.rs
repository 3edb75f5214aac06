//! Driver error type

use core::fmt;

/// Errors reported by the checked driver paths
///
/// None of these can occur on a correctly sequenced successful transfer;
/// the checks run before any register or pin is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiError {
    /// Slave id outside 0-7
    InvalidSlaveId(u8),
    /// No descriptor registered for this id
    SlaveNotRegistered(u8),
    /// Chip-select line not addressable by the port
    InvalidChipSelect,
    /// Select or deselect delay negative or not finite
    InvalidDelay,
    /// Block longer than an 8-bit count allows
    BlockTooLong(usize),
    /// Transfer-complete flag did not set within the poll budget
    Timeout,
}

impl fmt::Display for SpiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpiError::InvalidSlaveId(id) => write!(f, "invalid slave id {}", id),
            SpiError::SlaveNotRegistered(id) => write!(f, "slave {} not registered", id),
            SpiError::InvalidChipSelect => write!(f, "chip-select line not supported by port"),
            SpiError::InvalidDelay => write!(f, "select/deselect delay must be finite and >= 0"),
            SpiError::BlockTooLong(len) => write!(f, "block of {} bytes exceeds 255", len),
            SpiError::Timeout => write!(f, "transfer did not complete"),
        }
    }
}

impl embedded_hal::spi::Error for SpiError {
    fn kind(&self) -> embedded_hal::spi::ErrorKind {
        embedded_hal::spi::ErrorKind::Other
    }
}
