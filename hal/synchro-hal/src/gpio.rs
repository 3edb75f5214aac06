//! Chip-select line abstractions
//!
//! A chip-select line is addressed by port and pin so that a slave
//! descriptor can be copied around freely. The port implementation owns the
//! output latches and drives the addressed bit.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifies one output line (port + pin)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChipSelectLine {
    /// Port (bank) index
    pub port: u8,
    /// Pin within the port
    pub pin: u8,
}

impl ChipSelectLine {
    /// Create a new line
    pub const fn new(port: u8, pin: u8) -> Self {
        Self { port, pin }
    }

    /// Bit mask of this pin within its port
    ///
    /// Pins above 31 yield an empty mask.
    pub const fn mask(&self) -> u32 {
        if self.pin < 32 {
            1 << self.pin
        } else {
            0
        }
    }
}

/// Output latches for chip-select lines
///
/// The driver only changes pin state. Pin direction is the caller's
/// responsibility and must already be output before a line is used.
pub trait ChipSelectPort {
    /// Check whether this port can drive the given line
    fn supports(&self, line: ChipSelectLine) -> bool;

    /// Drive the line high (logic 1)
    fn set_high(&mut self, line: ChipSelectLine);

    /// Drive the line low (logic 0)
    fn set_low(&mut self, line: ChipSelectLine);

    /// Check if the output latch for the line is set high
    fn is_set_high(&self, line: ChipSelectLine) -> bool;

    /// Check if the output latch for the line is set low
    fn is_set_low(&self, line: ChipSelectLine) -> bool {
        !self.is_set_high(line)
    }
}
