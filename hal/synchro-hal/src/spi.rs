//! SPI peripheral abstractions
//!
//! Models the shift-register peripheral at register level: a control byte
//! holding enable/master/mode/rate bits, a double-rate flag, a data register
//! and a transfer-complete status flag. Chip-specific HALs map these onto
//! their own register layout.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Shift-register peripheral in master mode
///
/// Implementations perform raw register access only. Sequencing (select,
/// polling, delays) lives in the driver.
pub trait ShiftRegister {
    /// Route the shared clock and data-out lines to the peripheral as outputs
    ///
    /// Must not touch any chip-select line.
    fn configure_pins(&mut self);

    /// Read back the control bits
    fn control(&self) -> ControlBits;

    /// Write the control bits
    fn set_control(&mut self, bits: ControlBits);

    /// Enable or disable the doubled shift clock
    fn set_double_rate(&mut self, enabled: bool);

    /// Check whether the doubled shift clock is active
    fn is_double_rate(&self) -> bool;

    /// Load a byte into the data register, starting an exchange
    fn write_data(&mut self, byte: u8);

    /// Poll the transfer-complete flag
    fn transfer_complete(&self) -> bool;

    /// Read the byte shifted in by the last exchange
    ///
    /// Reading clears the transfer-complete flag.
    fn read_data(&mut self) -> u8;
}

/// Peripheral control byte
///
/// Bit layout:
///
/// ```text
///  7   6      5   4      3     2     1 0
/// [-][ENABLE][-][MASTER][CPOL][CPHA][RATE]
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlBits(u8);

impl ControlBits {
    /// Peripheral enable
    pub const ENABLE: u8 = 1 << 6;
    /// Master mode select
    pub const MASTER: u8 = 1 << 4;
    /// Clock polarity (idle high when set)
    pub const CPOL: u8 = 1 << 3;
    /// Clock phase (sample on second edge when set)
    pub const CPHA: u8 = 1 << 2;
    /// Both bus mode bits
    pub const MODE_MASK: u8 = Self::CPOL | Self::CPHA;
    /// Clock rate select
    pub const RATE_MASK: u8 = 0x03;

    /// Wrap a raw control byte
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw control byte
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Set the given bits, leaving the rest untouched
    pub const fn with(self, bits: u8) -> Self {
        Self(self.0 | bits)
    }

    /// Check whether all of `bits` are set
    pub const fn contains(self, bits: u8) -> bool {
        self.0 & bits == bits
    }

    /// Bus mode currently encoded in the mode bits
    pub const fn mode(self) -> Mode {
        Mode::from_control(self.0)
    }

    /// Replace only the mode bits
    pub const fn with_mode(self, mode: Mode) -> Self {
        Self((self.0 & !Self::MODE_MASK) | mode.control_bits())
    }

    /// Clock rate select field
    pub const fn rate(self) -> u8 {
        self.0 & Self::RATE_MASK
    }
}

impl fmt::Debug for ControlBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ControlBits({:#04x})", self.0)
    }
}

/// SPI clock polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Clock idles low (CPOL=0)
    IdleLow,
    /// Clock idles high (CPOL=1)
    IdleHigh,
}

/// SPI clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Data captured on first clock transition (CPHA=0)
    CaptureOnFirstTransition,
    /// Data captured on second clock transition (CPHA=1)
    CaptureOnSecondTransition,
}

/// SPI mode (combined polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    #[default]
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl Mode {
    /// Mode number (0-3)
    pub const fn number(self) -> u8 {
        match self {
            Mode::Mode0 => 0,
            Mode::Mode1 => 1,
            Mode::Mode2 => 2,
            Mode::Mode3 => 3,
        }
    }

    /// Mode from its number, if in range
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            0 => Some(Mode::Mode0),
            1 => Some(Mode::Mode1),
            2 => Some(Mode::Mode2),
            3 => Some(Mode::Mode3),
            _ => None,
        }
    }

    /// Position of this mode inside [`ControlBits::MODE_MASK`]
    pub const fn control_bits(self) -> u8 {
        self.number() << 2
    }

    const fn from_control(bits: u8) -> Self {
        match (bits & ControlBits::MODE_MASK) >> 2 {
            0 => Mode::Mode0,
            1 => Mode::Mode1,
            2 => Mode::Mode2,
            _ => Mode::Mode3,
        }
    }

    /// Clock polarity of this mode
    pub const fn polarity(self) -> Polarity {
        match self {
            Mode::Mode0 | Mode::Mode1 => Polarity::IdleLow,
            Mode::Mode2 | Mode::Mode3 => Polarity::IdleHigh,
        }
    }

    /// Clock phase of this mode
    pub const fn phase(self) -> Phase {
        match self {
            Mode::Mode0 | Mode::Mode2 => Phase::CaptureOnFirstTransition,
            Mode::Mode1 | Mode::Mode3 => Phase::CaptureOnSecondTransition,
        }
    }
}

impl TryFrom<u8> for Mode {
    type Error = InvalidMode;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Mode::from_number(n).ok_or(InvalidMode(n))
    }
}

impl From<Mode> for (Polarity, Phase) {
    fn from(mode: Mode) -> Self {
        (mode.polarity(), mode.phase())
    }
}

impl From<(Polarity, Phase)> for Mode {
    fn from((polarity, phase): (Polarity, Phase)) -> Self {
        match (polarity, phase) {
            (Polarity::IdleLow, Phase::CaptureOnFirstTransition) => Mode::Mode0,
            (Polarity::IdleLow, Phase::CaptureOnSecondTransition) => Mode::Mode1,
            (Polarity::IdleHigh, Phase::CaptureOnFirstTransition) => Mode::Mode2,
            (Polarity::IdleHigh, Phase::CaptureOnSecondTransition) => Mode::Mode3,
        }
    }
}

/// Mode number outside 0-3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidMode(pub u8);
