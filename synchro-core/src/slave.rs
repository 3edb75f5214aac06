//! Slave descriptors
//!
//! A [`SlaveDescriptor`] names the chip-select line, bus mode and settling
//! times of one device on the bus. Descriptors are `Copy`; the registry
//! keeps its own copy so callers may build them on the stack.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use synchro_hal::{ChipSelectLine, Mode};

use crate::error::SpiError;
use crate::registry::MAX_SLAVES;

/// Registry slot index (0-7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveId(u8);

impl SlaveId {
    /// Create a slave id, rejecting values outside 0-7
    pub const fn new(id: u8) -> Result<Self, SpiError> {
        if (id as usize) < MAX_SLAVES {
            Ok(Self(id))
        } else {
            Err(SpiError::InvalidSlaveId(id))
        }
    }

    /// Raw id
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Slot index into the registry
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// All eight ids in order
    pub fn all() -> impl Iterator<Item = SlaveId> {
        (0..MAX_SLAVES as u8).map(SlaveId)
    }
}

impl TryFrom<u8> for SlaveId {
    type Error = SpiError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        SlaveId::new(id)
    }
}

impl From<SlaveId> for u8 {
    fn from(id: SlaveId) -> Self {
        id.0
    }
}

/// Configuration for one addressable device on the bus
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlaveDescriptor {
    /// Line driven low to select this slave
    pub chip_select: ChipSelectLine,
    /// Clock polarity/phase the slave samples with
    pub mode: Mode,
    /// Settling time after asserting chip-select (us)
    pub select_delay_us: f32,
    /// Settling time after deasserting chip-select (us)
    pub deselect_delay_us: f32,
}

impl SlaveDescriptor {
    /// Create a new descriptor
    pub const fn new(
        chip_select: ChipSelectLine,
        mode: Mode,
        select_delay_us: f32,
        deselect_delay_us: f32,
    ) -> Self {
        Self {
            chip_select,
            mode,
            select_delay_us,
            deselect_delay_us,
        }
    }

    /// Descriptor with no settling delays
    pub const fn immediate(chip_select: ChipSelectLine, mode: Mode) -> Self {
        Self::new(chip_select, mode, 0.0, 0.0)
    }

    /// Check that both delays are usable
    pub fn validate(&self) -> Result<(), SpiError> {
        if is_valid_delay(self.select_delay_us) && is_valid_delay(self.deselect_delay_us) {
            Ok(())
        } else {
            Err(SpiError::InvalidDelay)
        }
    }

    /// Select delay in whole nanoseconds, rounded up
    pub fn select_delay_ns(&self) -> u64 {
        us_to_ns(self.select_delay_us)
    }

    /// Deselect delay in whole nanoseconds, rounded up
    pub fn deselect_delay_ns(&self) -> u64 {
        us_to_ns(self.deselect_delay_us)
    }
}

fn is_valid_delay(us: f32) -> bool {
    us.is_finite() && us >= 0.0
}

/// Convert fractional microseconds to nanoseconds
///
/// Rounds up so the requested minimum is always honoured. Saturates at
/// `u64::MAX`; negative and NaN inputs map to zero.
pub fn us_to_ns(us: f32) -> u64 {
    let ns = us as f64 * 1000.0;
    if ns.is_nan() || ns <= 0.0 {
        return 0;
    }
    if ns >= u64::MAX as f64 {
        return u64::MAX;
    }
    let whole = ns as u64;
    if (whole as f64) < ns {
        whole + 1
    } else {
        whole
    }
}
