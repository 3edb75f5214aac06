//! Slave table configuration
//!
//! Describes the bus clock setting and the slaves to register, typically
//! parsed from a TOML file embedded in the firmware:
//!
//! ```toml
//! [spi]
//! double_rate = true
//!
//! [slave.0]
//! name = "flash"
//! cs = "gpio17"
//! mode = 0
//! select_delay_us = 0.5
//! deselect_delay_us = 0.1
//! ```

mod parse;

use heapless::{String, Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use synchro_hal::{ChipSelectLine, Mode};

use crate::registry::MAX_SLAVES;
use crate::slave::SlaveDescriptor;

pub use parse::{parse_chip_select, parse_config, ParseError};

/// Maximum length of a slave name
pub const MAX_NAME_LEN: usize = 16;

/// Bus-wide configuration plus the slave table
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    /// Run the shift clock at double rate
    pub double_rate: bool,
    /// Slaves to register, in file order
    pub slaves: Vec<SlaveConfig, MAX_SLAVES>,
}

impl BusConfig {
    /// Create an empty config at default clock rate
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a slave by name
    pub fn slave(&self, name: &str) -> Option<&SlaveConfig> {
        self.slaves.iter().find(|s| s.name.as_str() == name)
    }
}

/// One `[slave.N]` section
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlaveConfig {
    /// Registry id (0-7)
    pub id: u8,
    /// Human-readable name
    pub name: String<MAX_NAME_LEN>,
    /// Chip-select line
    pub chip_select: ChipSelectLine,
    /// Bus mode
    pub mode: Mode,
    /// Settling time after select (us)
    pub select_delay_us: f32,
    /// Settling time after deselect (us)
    pub deselect_delay_us: f32,
}

impl SlaveConfig {
    /// Descriptor to register for this slave
    pub fn descriptor(&self) -> SlaveDescriptor {
        SlaveDescriptor::new(
            self.chip_select,
            self.mode,
            self.select_delay_us,
            self.deselect_delay_us,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slave_descriptor_from_config() {
        let slave = SlaveConfig {
            id: 2,
            name: String::try_from("adc").unwrap(),
            chip_select: ChipSelectLine::new(1, 3),
            mode: Mode::Mode3,
            select_delay_us: 1.25,
            deselect_delay_us: 0.5,
        };

        let desc = slave.descriptor();
        assert_eq!(desc.chip_select, ChipSelectLine::new(1, 3));
        assert_eq!(desc.mode, Mode::Mode3);
        assert_eq!(desc.select_delay_ns(), 1250);
        assert_eq!(desc.deselect_delay_ns(), 500);
    }

    #[test]
    fn test_lookup_by_name() {
        let mut config = BusConfig::new();
        let mut slave = SlaveConfig::default();
        slave.name = String::try_from("eeprom").unwrap();
        slave.id = 4;
        config.slaves.push(slave).unwrap();

        assert_eq!(config.slave("eeprom").map(|s| s.id), Some(4));
        assert!(config.slave("flash").is_none());
    }
}
