//! Board-agnostic SPI master driver
//!
//! This crate contains everything above raw register access:
//!
//! - Slave descriptors and the eight-slot registry
//! - Peripheral initialization and bus-mode switching
//! - The select/deselect timing protocol, as a [`SlaveSession`] guard
//! - Blocking byte transfer primitives
//! - Slave table configuration parsing
//!
//! # Usage
//!
//! ```ignore
//! let mut spi = SpiMaster::init(shift_register, port, delay, false);
//! spi.register_slave(0, SlaveDescriptor::new(ChipSelectLine::new(1, 4), Mode::Mode1, 5.0, 2.0))?;
//!
//! let mut session = spi.select(0)?;
//! let status = session.write_byte(0x05);
//! session.deselect();
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod error;
pub mod master;
pub mod registry;
pub mod session;
pub mod slave;

#[cfg(test)]
mod mock;

pub use error::SpiError;
pub use master::SpiMaster;
pub use registry::{SlaveRegistry, MAX_SLAVES};
pub use session::{SlaveSession, MAX_BLOCK_LEN};
pub use slave::{SlaveDescriptor, SlaveId};

// Re-export HAL types that appear in this crate's API
pub use synchro_hal::{ChipSelectLine, ChipSelectPort, ControlBits, Mode, ShiftRegister};
