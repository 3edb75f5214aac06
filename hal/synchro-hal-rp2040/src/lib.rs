//! RP2040-specific HAL for the SPI master driver
//!
//! This crate provides RP2040 implementations of the shared
//! `synchro-hal` traits:
//!
//! - PL022 SSP peripheral as a [`ShiftRegister`](synchro_hal::ShiftRegister)
//! - SIO output latches as a [`ChipSelectPort`](synchro_hal::ChipSelectPort)
//! - GPIO allocation to catch pin conflicts in a slave table

#![no_std]

pub mod gpio;
pub mod spi;

pub use gpio::{GpioAllocator, SioPort};
pub use spi::Pl022;

// Re-export shared traits from synchro-hal for convenience
pub use synchro_hal::{ChipSelectPort, ShiftRegister};
