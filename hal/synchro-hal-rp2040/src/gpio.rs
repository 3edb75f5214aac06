//! Chip-select output latches and GPIO allocation
//!
//! Chip-select lines are driven through the SIO output set/clear registers,
//! so no pin handle has to be held per slave. Port 0 is the user bank
//! (GPIO0-29), port 1 the QSPI bank (6 pins).

use embassy_rp::pac;
use synchro_hal::{ChipSelectLine, ChipSelectPort};

/// Number of user GPIO pins on RP2040
pub const GPIO_COUNT: u8 = 30;

/// Number of QSPI bank pins
pub const QSPI_COUNT: u8 = 6;

/// SIO-backed chip-select port
///
/// Each line must already be an SIO output (for example an
/// `embassy_rp::gpio::Output` kept alive by the caller).
#[derive(Debug, Default)]
pub struct SioPort {
    _private: (),
}

impl SioPort {
    /// Create a new port handle
    pub const fn new() -> Self {
        Self { _private: () }
    }

    fn bank(line: ChipSelectLine) -> pac::sio::Gpio {
        pac::SIO.gpio_out(line.port as usize)
    }
}

impl ChipSelectPort for SioPort {
    fn supports(&self, line: ChipSelectLine) -> bool {
        match line.port {
            0 => line.pin < GPIO_COUNT,
            1 => line.pin < QSPI_COUNT,
            _ => false,
        }
    }

    fn set_high(&mut self, line: ChipSelectLine) {
        Self::bank(line).value_set().write_value(line.mask());
    }

    fn set_low(&mut self, line: ChipSelectLine) {
        Self::bank(line).value_clr().write_value(line.mask());
    }

    fn is_set_high(&self, line: ChipSelectLine) -> bool {
        Self::bank(line).value().read() & line.mask() != 0
    }
}

/// Error when claiming a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range (0-29 valid)
    InvalidPin(u8),
    /// Pin already claimed
    AlreadyTaken(u8),
}

/// GPIO allocator to track pin usage
///
/// Used at bring-up to check that no chip-select line collides with the
/// shared SPI lines or with another slave.
pub struct GpioAllocator {
    /// Bitmask of allocated GPIO pins
    allocated: u32,
}

impl Default for GpioAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioAllocator {
    /// Create a new GPIO allocator
    pub const fn new() -> Self {
        Self { allocated: 0 }
    }

    /// Allocate a GPIO pin
    pub fn allocate(&mut self, pin: u8) -> Result<(), PinError> {
        if pin >= GPIO_COUNT {
            return Err(PinError::InvalidPin(pin));
        }
        let mask = 1 << pin;
        if self.allocated & mask != 0 {
            return Err(PinError::AlreadyTaken(pin));
        }
        self.allocated |= mask;
        Ok(())
    }

    /// Allocate the pin behind a user-bank chip-select line
    pub fn allocate_line(&mut self, line: ChipSelectLine) -> Result<(), PinError> {
        if line.port != 0 {
            return Err(PinError::InvalidPin(line.pin));
        }
        self.allocate(line.pin)
    }

    /// Release a GPIO pin
    pub fn release(&mut self, pin: u8) {
        if pin < GPIO_COUNT {
            self.allocated &= !(1 << pin);
        }
    }

    /// Check if a pin is allocated
    pub fn is_allocated(&self, pin: u8) -> bool {
        pin < GPIO_COUNT && self.allocated & (1 << pin) != 0
    }

    /// Get the number of allocated pins
    pub fn allocated_count(&self) -> u32 {
        self.allocated.count_ones()
    }
}
