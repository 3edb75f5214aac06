//! Synchro Hardware Abstraction Layer
//!
//! This crate defines the hardware seams of the SPI master driver. A
//! chip-specific HAL implements them once and the board-agnostic driver in
//! `synchro-core` runs unchanged on top.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (synchro-firmware, etc.)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  synchro-core (registry, select, xfer)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  synchro-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ synchro-hal-  │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`spi::ShiftRegister`] - Control, status and data registers of the SPI peripheral
//! - [`gpio::ChipSelectPort`] - Output latches driving chip-select lines

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod spi;

// Re-export key traits at crate root for convenience
pub use gpio::{ChipSelectLine, ChipSelectPort};
pub use spi::{ControlBits, Mode, Phase, Polarity, ShiftRegister};
