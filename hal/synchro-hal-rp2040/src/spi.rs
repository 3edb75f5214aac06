//! PL022 SSP peripheral as a shift register
//!
//! The RP2040 has two ARM PL022 synchronous serial ports. This module drives
//! one in Motorola SPI frame format, 8-bit data, master mode, with exactly
//! one byte in the FIFOs at any time.
//!
//! Control bit mapping:
//!
//! | ControlBits | PL022             |
//! |-------------|-------------------|
//! | ENABLE      | SSPCR1.SSE        |
//! | MASTER      | !SSPCR1.MS        |
//! | CPOL        | SSPCR0.SPO        |
//! | CPHA        | SSPCR0.SPH        |
//! | RATE        | (none, reads 0)   |
//!
//! Double rate halves the SSPCPSR prescaler chosen at construction.

use core::marker::PhantomData;

use embassy_rp::gpio::Pin as _;
use embassy_rp::pac;
use embassy_rp::peripherals::{SPI0, SPI1};
use embassy_rp::spi::{ClkPin, MisoPin, MosiPin};
use embassy_rp::Peri;
use synchro_hal::{ControlBits, ShiftRegister};

/// IO_BANK0 function select for SPI
const FUNCSEL_SPI: u8 = 1;

/// SSPCR0.DSS value for 8-bit frames
const DSS_8BIT: u8 = 0b0111;

/// Largest SSPCPSR value that still halves to an even divisor
const MAX_PRESCALE: u32 = 252;

/// Smallest default-rate prescaler (halves to the PL022 minimum of 2)
const MIN_PRESCALE: u32 = 4;

/// PL022 SSP in master mode
pub struct Pl022<'d> {
    regs: pac::spi::Spi,
    pins: [u8; 3],
    prescale: u8,
    double_rate: bool,
    _peri: PhantomData<&'d ()>,
}

impl<'d> Pl022<'d> {
    /// Take SPI0 with its clock, data-out and data-in pins
    ///
    /// `frequency` is the default (non-doubled) shift clock in Hz.
    pub fn new_spi0(
        _spi: Peri<'d, SPI0>,
        sck: Peri<'d, impl ClkPin<SPI0>>,
        mosi: Peri<'d, impl MosiPin<SPI0>>,
        miso: Peri<'d, impl MisoPin<SPI0>>,
        frequency: u32,
    ) -> Self {
        pac::RESETS.reset().modify(|w| w.set_spi0(false));
        while !pac::RESETS.reset_done().read().spi0() {}
        Self::new_inner(pac::SPI0, [sck.pin(), mosi.pin(), miso.pin()], frequency)
    }

    /// Take SPI1 with its clock, data-out and data-in pins
    ///
    /// `frequency` is the default (non-doubled) shift clock in Hz.
    pub fn new_spi1(
        _spi: Peri<'d, SPI1>,
        sck: Peri<'d, impl ClkPin<SPI1>>,
        mosi: Peri<'d, impl MosiPin<SPI1>>,
        miso: Peri<'d, impl MisoPin<SPI1>>,
        frequency: u32,
    ) -> Self {
        pac::RESETS.reset().modify(|w| w.set_spi1(false));
        while !pac::RESETS.reset_done().read().spi1() {}
        Self::new_inner(pac::SPI1, [sck.pin(), mosi.pin(), miso.pin()], frequency)
    }

    fn new_inner(regs: pac::spi::Spi, pins: [u8; 3], frequency: u32) -> Self {
        let (prescale, scr) = clock_divisors(embassy_rp::clocks::clk_peri_freq(), frequency);

        regs.cr1().write(|w| w.set_sse(false));
        regs.cpsr().write(|w| w.set_cpsdvsr(prescale));
        regs.cr0().write(|w| {
            w.set_dss(DSS_8BIT);
            w.set_frf(0);
            w.set_scr(scr);
        });

        Self {
            regs,
            pins,
            prescale,
            double_rate: false,
            _peri: PhantomData,
        }
    }

    /// GPIO numbers of SCK, MOSI and MISO
    pub fn pins(&self) -> [u8; 3] {
        self.pins
    }

    fn drain_rx(&mut self) {
        while self.regs.sr().read().rne() {
            let _ = self.regs.dr().read();
        }
    }
}

impl ShiftRegister for Pl022<'_> {
    fn configure_pins(&mut self) {
        // SIO drives nothing on these pins once FUNCSEL points at the SSP
        for pin in self.pins {
            pac::IO_BANK0
                .gpio(pin as usize)
                .ctrl()
                .write(|w| w.set_funcsel(FUNCSEL_SPI));
        }
    }

    fn control(&self) -> ControlBits {
        let cr0 = self.regs.cr0().read();
        let cr1 = self.regs.cr1().read();

        let mut bits = ControlBits::default();
        if cr1.sse() {
            bits = bits.with(ControlBits::ENABLE);
        }
        if !cr1.ms() {
            bits = bits.with(ControlBits::MASTER);
        }
        if cr0.spo() {
            bits = bits.with(ControlBits::CPOL);
        }
        if cr0.sph() {
            bits = bits.with(ControlBits::CPHA);
        }
        bits
    }

    fn set_control(&mut self, bits: ControlBits) {
        // Frame format may only change while the port is disabled
        self.regs.cr1().modify(|w| w.set_sse(false));
        self.regs.cr0().modify(|w| {
            w.set_spo(bits.contains(ControlBits::CPOL));
            w.set_sph(bits.contains(ControlBits::CPHA));
        });
        self.drain_rx();
        self.regs.cr1().write(|w| {
            w.set_ms(!bits.contains(ControlBits::MASTER));
            w.set_sse(bits.contains(ControlBits::ENABLE));
        });
    }

    fn set_double_rate(&mut self, enabled: bool) {
        let prescale = if enabled {
            self.prescale / 2
        } else {
            self.prescale
        };
        self.regs.cpsr().write(|w| w.set_cpsdvsr(prescale));
        self.double_rate = enabled;
    }

    fn is_double_rate(&self) -> bool {
        self.double_rate
    }

    fn write_data(&mut self, byte: u8) {
        self.regs.dr().write(|w| w.set_data(byte as u16));
    }

    fn transfer_complete(&self) -> bool {
        // One byte out means exactly one byte back in the receive FIFO
        self.regs.sr().read().rne()
    }

    fn read_data(&mut self) -> u8 {
        self.regs.dr().read().data() as u8
    }
}

/// Pick SSPCPSR and SSPCR0.SCR for the requested default clock
///
/// Bit rate = clk_peri / (CPSDVSR * (1 + SCR)). The prescaler is kept a
/// multiple of four so that halving it for double rate stays even.
pub fn clock_divisors(clk_peri: u32, frequency: u32) -> (u8, u8) {
    let frequency = frequency.max(1);
    let total = clk_peri.div_ceil(frequency).max(MIN_PRESCALE);

    for scr in 0u32..=255 {
        let prescale = total.div_ceil(scr + 1).next_multiple_of(4).max(MIN_PRESCALE);
        if prescale <= MAX_PRESCALE {
            return (prescale as u8, scr as u8);
        }
    }
    (MAX_PRESCALE as u8, 255)
}
