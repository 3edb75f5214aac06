//! SPI master
//!
//! Owns the shift-register peripheral, the chip-select port, the delay
//! provider and the slave registry. All bus access goes through this type,
//! so every call is a critical section by ownership.
//!
//! # Protocol
//!
//! ```text
//! init ──► register_slave(id, desc)    CS(id) := high
//!             │
//!             ▼
//!          select(id)                  mode bits := desc.mode
//!             │                        CS(id) := low
//!             │                        wait select_delay
//!             ▼
//!          SlaveSession ── write_byte / write_bytes / read_byte / read_bytes
//!             │
//!             ▼
//!          deselect() or drop          CS(id) := high
//!                                      wait deselect_delay
//! ```

use embedded_hal::delay::DelayNs;
use synchro_hal::{ChipSelectPort, ControlBits, ShiftRegister};

use crate::config::BusConfig;
use crate::error::SpiError;
use crate::registry::SlaveRegistry;
use crate::session::SlaveSession;
use crate::slave::{SlaveDescriptor, SlaveId};

/// Blocking SPI master with up to eight registered slaves
pub struct SpiMaster<R, P, D> {
    hw: R,
    port: P,
    delay: D,
    registry: SlaveRegistry,
}

impl<R, P, D> SpiMaster<R, P, D>
where
    R: ShiftRegister,
    P: ChipSelectPort,
    D: DelayNs,
{
    /// Initialize the peripheral and take ownership of the bus
    ///
    /// Routes the shared clock/data lines, enables the peripheral in master
    /// mode and selects the shift clock rate. `double_rate` doubles the
    /// default clock. No chip-select line is touched.
    pub fn init(mut hw: R, port: P, delay: D, double_rate: bool) -> Self {
        hw.configure_pins();

        let control = hw.control().with(ControlBits::ENABLE | ControlBits::MASTER);
        hw.set_control(control);
        hw.set_double_rate(double_rate);

        debug!("spi: master enabled, double_rate={}", double_rate);

        Self {
            hw,
            port,
            delay,
            registry: SlaveRegistry::new(),
        }
    }

    /// Initialize the bus and register every slave from a parsed config
    pub fn from_config(hw: R, port: P, delay: D, config: &BusConfig) -> Result<Self, SpiError> {
        let mut master = Self::init(hw, port, delay, config.double_rate);
        master.apply_config(config)?;
        Ok(master)
    }

    /// Register every slave listed in the config
    ///
    /// Stops at the first slave that fails to register; slaves before it
    /// stay registered.
    pub fn apply_config(&mut self, config: &BusConfig) -> Result<(), SpiError> {
        for slave in &config.slaves {
            self.register_slave(slave.id, slave.descriptor())?;
        }
        Ok(())
    }

    /// Register a slave under `id` and deassert its chip-select line
    ///
    /// The descriptor is copied. Registering an id again replaces the
    /// previous descriptor; the new one takes effect on the next select.
    pub fn register_slave(&mut self, id: u8, descriptor: SlaveDescriptor) -> Result<(), SpiError> {
        let id = SlaveId::new(id)?;
        if !self.port.supports(descriptor.chip_select) {
            return Err(SpiError::InvalidChipSelect);
        }
        descriptor.validate()?;

        self.registry.insert(id, descriptor);
        self.port.set_high(descriptor.chip_select);

        debug!(
            "spi: slave {} on P{}.{} mode {}",
            id.get(),
            descriptor.chip_select.port,
            descriptor.chip_select.pin,
            descriptor.mode.number()
        );
        Ok(())
    }

    /// Select slave `id` and return the session guarding the selection
    ///
    /// Applies the slave's bus mode (only the mode bits change), asserts
    /// chip-select and blocks for the select delay. The session mutably
    /// borrows the master, so no other slave can be selected until it is
    /// deselected or dropped.
    pub fn select(&mut self, id: u8) -> Result<SlaveSession<'_, R, P, D>, SpiError> {
        let id = SlaveId::new(id)?;
        let descriptor = self.registry.require(id)?;

        let control = self.hw.control().with_mode(descriptor.mode);
        self.hw.set_control(control);

        self.port.set_low(descriptor.chip_select);
        wait_ns(&mut self.delay, descriptor.select_delay_ns());

        trace!("spi: select {}", id.get());
        Ok(SlaveSession::new(self, id, descriptor))
    }

    /// Run `f` with slave `id` selected, deselecting afterwards
    pub fn transaction<T>(
        &mut self,
        id: u8,
        f: impl FnOnce(&mut SlaveSession<'_, R, P, D>) -> T,
    ) -> Result<T, SpiError> {
        let mut session = self.select(id)?;
        let out = f(&mut session);
        session.deselect();
        Ok(out)
    }

    /// Descriptor registered for `id`
    pub fn descriptor(&self, id: u8) -> Result<SlaveDescriptor, SpiError> {
        self.registry.require(SlaveId::new(id)?)
    }

    /// Check whether slave `id`'s chip-select line is currently asserted
    pub fn is_selected(&self, id: u8) -> Result<bool, SpiError> {
        let descriptor = self.descriptor(id)?;
        Ok(self.port.is_set_low(descriptor.chip_select))
    }

    /// Current peripheral control bits
    pub fn control_bits(&self) -> ControlBits {
        self.hw.control()
    }

    /// The slave registry
    pub fn registry(&self) -> &SlaveRegistry {
        &self.registry
    }

    /// The underlying shift register
    pub fn shift_register(&self) -> &R {
        &self.hw
    }

    /// The underlying chip-select port
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Give back the hardware parts
    pub fn release(self) -> (R, P, D) {
        (self.hw, self.port, self.delay)
    }

    /// Deassert the line and wait out the deselect delay
    pub(crate) fn finish(&mut self, id: SlaveId, descriptor: &SlaveDescriptor) {
        self.port.set_high(descriptor.chip_select);
        wait_ns(&mut self.delay, descriptor.deselect_delay_ns());
        trace!("spi: deselect {}", id.get());
    }

    /// Exchange one byte, polling the transfer-complete flag until it sets
    pub(crate) fn exchange(&mut self, byte: u8) -> u8 {
        self.hw.write_data(byte);
        while !self.hw.transfer_complete() {
            core::hint::spin_loop();
        }
        self.hw.read_data()
    }

    /// Exchange one byte, polling the transfer-complete flag at most
    /// `max_polls` times
    pub(crate) fn exchange_bounded(&mut self, byte: u8, max_polls: u32) -> Result<u8, SpiError> {
        self.hw.write_data(byte);
        for _ in 0..max_polls {
            if self.hw.transfer_complete() {
                return Ok(self.hw.read_data());
            }
            core::hint::spin_loop();
        }
        warn!("spi: transfer timed out after {} polls", max_polls);
        Err(SpiError::Timeout)
    }
}

/// Block for `ns` nanoseconds, in `u32`-sized steps
///
/// Always issues at least one `delay_ns` call.
fn wait_ns<D: DelayNs>(delay: &mut D, mut ns: u64) {
    loop {
        let step = ns.min(u32::MAX as u64) as u32;
        delay.delay_ns(step);
        ns -= step as u64;
        if ns == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{mock_master, Event};
    use synchro_hal::{ChipSelectLine, Mode};

    const CS0: ChipSelectLine = ChipSelectLine::new(1, 0);
    const CS7: ChipSelectLine = ChipSelectLine::new(1, 7);

    #[test]
    fn test_init_enables_master() {
        let (spi, log) = mock_master(false);
        let control = spi.control_bits();

        assert!(control.contains(ControlBits::ENABLE | ControlBits::MASTER));
        assert!(!spi.shift_register().is_double_rate());
        assert!(spi.shift_register().pins_configured());
        // No chip-select line is touched by init
        assert!(!log.events().iter().any(|e| matches!(e, Event::CsHigh(_) | Event::CsLow(_))));
    }

    #[test]
    fn test_init_double_rate() {
        let (spi, _) = mock_master(true);
        assert!(spi.shift_register().is_double_rate());
    }

    #[test]
    fn test_register_deasserts_line() {
        let (mut spi, log) = mock_master(false);
        assert!(spi.port().is_set_low(CS0));

        spi.register_slave(0, SlaveDescriptor::new(CS0, Mode::Mode1, 5.0, 2.0))
            .unwrap();

        assert!(spi.port().is_set_high(CS0));
        assert_eq!(spi.is_selected(0), Ok(false));
        assert_eq!(log.events().last(), Some(&Event::CsHigh(CS0)));
    }

    #[test]
    fn test_register_all_ids_deasserted() {
        let (mut spi, _) = mock_master(false);
        for id in 0..8u8 {
            let line = ChipSelectLine::new(2, id);
            spi.register_slave(id, SlaveDescriptor::immediate(line, Mode::Mode0))
                .unwrap();
        }
        for id in 0..8u8 {
            assert_eq!(spi.is_selected(id), Ok(false));
        }
        assert_eq!(spi.registry().len(), 8);
    }

    #[test]
    fn test_register_rejects_bad_input() {
        let (mut spi, _) = mock_master(false);

        assert_eq!(
            spi.register_slave(8, SlaveDescriptor::immediate(CS0, Mode::Mode0)),
            Err(SpiError::InvalidSlaveId(8))
        );
        assert_eq!(
            spi.register_slave(0, SlaveDescriptor::immediate(ChipSelectLine::new(9, 0), Mode::Mode0)),
            Err(SpiError::InvalidChipSelect)
        );
        assert_eq!(
            spi.register_slave(0, SlaveDescriptor::new(CS0, Mode::Mode0, -0.5, 0.0)),
            Err(SpiError::InvalidDelay)
        );
        assert!(spi.registry().is_empty());
    }

    #[test]
    fn test_select_unknown_slave() {
        let (mut spi, _) = mock_master(false);
        assert_eq!(spi.select(3).err(), Some(SpiError::SlaveNotRegistered(3)));
        assert_eq!(spi.select(12).err(), Some(SpiError::InvalidSlaveId(12)));
    }

    #[test]
    fn test_select_sequence() {
        let (mut spi, log) = mock_master(false);
        spi.register_slave(0, SlaveDescriptor::new(CS0, Mode::Mode1, 5.0, 2.0))
            .unwrap();
        log.clear();

        let before = spi.control_bits();
        let session = spi.select(0).unwrap();
        let events = log.events();

        let expected_control = before.with_mode(Mode::Mode1).bits();
        assert_eq!(
            events,
            vec![
                Event::Control(expected_control),
                Event::CsLow(CS0),
                Event::DelayNs(5000),
            ]
        );
        drop(session);
    }

    #[test]
    fn test_select_then_deselect_releases_line() {
        let (mut spi, log) = mock_master(false);
        spi.register_slave(0, SlaveDescriptor::new(CS0, Mode::Mode1, 5.0, 2.0))
            .unwrap();

        let session = spi.select(0).unwrap();
        assert!(session.is_asserted());
        session.deselect();

        assert_eq!(spi.is_selected(0), Ok(false));
        let events = log.events();
        assert_eq!(
            &events[events.len() - 2..],
            &[Event::CsHigh(CS0), Event::DelayNs(2000)]
        );
    }

    #[test]
    fn test_mode_bits_follow_descriptor() {
        let (mut spi, _) = mock_master(true);
        for (id, mode) in [Mode::Mode0, Mode::Mode1, Mode::Mode2, Mode::Mode3]
            .into_iter()
            .enumerate()
        {
            let line = ChipSelectLine::new(1, id as u8);
            spi.register_slave(id as u8, SlaveDescriptor::immediate(line, mode))
                .unwrap();
        }

        for id in [3u8, 0, 2, 1] {
            let before = spi.control_bits();
            let session = spi.select(id).unwrap();
            let mode = session.descriptor().mode;
            session.deselect();

            let after = spi.control_bits();
            assert_eq!(after.mode(), mode);
            assert_eq!(
                after.bits() & !ControlBits::MODE_MASK,
                before.bits() & !ControlBits::MODE_MASK
            );
        }
        assert!(spi.shift_register().is_double_rate());
    }

    #[test]
    fn test_reregister_takes_effect_on_next_select() {
        let (mut spi, log) = mock_master(false);
        spi.register_slave(7, SlaveDescriptor::new(CS0, Mode::Mode0, 1.0, 1.0))
            .unwrap();
        spi.register_slave(7, SlaveDescriptor::new(CS7, Mode::Mode3, 3.0, 4.0))
            .unwrap();
        log.clear();

        spi.transaction(7, |_| ()).unwrap();

        assert_eq!(spi.control_bits().mode(), Mode::Mode3);
        let events = log.events();
        assert!(events.contains(&Event::CsLow(CS7)));
        assert!(!events.contains(&Event::CsLow(CS0)));
        assert!(events.contains(&Event::DelayNs(3000)));
        assert!(events.contains(&Event::DelayNs(4000)));
    }

    #[test]
    fn test_transaction_returns_closure_value() {
        let (mut spi, log) = mock_master(false);
        spi.register_slave(0, SlaveDescriptor::immediate(CS0, Mode::Mode0))
            .unwrap();
        spi.shift_register().queue_input(&[0x3C]);

        let value = spi.transaction(0, |s| s.read_byte()).unwrap();

        assert_eq!(value, 0x3C);
        assert_eq!(spi.is_selected(0), Ok(false));
        assert_eq!(log.events().last(), Some(&Event::DelayNs(0)));
    }

    #[test]
    fn test_from_config() {
        let config = crate::config::parse_config(
            r#"
[spi]
double_rate = true

[slave.1]
cs = "PB4"
mode = 2
select_delay_us = 1.5
"#,
        )
        .unwrap();

        let (hw, port, delay, _) = crate::mock::parts();
        let spi = SpiMaster::from_config(hw, port, delay, &config).unwrap();

        assert!(spi.shift_register().is_double_rate());
        let desc = spi.descriptor(1).unwrap();
        assert_eq!(desc.mode, Mode::Mode2);
        assert_eq!(desc.chip_select, ChipSelectLine::new(1, 4));
        assert_eq!(spi.is_selected(1), Ok(false));
    }

    #[test]
    fn test_long_delays_are_not_truncated() {
        let (mut spi, log) = mock_master(false);
        spi.register_slave(0, SlaveDescriptor::new(CS0, Mode::Mode0, 10_000_000.0, 4_294_968.0))
            .unwrap();
        log.clear();

        let session = spi.select(0).unwrap();
        let select_total: u64 = log
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::DelayNs(ns) => Some(*ns as u64),
                _ => None,
            })
            .sum();
        assert_eq!(select_total, 10_000_000_000);

        log.clear();
        session.deselect();
        // 4_294_968_000 ns is 705 ns past u32::MAX, so it takes two steps
        assert_eq!(
            log.events(),
            vec![
                Event::CsHigh(CS0),
                Event::DelayNs(u32::MAX),
                Event::DelayNs(705),
            ]
        );
    }

    #[test]
    fn test_release_returns_parts() {
        let (spi, _) = mock_master(false);
        let (hw, _port, _delay) = spi.release();
        assert!(hw.control().contains(ControlBits::ENABLE));
    }
}
