//! Test doubles for the hardware seams
//!
//! The shift register, port and delay share one [`EventLog`] so tests can
//! assert the ordering of control writes, chip-select edges, data loads and
//! delays.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use synchro_hal::{ChipSelectLine, ChipSelectPort, ControlBits, ShiftRegister};

use crate::master::SpiMaster;

/// Observable hardware event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    PinsConfigured,
    Control(u8),
    DoubleRate(bool),
    Data(u8),
    CsHigh(ChipSelectLine),
    CsLow(ChipSelectLine),
    DelayNs(u32),
}

/// Shared, ordered event record
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<Event>>>);

impl EventLog {
    fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Bytes loaded into the data register, in order
    pub fn data_bytes(&self) -> Vec<u8> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Data(b) => Some(*b),
                _ => None,
            })
            .collect()
    }
}

/// Scripted shift register
///
/// Bytes queued with [`queue_input`](Self::queue_input) are shifted in one
/// per exchange; an empty queue reads as an idle-high line (0xFF).
pub struct MockShiftRegister {
    log: EventLog,
    control: Cell<u8>,
    double_rate: bool,
    pins_configured: bool,
    input: RefCell<VecDeque<u8>>,
    in_flight: Cell<Option<u8>>,
    busy_polls: Cell<u32>,
    remaining: Cell<u32>,
    stuck: Cell<bool>,
    polls: Cell<u32>,
    exchanges: Cell<u32>,
}

impl MockShiftRegister {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            control: Cell::new(0),
            double_rate: false,
            pins_configured: false,
            input: RefCell::new(VecDeque::new()),
            in_flight: Cell::new(None),
            busy_polls: Cell::new(0),
            remaining: Cell::new(0),
            stuck: Cell::new(false),
            polls: Cell::new(0),
            exchanges: Cell::new(0),
        }
    }

    pub fn queue_input(&self, bytes: &[u8]) {
        self.input.borrow_mut().extend(bytes.iter().copied());
    }

    /// Number of incomplete polls before each exchange completes
    pub fn set_busy_polls(&self, polls: u32) {
        self.busy_polls.set(polls);
    }

    /// Never raise the transfer-complete flag
    pub fn set_stuck(&self, stuck: bool) {
        self.stuck.set(stuck);
    }

    /// Overwrite the clock-rate field as if set by other code
    pub fn force_rate_bits(&self, rate: u8) {
        let bits = (self.control.get() & !ControlBits::RATE_MASK) | (rate & ControlBits::RATE_MASK);
        self.control.set(bits);
    }

    pub fn pins_configured(&self) -> bool {
        self.pins_configured
    }

    pub fn polls(&self) -> u32 {
        self.polls.get()
    }

    pub fn exchanges(&self) -> u32 {
        self.exchanges.get()
    }
}

impl ShiftRegister for MockShiftRegister {
    fn configure_pins(&mut self) {
        self.pins_configured = true;
        self.log.push(Event::PinsConfigured);
    }

    fn control(&self) -> ControlBits {
        ControlBits::from_bits(self.control.get())
    }

    fn set_control(&mut self, bits: ControlBits) {
        self.control.set(bits.bits());
        self.log.push(Event::Control(bits.bits()));
    }

    fn set_double_rate(&mut self, enabled: bool) {
        self.double_rate = enabled;
        self.log.push(Event::DoubleRate(enabled));
    }

    fn is_double_rate(&self) -> bool {
        self.double_rate
    }

    fn write_data(&mut self, byte: u8) {
        self.log.push(Event::Data(byte));
        let received = self.input.borrow_mut().pop_front().unwrap_or(0xFF);
        self.in_flight.set(Some(received));
        self.remaining.set(self.busy_polls.get());
        self.exchanges.set(self.exchanges.get() + 1);
    }

    fn transfer_complete(&self) -> bool {
        self.polls.set(self.polls.get() + 1);
        if self.stuck.get() || self.in_flight.get().is_none() {
            return false;
        }
        match self.remaining.get() {
            0 => true,
            n => {
                self.remaining.set(n - 1);
                false
            }
        }
    }

    fn read_data(&mut self) -> u8 {
        self.in_flight.take().unwrap_or(0xFF)
    }
}

/// Output latches for up to four 32-pin ports, all low at reset
pub struct MockPort {
    log: EventLog,
    latches: [u32; 4],
}

impl MockPort {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            latches: [0; 4],
        }
    }
}

impl ChipSelectPort for MockPort {
    fn supports(&self, line: ChipSelectLine) -> bool {
        (line.port as usize) < self.latches.len() && line.pin < 32
    }

    fn set_high(&mut self, line: ChipSelectLine) {
        self.latches[line.port as usize] |= line.mask();
        self.log.push(Event::CsHigh(line));
    }

    fn set_low(&mut self, line: ChipSelectLine) {
        self.latches[line.port as usize] &= !line.mask();
        self.log.push(Event::CsLow(line));
    }

    fn is_set_high(&self, line: ChipSelectLine) -> bool {
        self.latches[line.port as usize] & line.mask() != 0
    }
}

/// Delay that records every request instead of sleeping
pub struct MockDelay {
    log: EventLog,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.push(Event::DelayNs(ns));
    }
}

pub type MockMaster = SpiMaster<MockShiftRegister, MockPort, MockDelay>;

/// Fresh hardware parts sharing one log
pub fn parts() -> (MockShiftRegister, MockPort, MockDelay, EventLog) {
    let log = EventLog::default();
    (
        MockShiftRegister::new(log.clone()),
        MockPort::new(log.clone()),
        MockDelay { log: log.clone() },
        log,
    )
}

/// Initialized master over fresh mocks
pub fn mock_master(double_rate: bool) -> (MockMaster, EventLog) {
    let (hw, port, delay, log) = parts();
    (SpiMaster::init(hw, port, delay, double_rate), log)
}
