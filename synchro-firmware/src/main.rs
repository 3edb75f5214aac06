//! Synchro - blocking SPI master bring-up firmware
//!
//! Brings up SPI0 on an RP2040 board, registers the slaves listed in the
//! embedded slave table and periodically probes each of them.
//!
//! # Board wiring
//!
//! | Signal | GPIO |
//! |--------|------|
//! | SCK    | 18   |
//! | MOSI   | 19   |
//! | MISO   | 16   |
//! | CS     | 17, 20, 21 |

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_time::{Delay, Timer};
use heapless::Vec;
use {defmt_rtt as _, panic_probe as _};

use synchro_core::config::{parse_config, BusConfig, SlaveConfig};
use synchro_core::{SpiMaster, MAX_SLAVES};
use synchro_hal_rp2040::{GpioAllocator, Pl022, SioPort};

/// Embedded slave table (compiled into firmware)
/// Edit slaves.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../slaves.toml");

/// Default shift clock before doubling (Hz)
const SPI_FREQUENCY: u32 = 1_000_000;

/// GPIOs routed to the SSP
const SPI_PINS: [u8; 3] = [18, 19, 16];

/// GPIOs wired as chip-select outputs on this board
const BOARD_CS_PINS: [u8; 3] = [17, 20, 21];

/// Interval between bus probes
const PROBE_INTERVAL_SECS: u64 = 5;

/// Poll budget for one probe byte
const PROBE_MAX_POLLS: u32 = 10_000;

type Bus = SpiMaster<Pl022<'static>, SioPort, Delay>;

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Synchro firmware starting...");

    let p = embassy_rp::init(Default::default());

    // Chip-select outputs start deasserted and must outlive the master:
    // SioPort only toggles their output latches.
    let _cs_outputs = [
        Output::new(p.PIN_17, Level::High),
        Output::new(p.PIN_20, Level::High),
        Output::new(p.PIN_21, Level::High),
    ];

    let config = load_config();
    let slaves = usable_slaves(&config);

    let bus = BusConfig {
        double_rate: config.double_rate,
        slaves,
    };

    let spi = Pl022::new_spi0(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, SPI_FREQUENCY);
    let mut master: Bus = match SpiMaster::from_config(spi, SioPort::new(), Delay, &bus) {
        Ok(master) => master,
        Err(e) => {
            // Only reachable with a chip-select the parser accepted but SIO lacks
            defmt::panic!("Failed to register slaves: {}", e);
        }
    };

    info!(
        "SPI0 ready: {} slave(s), double_rate={}",
        master.registry().len(),
        bus.double_rate
    );

    loop {
        for slave in &bus.slaves {
            probe(&mut master, slave);
        }
        Timer::after_secs(PROBE_INTERVAL_SECS).await;
    }
}

/// Parse the embedded slave table, falling back to an empty bus
fn load_config() -> BusConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Loaded slave table: {} slave(s)", config.slaves.len());
            config
        }
        Err(e) => {
            error!("Invalid slave table: {}", e);
            BusConfig::default()
        }
    }
}

/// Keep only slaves whose chip-select is a board output not shared with
/// the SPI lines or another slave
fn usable_slaves(config: &BusConfig) -> Vec<SlaveConfig, MAX_SLAVES> {
    let mut alloc = GpioAllocator::new();
    for pin in SPI_PINS {
        if let Err(e) = alloc.allocate(pin) {
            warn!("SPI pin {} unavailable: {}", pin, e);
        }
    }

    let mut usable = Vec::new();
    for slave in &config.slaves {
        let line = slave.chip_select;
        if line.port != 0 || !BOARD_CS_PINS.contains(&line.pin) {
            warn!(
                "Slave {} ({}): P{}.{} is not a board chip-select, skipping",
                slave.id,
                slave.name.as_str(),
                line.port,
                line.pin
            );
            continue;
        }
        if let Err(e) = alloc.allocate_line(line) {
            warn!("Slave {} ({}): {}, skipping", slave.id, slave.name.as_str(), e);
            continue;
        }
        // Capacity matches the parsed table, so this cannot overflow
        let _ = usable.push(slave.clone());
    }
    usable
}

/// Clock one idle byte out of a slave and log what came back
fn probe(master: &mut Bus, slave: &SlaveConfig) {
    match master.transaction(slave.id, |session| session.write_byte_bounded(0x00, PROBE_MAX_POLLS)) {
        Ok(Ok(byte)) => debug!("Slave {} ({}): {:#x}", slave.id, slave.name.as_str(), byte),
        Ok(Err(e)) | Err(e) => warn!("Slave {} ({}): {}", slave.id, slave.name.as_str(), e),
    }
}
