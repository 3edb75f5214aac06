//! Minimal TOML parser for the slave table
//!
//! Handles only the subset the slave table needs. It does NOT support the
//! full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, float, boolean)
//! - `[spi]` and `[slave.N]` section headers
//! - Comments (# ...), including trailing comments
//!
//! NOT supported:
//! - Arrays and inline tables
//! - Multi-line strings
//! - Dotted keys

use heapless::String;

use synchro_hal::{ChipSelectLine, Mode};

use super::{BusConfig, SlaveConfig};
use crate::registry::MAX_SLAVES;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Value does not have the expected type or range
    InvalidValue,
    /// Chip-select string not recognised
    InvalidPin,
    /// Key not valid in the current section
    UnknownKey,
    /// Required key absent from a section
    MissingKey,
    /// Same slave id declared twice
    DuplicateSlave,
    /// More slaves than the registry holds, or a string too long
    TooManyItems,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Spi,
    Slave,
}

/// Parse TOML text into a [`BusConfig`]
pub fn parse_config(input: &str) -> Result<BusConfig, ParseError> {
    let mut config = BusConfig::new();
    let mut section = Section::Root;
    let mut current: Option<SlaveConfig> = None;
    let mut has_cs = false;

    for line in input.lines() {
        let line = strip_comment(line).trim();

        // Skip empty lines and comments
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            if let Some(slave) = current.take() {
                push_slave(&mut config, slave, has_cs)?;
            }
            has_cs = false;

            let header = line[1..line.len() - 1].trim();
            section = if header == "spi" {
                Section::Spi
            } else if let Some(id) = header.strip_prefix("slave.") {
                let id = parse_int(id)?;
                if id as usize >= MAX_SLAVES {
                    return Err(ParseError::InvalidSection);
                }
                current = Some(SlaveConfig {
                    id,
                    ..SlaveConfig::default()
                });
                Section::Slave
            } else {
                return Err(ParseError::InvalidSection);
            };
            continue;
        }

        let (key, value) = line.split_once('=').ok_or(ParseError::InvalidValue)?;
        let key = key.trim();
        let value = value.trim();

        match section {
            Section::Root => return Err(ParseError::UnknownKey),
            Section::Spi => match key {
                "double_rate" => config.double_rate = parse_bool(value)?,
                _ => return Err(ParseError::UnknownKey),
            },
            Section::Slave => {
                let slave = current.as_mut().ok_or(ParseError::InvalidSection)?;
                apply_slave_key(slave, key, value)?;
                has_cs |= key == "cs";
            }
        }
    }

    if let Some(slave) = current.take() {
        push_slave(&mut config, slave, has_cs)?;
    }

    Ok(config)
}

fn apply_slave_key(slave: &mut SlaveConfig, key: &str, value: &str) -> Result<(), ParseError> {
    match key {
        "name" => {
            slave.name = String::try_from(parse_string(value)?).map_err(|_| ParseError::TooManyItems)?;
        }
        "cs" => slave.chip_select = parse_chip_select(parse_string(value)?)?,
        "mode" => {
            slave.mode = Mode::from_number(parse_int(value)?).ok_or(ParseError::InvalidValue)?;
        }
        "select_delay_us" => slave.select_delay_us = parse_delay(value)?,
        "deselect_delay_us" => slave.deselect_delay_us = parse_delay(value)?,
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

fn push_slave(config: &mut BusConfig, slave: SlaveConfig, has_cs: bool) -> Result<(), ParseError> {
    // A default chip-select would silently drive GPIO0
    if !has_cs {
        return Err(ParseError::MissingKey);
    }
    if config.slaves.iter().any(|s| s.id == slave.id) {
        return Err(ParseError::DuplicateSlave);
    }
    config
        .slaves
        .push(slave)
        .map_err(|_| ParseError::TooManyItems)
}

/// Parse a chip-select string
///
/// Supports formats:
/// - "gpio17" -> port 0, pin 17
/// - "PB4" -> port 1 (A=0, B=1, ...), pin 4
pub fn parse_chip_select(s: &str) -> Result<ChipSelectLine, ParseError> {
    let s = s.trim();

    if let Some(num) = s.strip_prefix("gpio") {
        let pin: u8 = num.parse().map_err(|_| ParseError::InvalidPin)?;
        if pin >= 32 {
            return Err(ParseError::InvalidPin);
        }
        return Ok(ChipSelectLine::new(0, pin));
    }

    let mut chars = s.chars();
    if chars.next() != Some('P') {
        return Err(ParseError::InvalidPin);
    }
    let port = chars.next().ok_or(ParseError::InvalidPin)?;
    if !port.is_ascii_uppercase() {
        return Err(ParseError::InvalidPin);
    }
    let pin: u8 = chars.as_str().parse().map_err(|_| ParseError::InvalidPin)?;
    if pin >= 32 {
        return Err(ParseError::InvalidPin);
    }

    Ok(ChipSelectLine::new(port as u8 - b'A', pin))
}

fn strip_comment(line: &str) -> &str {
    // '#' inside a quoted string is kept
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

fn parse_string(value: &str) -> Result<&str, ParseError> {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or(ParseError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_int(value: &str) -> Result<u8, ParseError> {
    value.trim().parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_delay(value: &str) -> Result<f32, ParseError> {
    let us: f32 = value.parse().map_err(|_| ParseError::InvalidValue)?;
    if us.is_finite() && us >= 0.0 {
        Ok(us)
    } else {
        Err(ParseError::InvalidValue)
    }
}
