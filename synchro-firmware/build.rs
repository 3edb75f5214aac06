//! Build script for synchro-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates slaves.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

/// Slave ids the registry can hold
const MAX_SLAVES: i64 = 8;

/// Defined bus modes
const MAX_MODE: i64 = 3;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths and scripts
fn setup_linker() {
    let out = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    File::create(out.join("memory.x"))
        .and_then(|mut f| f.write_all(include_bytes!("memory.x")))
        .unwrap();
    println!("cargo:rustc-link-search={}", out.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate the slave table at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=slaves.toml");

    let content = fs::read_to_string("slaves.toml")
        .unwrap_or_else(|e| fail("cannot read slaves.toml", &[e.to_string()]));

    let config: toml::Value = toml::from_str(&content).unwrap_or_else(|e| {
        let lines: Vec<String> = e.to_string().lines().map(str::to_string).collect();
        fail("slaves.toml is not valid TOML", &lines)
    });

    let mut errors = Vec::new();
    if let Some(table) = config.as_table() {
        for key in table.keys() {
            if key != "spi" && key != "slave" {
                errors.push(format!("[{}] is not a known section", key));
            }
        }
    }
    validate_spi(&config, &mut errors);
    validate_slaves(&config, &mut errors);

    if !errors.is_empty() {
        fail("invalid slave table in slaves.toml", &errors);
    }
}

/// Abort the build with a short report
fn fail(title: &str, lines: &[String]) -> ! {
    let mut report = format!("\nERROR: {}\n", title);
    for line in lines {
        report.push_str("  - ");
        report.push_str(line);
        report.push('\n');
    }
    panic!("{}", report);
}

/// Validate the `[spi]` section
fn validate_spi(config: &toml::Value, errors: &mut Vec<String>) {
    match config.get("spi") {
        Some(toml::Value::Table(spi)) => {
            for (key, value) in spi {
                match key.as_str() {
                    "double_rate" if value.is_bool() => {}
                    "double_rate" => errors.push("[spi] double_rate must be true or false".into()),
                    _ => errors.push(format!("[spi] unknown key '{}'", key)),
                }
            }
        }
        Some(_) => errors.push("[spi] must be a table".into()),
        None => errors.push("Missing [spi] section".into()),
    }
}

/// Validate every `[slave.N]` section
fn validate_slaves(config: &toml::Value, errors: &mut Vec<String>) {
    let table = match config.get("slave") {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push("slave must be a table of [slave.N] sections".into());
            return;
        }
        None => return,
    };

    let mut seen_cs = Vec::new();

    for (key, value) in table {
        let section = format!("slave.{}", key);

        match key.parse::<i64>() {
            Ok(id) if (0..MAX_SLAVES).contains(&id) => {}
            _ => errors.push(format!("[{}] id must be 0-{}", section, MAX_SLAVES - 1)),
        }

        let slave = match value.as_table() {
            Some(t) => t,
            None => {
                errors.push(format!("[{}] must be a table", section));
                continue;
            }
        };

        match slave.get("cs") {
            Some(toml::Value::String(cs)) => {
                if !is_chip_select(cs) {
                    errors.push(format!("[{}] cs '{}' is not gpioN or P<port><pin>", section, cs));
                } else if seen_cs.contains(cs) {
                    errors.push(format!("[{}] cs '{}' already used", section, cs));
                } else {
                    seen_cs.push(cs.clone());
                }
            }
            Some(_) => errors.push(format!("[{}] cs must be a string", section)),
            None => errors.push(format!("[{}] missing 'cs'", section)),
        }

        if let Some(mode) = slave.get("mode") {
            match mode.as_integer() {
                Some(m) if (0..=MAX_MODE).contains(&m) => {}
                _ => errors.push(format!("[{}] mode must be 0-{}", section, MAX_MODE)),
            }
        }

        for key in ["select_delay_us", "deselect_delay_us"] {
            if let Some(delay) = slave.get(key) {
                let us = match delay {
                    toml::Value::Integer(i) => Some(*i as f64),
                    toml::Value::Float(f) => Some(*f),
                    _ => None,
                };
                match us {
                    Some(us) if us.is_finite() && us >= 0.0 => {}
                    _ => errors.push(format!("[{}] {} must be a non-negative number", section, key)),
                }
            }
        }

        if let Some(toml::Value::String(name)) = slave.get("name") {
            if name.len() > 16 {
                errors.push(format!("[{}] name longer than 16 bytes", section));
            }
        }
    }
}

fn is_chip_select(cs: &str) -> bool {
    if let Some(pin) = cs.strip_prefix("gpio") {
        return pin.parse::<u8>().is_ok_and(|p| p < 32);
    }
    let mut chars = cs.chars();
    chars.next() == Some('P')
        && chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.as_str().parse::<u8>().is_ok_and(|p| p < 32)
}
