// src/scale/port.rs
//
// Serial port configuration and enumeration for the scale indicator.
// Wraps the serialport crate: config conversions, the opener used by the
// controller, and host device enumeration for the ports endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::{DataBits, Parity as SpParity, SerialPort, StopBits};

use crate::settings::AppSettings;

// ============================================================================
// Types
// ============================================================================

/// Parity setting for the indicator link
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl Default for Parity {
    fn default() -> Self {
        Parity::None
    }
}

/// Resolved serial + polling configuration for one scale connection
#[derive(Clone, Debug)]
pub struct ScaleConfig {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    /// Acquisition loop cadence
    pub poll_interval: Duration,
}

impl ScaleConfig {
    pub fn from_settings(settings: &AppSettings) -> Self {
        ScaleConfig {
            port: settings.port.clone(),
            baud_rate: settings.baud_rate,
            data_bits: settings.data_bits,
            stop_bits: settings.stop_bits,
            parity: settings.parity.clone(),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
        }
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert our Parity enum to the serialport crate's Parity type
fn to_serialport_parity(p: &Parity) -> SpParity {
    match p {
        Parity::None => SpParity::None,
        Parity::Odd => SpParity::Odd,
        Parity::Even => SpParity::Even,
    }
}

/// Convert data bits count to the serialport crate's DataBits type
fn to_serialport_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

/// Convert stop bits count to the serialport crate's StopBits type
fn to_serialport_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

// ============================================================================
// Port Access
// ============================================================================

/// Open the indicator's serial port.
///
/// The 1 ms timeout keeps the handle effectively non-blocking; the
/// acquisition loop only ever reads what the OS has already buffered.
pub fn open_scale_port(config: &ScaleConfig) -> Result<Box<dyn SerialPort>, String> {
    serialport::new(&config.port, config.baud_rate)
        .data_bits(to_serialport_data_bits(config.data_bits))
        .stop_bits(to_serialport_stop_bits(config.stop_bits))
        .parity(to_serialport_parity(&config.parity))
        .timeout(Duration::from_millis(1))
        .open()
        .map_err(|e| format!("Failed to open {}: {}", config.port, e))
}

/// List available serial devices on the host.
///
/// On macOS, filters out /dev/tty.* devices and only shows /dev/cu.* devices.
/// The cu (calling unit) devices are non-blocking and preferred for outgoing
/// connections; the tty devices block on open waiting for carrier detect.
pub fn list_scale_ports() -> Result<Vec<String>, String> {
    let ports = serialport::available_ports()
        .map_err(|e| format!("Failed to enumerate ports: {}", e))?;

    Ok(ports
        .into_iter()
        .filter(|_p| {
            #[cfg(target_os = "macos")]
            {
                !_p.port_name.starts_with("/dev/tty.")
            }
            #[cfg(not(target_os = "macos"))]
            {
                true
            }
        })
        .map(|p| p.port_name)
        .collect())
}

// ============================================================================
// Tests
// ============================================================================
