// src/settings.rs
//
// Application settings: serial link configuration, acquisition cadence,
// HTTP bind address, and CORS origins. Persisted as JSON under the platform
// config directory; a default file is written on first run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::scale::port::Parity;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppSettings {
    /// Serial device the scale indicator is attached to
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub parity: Parity,
    /// Acquisition loop cadence in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Address the HTTP API binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Origins allowed by the CORS layer
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// When set, log output is also written to a file in this directory
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_port() -> String {
    #[cfg(target_os = "windows")]
    {
        "COM4".to_string()
    }
    #[cfg(not(target_os = "windows"))]
    {
        "/dev/ttyUSB0".to_string()
    }
}
fn default_baud_rate() -> u32 {
    9600
}
fn default_data_bits() -> u8 {
    8
}
fn default_stop_bits() -> u8 {
    1
}
fn default_poll_interval_ms() -> u64 {
    250
}
fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:8080".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: Parity::default(),
            poll_interval_ms: default_poll_interval_ms(),
            listen_addr: default_listen_addr(),
            cors_origins: default_cors_origins(),
            log_dir: None,
        }
    }
}

/// Default settings file location under the platform config directory.
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("weighbridge")
        .join("settings.json")
}

/// Load settings from the given path, or from the default location.
/// First run: creates the file with defaults so the operator has something
/// to edit.
pub fn load_settings(path: Option<&Path>) -> Result<AppSettings, String> {
    let settings_path = match path {
        Some(p) => p.to_path_buf(),
        None => default_settings_path(),
    };

    if settings_path.exists() {
        let content = std::fs::read_to_string(&settings_path)
            .map_err(|e| format!("Failed to read settings: {}", e))?;

        serde_json::from_str(&content).map_err(|e| format!("Failed to parse settings: {}", e))
    } else {
        let settings = AppSettings::default();
        save_settings(&settings_path, &settings)?;
        tlog!(
            "[settings] Wrote default settings to {}",
            settings_path.display()
        );
        Ok(settings)
    }
}

/// Write settings as pretty-printed JSON, creating parent directories.
pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create settings directory: {}", e))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))
}

// ============================================================================
// Tests
// ============================================================================
