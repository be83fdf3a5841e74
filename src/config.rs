//! Configuration for PortScope sessions
//!
//! This module holds the validated serial-port parameter set, the optional
//! TOML session file, and the platform data-directory lookup used for
//! default file locations.
//!
//! # App Data Location
//!
//! Application data lives in the platform-appropriate directory under
//! `portscope`:
//!
//! - **Linux**: `~/.local/share/portscope/`
//! - **macOS**: `~/Library/Application Support/portscope/`
//! - **Windows**: `%APPDATA%\portscope\`
//!
//! # Files
//!
//! - `sequences.json` - default saved-sequence list (JSON `[label, text]`
//!   pairs, escape grammar per [`crate::codec`])
//! - Session files (`.toml`) - saved wherever the user chooses

use crate::error::{PortScopeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "portscope";

/// Default sequences filename inside the app data directory
pub const SEQUENCES_FILE: &str = "sequences.json";

/// Baud rate used when the settings leave it unset
pub const DEFAULT_BAUD: u32 = 9600;

/// Default bounded timeout for the receive pump's blocking read
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Default tick interval for the generator transport
pub const DEFAULT_GENERATOR_INTERVAL: Duration = Duration::from_secs(1);

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the default sequences file path, if it exists on disk
pub fn default_sequences_path() -> Option<PathBuf> {
    app_data_dir()
        .map(|p| p.join(SEQUENCES_FILE))
        .filter(|p| p.exists())
}

/// Parity setting for serial port configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
    Mark,
    Space,
}

impl std::str::FromStr for Parity {
    type Err = PortScopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Parity::None),
            "even" => Ok(Parity::Even),
            "odd" => Ok(Parity::Odd),
            "mark" => Ok(Parity::Mark),
            "space" => Ok(Parity::Space),
            other => Err(PortScopeError::Config(format!(
                "unknown parity {:?} (expected none|even|odd|mark|space)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Parity::None => "none",
            Parity::Even => "even",
            Parity::Odd => "odd",
            Parity::Mark => "mark",
            Parity::Space => "space",
        };
        write!(f, "{}", s)
    }
}

/// Stop bit count for serial port configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StopBits {
    #[default]
    #[serde(rename = "1")]
    One,
    #[serde(rename = "1.5")]
    OnePointFive,
    #[serde(rename = "2")]
    Two,
}

impl std::str::FromStr for StopBits {
    type Err = PortScopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1" => Ok(StopBits::One),
            "1.5" => Ok(StopBits::OnePointFive),
            "2" => Ok(StopBits::Two),
            other => Err(PortScopeError::Config(format!(
                "unknown stop bits {:?} (expected 1|1.5|2)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for StopBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopBits::One => "1",
            StopBits::OnePointFive => "1.5",
            StopBits::Two => "2",
        };
        write!(f, "{}", s)
    }
}

/// Flow-control flags, passed through to the port without any state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowControl {
    /// Software flow control (XON/XOFF)
    #[serde(default)]
    pub software: bool,
    /// Hardware RTS/CTS
    #[serde(default)]
    pub rts_cts: bool,
    /// Hardware DSR/DTR
    #[serde(default)]
    pub dsr_dtr: bool,
}

/// Validated serial-port parameter set
///
/// Construction of a [`crate::transport::SerialTransport`] runs
/// [`SerialSettings::validate`] first, so parameter errors surface before
/// the device is touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Baud rate; `None` falls back to [`DEFAULT_BAUD`]
    #[serde(default)]
    pub baud: Option<u32>,
    /// Byte size on the wire (5-8)
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default)]
    pub stop_bits: StopBits,
    #[serde(default)]
    pub flow: FlowControl,
}

fn default_data_bits() -> u8 {
    8
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud: None,
            data_bits: 8,
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            flow: FlowControl::default(),
        }
    }
}

impl SerialSettings {
    /// Effective baud rate after defaulting
    pub fn baud_or_default(&self) -> u32 {
        self.baud.unwrap_or(DEFAULT_BAUD)
    }

    /// Check the parameter set for combinations no backend can open
    pub fn validate(&self) -> Result<()> {
        if !(5..=8).contains(&self.data_bits) {
            return Err(PortScopeError::Config(format!(
                "data bits must be 5-8, got {}",
                self.data_bits
            )));
        }
        if self.flow.software && self.flow.rts_cts {
            return Err(PortScopeError::Config(
                "software and RTS/CTS flow control are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for SerialSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}{}{}",
            self.baud_or_default(),
            self.data_bits,
            match self.parity {
                Parity::None => "N",
                Parity::Even => "E",
                Parity::Odd => "O",
                Parity::Mark => "M",
                Parity::Space => "S",
            },
            self.stop_bits
        )
    }
}

/// Which transport a session runs on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportConfig {
    /// A physical serial device
    Serial {
        path: String,
        #[serde(flatten)]
        settings: SerialSettings,
    },
    /// Loopback
    Echo,
    /// Synthetic byte source
    Generator {
        #[serde(default = "default_generator_interval_ms")]
        interval_ms: u64,
    },
}

fn default_generator_interval_ms() -> u64 {
    DEFAULT_GENERATOR_INTERVAL.as_millis() as u64
}

/// A complete session description, loadable from a TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Transport to open at session start
    pub transport: TransportConfig,
    /// Bounded timeout for the receive pump's blocking read, milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Optional sequence file to preload into the registry
    #[serde(default)]
    pub sequences: Option<PathBuf>,
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT.as_millis() as u64
}

impl SessionConfig {
    /// Load a session description from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PortScopeError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            PortScopeError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Receive-pump read timeout as a duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
