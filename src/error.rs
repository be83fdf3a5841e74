//! Error handling for PortScope
//!
//! This module defines custom error types and a Result alias for use
//! throughout the application.

use thiserror::Error;

/// Main error type for PortScope operations
#[derive(Error, Debug)]
pub enum PortScopeError {
    /// Bad or unsupported transport parameters, reported synchronously at
    /// construction
    #[error("Configuration error: {0}")]
    Config(String),

    /// The device could not be opened with the given parameters
    #[error("Device unavailable: {port}: {message}")]
    DeviceUnavailable { port: String, message: String },

    /// Mid-session read/write failure, terminal for the affected pump
    #[error("Transport I/O error: {0}")]
    TransportIo(String),

    /// Malformed escape sequence in codec input
    #[error("Invalid escape sequence at byte {position}: {message}")]
    InvalidEscape { position: usize, message: String },

    /// Literal character outside the representable range in codec input
    #[error("Unencodable character {character:?} at byte {position}")]
    UnencodableCharacter { character: char, position: usize },

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Errors related to sequence file loading
    #[error("Sequence error: {0}")]
    Sequence(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PortScopeError>,
    },
}

impl PortScopeError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PortScopeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Map a serialport error into the session taxonomy
    pub fn from_serialport(port: &str, err: serialport::Error) -> Self {
        use serialport::ErrorKind;
        match err.kind() {
            ErrorKind::NoDevice => PortScopeError::DeviceUnavailable {
                port: port.to_string(),
                message: err.to_string(),
            },
            ErrorKind::Io(kind)
                if kind == std::io::ErrorKind::NotFound
                    || kind == std::io::ErrorKind::PermissionDenied =>
            {
                PortScopeError::DeviceUnavailable {
                    port: port.to_string(),
                    message: err.to_string(),
                }
            }
            ErrorKind::InvalidInput => PortScopeError::Config(err.to_string()),
            _ => PortScopeError::TransportIo(err.to_string()),
        }
    }
}

/// Result type alias for PortScope operations
pub type Result<T> = std::result::Result<T, PortScopeError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
