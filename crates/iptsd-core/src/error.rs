#![forbid(unsafe_code)]

//! Error types.
//!
//! | Error | Cause | Handling |
//! |-------|-------|----------|
//! | `DeviceError` | Output device setup failed | Fatal for the channel, never retried |
//! | `ConfigError` | Config file missing, malformed or out of range | Reported by the caller |
//!
//! Per-sample and per-frame processing never fails.

use std::fmt;

// ---------------------------------------------------------------------------
// Device errors
// ---------------------------------------------------------------------------

/// Output device creation or capability registration failure.
#[derive(Debug)]
pub enum DeviceError {
    /// The OS rejected a device operation.
    Io(std::io::Error),
    /// A capability declaration was rejected before reaching the OS.
    InvalidCapability(String),
    /// `create` was called twice.
    AlreadyCreated,
    /// The device has not been created yet.
    NotCreated,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Io(e) => write!(f, "device I/O error: {e}"),
            DeviceError::InvalidCapability(msg) => write!(f, "invalid capability: {msg}"),
            DeviceError::AlreadyCreated => write!(f, "device already created"),
            DeviceError::NotCreated => write!(f, "device not created"),
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeviceError::Io(e) => Some(e),
            DeviceError::InvalidCapability(_) => None,
            DeviceError::AlreadyCreated => None,
            DeviceError::NotCreated => None,
        }
    }
}

impl From<std::io::Error> for DeviceError {
    fn from(e: std::io::Error) -> Self {
        DeviceError::Io(e)
    }
}

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Configuration loading or validation failure.
#[derive(Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    Io(std::io::Error),
    /// The config file is not valid JSON for [`Config`](crate::config::Config).
    Parse(String),
    /// A value is out of range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(_) => None,
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
