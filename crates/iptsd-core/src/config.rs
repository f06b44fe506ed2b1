#![forbid(unsafe_code)]

//! Daemon configuration.
//!
//! Loaded from JSON (with the `serde` feature) and adjusted through
//! environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `IPTSD_STYLUS_PREDICTION_MS` | `stylus.prediction_target_ms` |
//! | `IPTSD_STYLUS_DISABLE` | `stylus.disable` |
//! | `IPTSD_TEMPORAL_WINDOW` | `contacts.temporal_window` |
//! | `IPTSD_CHECK_TEMPORAL_STABILITY` | `contacts.check_temporal_stability` |

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::stabilizer::StabilizerConfig;

/// Identity of the virtual stylus device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceIdentity {
    pub name: String,
    pub vendor: u16,
    pub product: u16,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            name: "IPTS Stylus".to_owned(),
            vendor: 0,
            product: 0,
        }
    }
}

/// Stylus channel settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StylusConfig {
    /// Look-ahead horizon in milliseconds; 0 disables prediction.
    pub prediction_target_ms: u64,
    /// Start with the stylus channel disabled.
    pub disable: bool,
}

impl StylusConfig {
    #[must_use]
    pub fn prediction_target(&self) -> Duration {
        Duration::from_millis(self.prediction_target_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Physical surface width in centimetres.
    pub width: f64,
    /// Physical surface height in centimetres.
    pub height: f64,
    pub stylus: StylusConfig,
    pub contacts: StabilizerConfig,
    pub device: DeviceIdentity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 25.0,
            height: 17.0,
            stylus: StylusConfig::default(),
            contacts: StabilizerConfig::default(),
            device: DeviceIdentity::default(),
        }
    }
}

impl Config {
    /// Parse a JSON document. Missing fields keep their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    #[cfg(feature = "serde")]
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        if let Some(v) = lookup("IPTSD_STYLUS_PREDICTION_MS") {
            self.stylus.prediction_target_ms = parse_number("IPTSD_STYLUS_PREDICTION_MS", &v)?;
        }
        if let Some(v) = lookup("IPTSD_STYLUS_DISABLE") {
            self.stylus.disable = parse_flag("IPTSD_STYLUS_DISABLE", &v)?;
        }
        if let Some(v) = lookup("IPTSD_TEMPORAL_WINDOW") {
            self.contacts.temporal_window = parse_number("IPTSD_TEMPORAL_WINDOW", &v)?;
        }
        if let Some(v) = lookup("IPTSD_CHECK_TEMPORAL_STABILITY") {
            self.contacts.check_temporal_stability =
                parse_flag("IPTSD_CHECK_TEMPORAL_STABILITY", &v)?;
        }
        self.validate()
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "width must be positive, got {}",
                self.width
            )));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "height must be positive, got {}",
                self.height
            )));
        }
        if let Some(threshold) = self.contacts.size_difference_threshold
            && threshold < 0.0
        {
            return Err(ConfigError::Invalid(format!(
                "size_difference_threshold must not be negative, got {threshold}"
            )));
        }
        if let Some(limits) = self.contacts.movement_limits
            && (limits.min < 0.0 || limits.min > limits.max)
        {
            return Err(ConfigError::Invalid(format!(
                "movement_limits must satisfy 0 <= min <= max, got ({}, {})",
                limits.min, limits.max
            )));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{name}: not a number: {value:?}")))
}

fn parse_flag(name: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid(format!(
            "{name}: expected a boolean, got {value:?}"
        ))),
    }
}
