#![forbid(unsafe_code)]

//! Core: contact stabilization, stylus motion shaping, and the sink/predictor seams.

pub mod config;
pub mod contacts;
pub mod error;
pub mod event;
pub mod geometry;
pub mod logging;
pub mod predictor;
pub mod sink;
pub mod stabilizer;
pub mod stylus;

pub use config::{Config, DeviceIdentity, StylusConfig};
pub use contacts::{Contact, Frame};
pub use error::{ConfigError, DeviceError};
pub use geometry::Vec2;
pub use predictor::{KalmanPredictor, Predictor};
pub use sink::{OutputSink, RecordingSink};
pub use stabilizer::{MovementLimits, Stabilizer, StabilizerConfig};
pub use stylus::{StylusMode, StylusSample, StylusShaper};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, error, info, trace, warn};
