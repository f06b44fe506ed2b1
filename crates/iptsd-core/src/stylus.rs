#![forbid(unsafe_code)]

//! Stylus motion shaping.
//!
//! Turns decoded stylus samples into output-device reports: optional
//! look-ahead prediction while the tip is down, a one-frame lift on tool
//! flips, tilt derived from spherical angles, and scaling of normalized
//! values into the device's fixed-point ranges.
//!
//! # Report layout
//!
//! Active: `TOUCH, TOOL_PEN, TOOL_RUBBER, STYLUS, X, Y, PRESSURE, MISC,
//! TILT_X, TILT_Y`, then sync. Inactive: the four buttons cleared, then sync.
//!
//! # Invariants
//!
//! 1. Every `update` commits exactly one report
//! 2. A pen/eraser flip always produces a fully lifted report first
//! 3. The predictor restarts on every tip-down edge
//! 4. Prediction failure falls back to the raw sample, never an error

use std::f64::consts::{FRAC_PI_4, PI};
use std::time::Duration;

use bitflags::bitflags;

use crate::config::Config;
use crate::error::{DeviceError, DeviceResult};
use crate::event::{AbsInfo, EventClass, abs, key, prop};
use crate::geometry::Vec2;
use crate::predictor::Predictor;
use crate::sink::OutputSink;

/// Output X range (device units).
pub const MAX_X: i32 = 9600;
/// Output Y range (device units).
pub const MAX_Y: i32 = 7200;
/// Output pressure range.
pub const MAX_PRESSURE: i32 = 4096;
/// Tilt range in hundredths of a degree, symmetric around zero.
pub const MAX_TILT: i32 = 9000;
/// Range of the pass-through timestamp axis.
pub const MAX_TIMESTAMP: i32 = u16::MAX as i32;

bitflags! {
    /// Raw stylus mode bits as reported by the digitizer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StylusMode: u16 {
        const PROXIMITY = 1 << 0;
        const CONTACT = 1 << 1;
        const BUTTON = 1 << 2;
        const RUBBER = 1 << 3;
    }
}

/// One decoded stylus reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StylusSample {
    /// Normalized position, `[0, 1]`.
    pub x: f64,
    pub y: f64,
    /// Normalized pressure, `[0, 1]`.
    pub pressure: f64,
    /// Radians.
    pub altitude: f64,
    /// Radians.
    pub azimuth: f64,
    /// Tip touching the surface.
    pub contact: bool,
    /// Pen within sensing range.
    pub proximity: bool,
    /// Eraser end active.
    pub rubber: bool,
    /// Side button pressed.
    pub button: bool,
    /// Raw device clock, passed through untouched.
    pub timestamp: u16,
}

impl StylusSample {
    /// Mode bits of this sample.
    #[must_use]
    pub fn mode(&self) -> StylusMode {
        let mut mode = StylusMode::empty();
        mode.set(StylusMode::PROXIMITY, self.proximity);
        mode.set(StylusMode::CONTACT, self.contact);
        mode.set(StylusMode::BUTTON, self.button);
        mode.set(StylusMode::RUBBER, self.rubber);
        mode
    }

    /// Replace the boolean state with the given mode bits.
    #[must_use]
    pub fn with_mode(mut self, mode: StylusMode) -> Self {
        self.proximity = mode.contains(StylusMode::PROXIMITY);
        self.contact = mode.contains(StylusMode::CONTACT);
        self.button = mode.contains(StylusMode::BUTTON);
        self.rubber = mode.contains(StylusMode::RUBBER);
        self
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Tilt resolution in units per radian.
#[must_use]
pub fn tilt_resolution() -> i32 {
    (18000.0 / PI).round() as i32
}

/// Convert spherical stylus angles (radians) into device tilt units.
///
/// Non-positive altitude means the orientation is unknown and yields no tilt.
#[must_use]
pub fn calculate_tilt(altitude: f64, azimuth: f64) -> (i32, i32) {
    if altitude <= 0.0 {
        return (0, 0);
    }

    let (sin_alt, cos_alt) = altitude.sin_cos();
    let (sin_azm, cos_azm) = azimuth.sin_cos();

    let atan_x = cos_alt.atan2(sin_alt * cos_azm);
    let atan_y = cos_alt.atan2(sin_alt * sin_azm);

    let tx = MAX_TILT - (atan_x * 4500.0 / FRAC_PI_4).round() as i32;
    let ty = (atan_y * 4500.0 / FRAC_PI_4).round() as i32 - MAX_TILT;

    (tx, ty)
}

/// Resolution in units per millimetre for an axis spanning `range` units
/// over `length_cm` centimetres.
fn axis_resolution(range: i32, length_cm: f64) -> i32 {
    (f64::from(range) / (length_cm * 10.0)).round() as i32
}

// ---------------------------------------------------------------------------
// StylusShaper
// ---------------------------------------------------------------------------

/// Per-channel stylus pipeline driving an [`OutputSink`].
///
/// Owns its predictor and sink for the lifetime of the channel. Not
/// thread-safe; callers serialize `update` calls.
#[derive(Debug)]
pub struct StylusShaper<P, S> {
    sink: S,
    predictor: P,

    /// Operator-controlled switch.
    enabled: bool,

    /// Whether the last report carried a pose.
    active: bool,

    /// Last processed sample, for edge detection.
    last: StylusSample,

    /// Look-ahead horizon; zero disables prediction.
    prediction_target: Duration,
}

impl<P: Predictor, S: OutputSink> StylusShaper<P, S> {
    /// Register capabilities on `sink` and create the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface size is not positive or the sink
    /// fails to create the device. The channel is unusable in that case.
    pub fn new(mut sink: S, predictor: P, config: &Config) -> DeviceResult<Self> {
        if !(config.width > 0.0 && config.height > 0.0) {
            return Err(DeviceError::InvalidCapability(format!(
                "surface size {}x{} must be positive",
                config.width, config.height
            )));
        }

        sink.set_name(&config.device.name);
        sink.set_id(config.device.vendor, config.device.product);

        sink.set_property(prop::DIRECT);
        sink.set_property(prop::POINTER);

        sink.set_key(key::BTN_TOUCH);
        sink.set_key(key::BTN_STYLUS);
        sink.set_key(key::BTN_TOOL_PEN);
        sink.set_key(key::BTN_TOOL_RUBBER);

        let res_x = axis_resolution(MAX_X, config.width);
        let res_y = axis_resolution(MAX_Y, config.height);
        let res_tilt = tilt_resolution();

        sink.set_abs(abs::X, AbsInfo::new(0, MAX_X, res_x));
        sink.set_abs(abs::Y, AbsInfo::new(0, MAX_Y, res_y));
        sink.set_abs(abs::PRESSURE, AbsInfo::new(0, MAX_PRESSURE, 0));
        sink.set_abs(abs::TILT_X, AbsInfo::new(-MAX_TILT, MAX_TILT, res_tilt));
        sink.set_abs(abs::TILT_Y, AbsInfo::new(-MAX_TILT, MAX_TILT, res_tilt));
        sink.set_abs(abs::MISC, AbsInfo::new(0, MAX_TIMESTAMP, 0));

        sink.create()?;

        crate::info!(
            name = %config.device.name,
            res_x,
            res_y,
            "stylus device created"
        );

        Ok(Self {
            sink,
            predictor,
            enabled: true,
            active: false,
            last: StylusSample::default(),
            prediction_target: config.stylus.prediction_target(),
        })
    }

    /// Process one sample and commit one report.
    pub fn update(&mut self, sample: &StylusSample) {
        if !self.last.contact && sample.contact {
            self.predictor.reset();
            crate::trace!("tip down, predictor reset");
        }

        self.active = sample.proximity;

        // Switching tools inside one report confuses consumers; lift for one frame.
        if self.last.rubber != sample.rubber {
            self.active = false;
            crate::debug!(rubber = sample.rubber, "tool flip, lifting for one frame");
        }

        if self.active {
            self.emit_pose(sample);
        } else {
            self.lift();
        }

        self.last = *sample;
        self.sink.sync();
    }

    /// Disable the channel and lift the stylus.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.active = false;

        self.lift();
        self.sink.sync();

        crate::debug!("stylus disabled");
    }

    /// Re-enable the channel. Nothing is emitted until the next `update`.
    pub fn enable(&mut self) {
        self.enabled = true;
        crate::debug!("stylus enabled");
    }

    #[inline]
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    #[must_use]
    pub fn active(&self) -> bool {
        self.active
    }

    /// Last processed sample.
    #[inline]
    #[must_use]
    pub fn last(&self) -> &StylusSample {
        &self.last
    }

    #[inline]
    #[must_use]
    pub fn prediction_target(&self) -> Duration {
        self.prediction_target
    }

    #[inline]
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[inline]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    #[inline]
    #[must_use]
    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn emit_pose(&mut self, sample: &StylusSample) {
        let mut position = sample.position();
        let mut pressure = sample.pressure;

        if !self.prediction_target.is_zero() && sample.contact {
            self.predictor.update(position, pressure);

            if self.predictor.predict(self.prediction_target) {
                position = self.predictor.position();
                pressure = self.predictor.pressure();
            } else {
                crate::trace!("prediction unavailable, using raw sample");
            }
        }

        let (tilt_x, tilt_y) = calculate_tilt(sample.altitude, sample.azimuth);

        let x = (position.x * f64::from(MAX_X)).round() as i32;
        let y = (position.y * f64::from(MAX_Y)).round() as i32;
        let pressure = (pressure * f64::from(MAX_PRESSURE)).round() as i32;

        let sink = &mut self.sink;
        sink.emit(EventClass::Key, key::BTN_TOUCH, i32::from(sample.contact));
        sink.emit(EventClass::Key, key::BTN_TOOL_PEN, i32::from(!sample.rubber));
        sink.emit(EventClass::Key, key::BTN_TOOL_RUBBER, i32::from(sample.rubber));
        sink.emit(EventClass::Key, key::BTN_STYLUS, i32::from(sample.button));

        sink.emit(EventClass::Abs, abs::X, x);
        sink.emit(EventClass::Abs, abs::Y, y);
        sink.emit(EventClass::Abs, abs::PRESSURE, pressure);
        sink.emit(EventClass::Abs, abs::MISC, i32::from(sample.timestamp));

        sink.emit(EventClass::Abs, abs::TILT_X, tilt_x);
        sink.emit(EventClass::Abs, abs::TILT_Y, tilt_y);
    }

    fn lift(&mut self) {
        self.sink.emit(EventClass::Key, key::BTN_TOUCH, 0);
        self.sink.emit(EventClass::Key, key::BTN_TOOL_PEN, 0);
        self.sink.emit(EventClass::Key, key::BTN_TOOL_RUBBER, 0);
        self.sink.emit(EventClass::Key, key::BTN_STYLUS, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::InputEvent;
    use crate::predictor::KalmanPredictor;
    use crate::sink::RecordingSink;

    fn shaper() -> StylusShaper<KalmanPredictor, RecordingSink> {
        StylusShaper::new(
            RecordingSink::new(),
            KalmanPredictor::default(),
            &Config::default(),
        )
        .expect("recording sink never fails")
    }

    fn value(report: &[InputEvent], class: EventClass, code: u16) -> Option<i32> {
        report
            .iter()
            .find(|e| e.class == class && e.code == code)
            .map(|e| e.value)
    }

    // --- Tilt ---

    #[test]
    fn tilt_zero_for_non_positive_altitude() {
        assert_eq!(calculate_tilt(0.0, 1.0), (0, 0));
        assert_eq!(calculate_tilt(-0.5, 0.3), (0, 0));
    }

    #[test]
    fn tilt_closed_form_values() {
        assert_eq!(calculate_tilt(PI / 2.0, 0.0), (9000, 0));
        assert_eq!(calculate_tilt(PI / 4.0, 0.0), (4500, 0));
        assert_eq!(calculate_tilt(PI / 4.0, PI / 2.0), (0, -4500));
    }

    #[test]
    fn tilt_resolution_is_centidegrees_per_radian() {
        assert_eq!(tilt_resolution(), 5730);
    }

    // --- Capabilities ---

    #[test]
    fn registers_capabilities() {
        let s = shaper();
        let sink = s.sink();

        assert!(sink.is_created());
        assert_eq!(sink.name(), "IPTS Stylus");
        assert!(sink.has_property(prop::DIRECT));
        assert!(sink.has_property(prop::POINTER));
        for code in [
            key::BTN_TOUCH,
            key::BTN_STYLUS,
            key::BTN_TOOL_PEN,
            key::BTN_TOOL_RUBBER,
        ] {
            assert!(sink.has_key(code));
        }

        // Default surface is 25cm x 17cm.
        assert_eq!(sink.axis(abs::X), Some(AbsInfo::new(0, 9600, 38)));
        assert_eq!(sink.axis(abs::Y), Some(AbsInfo::new(0, 7200, 42)));
        assert_eq!(sink.axis(abs::PRESSURE), Some(AbsInfo::new(0, 4096, 0)));
        assert_eq!(sink.axis(abs::TILT_X), Some(AbsInfo::new(-9000, 9000, 5730)));
        assert_eq!(sink.axis(abs::TILT_Y), Some(AbsInfo::new(-9000, 9000, 5730)));
        assert_eq!(sink.axis(abs::MISC), Some(AbsInfo::new(0, 65535, 0)));
    }

    #[test]
    fn creation_failure_is_fatal() {
        let result = StylusShaper::new(
            RecordingSink::failing(),
            KalmanPredictor::default(),
            &Config::default(),
        );
        assert!(matches!(result, Err(DeviceError::Io(_))));
    }

    #[test]
    fn rejects_degenerate_surface() {
        let config = Config {
            width: 0.0,
            ..Config::default()
        };
        let result = StylusShaper::new(RecordingSink::new(), KalmanPredictor::default(), &config);
        assert!(matches!(result, Err(DeviceError::InvalidCapability(_))));
    }

    // --- Update ---

    #[test]
    fn active_report_scales_values() {
        let mut s = shaper();
        let sample = StylusSample {
            x: 0.5,
            y: 0.25,
            pressure: 0.5,
            contact: true,
            proximity: true,
            button: true,
            timestamp: 1234,
            ..Default::default()
        };
        s.update(&sample);

        assert!(s.active());
        let report = s.sink().last_report().expect("one report");
        assert_eq!(report.len(), 10);
        assert_eq!(value(report, EventClass::Key, key::BTN_TOUCH), Some(1));
        assert_eq!(value(report, EventClass::Key, key::BTN_TOOL_PEN), Some(1));
        assert_eq!(value(report, EventClass::Key, key::BTN_TOOL_RUBBER), Some(0));
        assert_eq!(value(report, EventClass::Key, key::BTN_STYLUS), Some(1));
        assert_eq!(value(report, EventClass::Abs, abs::X), Some(4800));
        assert_eq!(value(report, EventClass::Abs, abs::Y), Some(1800));
        assert_eq!(value(report, EventClass::Abs, abs::PRESSURE), Some(2048));
        assert_eq!(value(report, EventClass::Abs, abs::MISC), Some(1234));
        assert_eq!(value(report, EventClass::Abs, abs::TILT_X), Some(0));
        assert_eq!(value(report, EventClass::Abs, abs::TILT_Y), Some(0));
    }

    #[test]
    fn buttons_precede_axes_and_tilt_is_last() {
        let mut s = shaper();
        s.update(&StylusSample {
            proximity: true,
            ..Default::default()
        });

        let report = s.sink().last_report().expect("one report");
        let classes: Vec<_> = report.iter().map(|e| e.class).collect();
        assert!(classes[..4].iter().all(|c| *c == EventClass::Key));
        assert!(classes[4..].iter().all(|c| *c == EventClass::Abs));
        assert_eq!(report[8].code, abs::TILT_X);
        assert_eq!(report[9].code, abs::TILT_Y);
    }

    #[test]
    fn out_of_proximity_lifts() {
        let mut s = shaper();
        s.update(&StylusSample::default());

        assert!(!s.active());
        let report = s.sink().last_report().expect("one report");
        assert_eq!(report.len(), 4);
        assert!(report.iter().all(|e| e.class == EventClass::Key && e.value == 0));
    }

    #[test]
    fn mode_bits_round_trip_through_sample() {
        let mode = StylusMode::PROXIMITY | StylusMode::RUBBER;
        let sample = StylusSample::default().with_mode(mode);
        assert!(sample.proximity && sample.rubber);
        assert!(!sample.contact && !sample.button);
        assert_eq!(sample.mode(), mode);
    }

    #[test]
    fn disable_lifts_and_enable_is_silent() {
        let mut s = shaper();
        s.update(&StylusSample {
            proximity: true,
            contact: true,
            ..Default::default()
        });
        assert!(s.active());

        s.disable();
        assert!(!s.enabled());
        assert!(!s.active());
        assert_eq!(s.sink().reports().len(), 2);
        assert_eq!(s.sink().last_report().map(<[InputEvent]>::len), Some(4));

        s.enable();
        assert!(s.enabled());
        assert_eq!(s.sink().reports().len(), 2);
    }
}
